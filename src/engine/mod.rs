// SPDX-License-Identifier: MIT

//! Graph execution engine
//!
//! Nodes, edges and the traversal loop. The engine never resolves step names;
//! callers attach already-built [`StepFunction`]s and [`Guard`]s.

pub mod error;
pub mod graph;
pub mod state;
pub mod step;

pub use error::{GraphError, StepError};
pub use graph::{Edge, Graph, Node, RunResult, TraceStep, MAX_STEPS};
pub use state::State;
pub use step::{guard, step, FnGuard, FnStep, Guard, StepFunction, StepResult};
