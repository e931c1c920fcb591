// SPDX-License-Identifier: MIT

//! Graph-based workflow engine.
//!
//! [`engine`] holds the node/edge model and the traversal loop. [`flow`]
//! wraps it in a step registry, definition loading and an HTTP API.

pub mod config;
pub mod engine;
pub mod flow;
