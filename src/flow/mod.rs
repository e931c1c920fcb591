// SPDX-License-Identifier: MIT

//! Service layer around the engine: step registry, graph definitions,
//! storage, the HTTP API and the shipped workflows.

pub mod builder;
pub mod condition;
pub mod error;
pub mod loader;
pub mod registry;
pub mod server;
pub mod store;
pub mod types;
pub mod workflows;
