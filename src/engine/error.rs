// SPDX-License-Identifier: MIT

//! Typed errors raised by graph construction and traversal

use thiserror::Error;

/// Error type returned by step functions
pub type StepError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by the graph engine
#[derive(Debug, Error)]
pub enum GraphError {
    /// The graph cannot run as configured (e.g. no start node)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An edge referenced a node that is not registered
    #[error("Node '{name}' not found")]
    Reference { name: String },

    /// A step function failed; the run was abandoned at this node
    #[error("Step '{node}' failed: {source}")]
    StepExecution {
        node: String,
        #[source]
        source: StepError,
    },
}

impl GraphError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a reference error for an unknown node
    pub fn reference(name: impl Into<String>) -> Self {
        Self::Reference { name: name.into() }
    }
}
