// SPDX-License-Identifier: MIT

//! Typed error handling for the workflow service
//!
//! `FlowError` wraps engine errors together with the failures of the layers
//! around it (registry lookups, stores, loading definitions, configuration).

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use thiserror::Error;

use super::condition::ConditionError;
use crate::engine::GraphError;

/// Top-level error type for the workflow service
#[derive(Debug, Error)]
pub enum FlowError {
    /// A node referenced a step that is not registered
    #[error("Tool '{name}' not found in registry")]
    ToolNotFound { name: String },

    #[error("Graph '{0}' not found")]
    GraphNotFound(String),

    #[error("Run '{0}' not found")]
    RunNotFound(String),

    /// Request body could not be read as the expected JSON
    #[error("Invalid request body: {0}")]
    InvalidRequest(#[from] JsonRejection),

    #[error("Invalid condition: {0}")]
    Condition(#[from] ConditionError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Configuration errors (invalid env vars, bad flags)
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Other(String),
}

impl FlowError {
    pub fn tool_not_found(name: impl Into<String>) -> Self {
        Self::ToolNotFound { name: name.into() }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// HTTP status used when this error reaches the API boundary
    pub fn status_code(&self) -> StatusCode {
        match self {
            FlowError::InvalidRequest(rejection) => rejection.status(),
            FlowError::ToolNotFound { .. }
            | FlowError::Condition(_)
            | FlowError::Json(_)
            | FlowError::Yaml(_)
            | FlowError::Graph(GraphError::Reference { .. }) => StatusCode::BAD_REQUEST,
            FlowError::GraphNotFound(_) | FlowError::RunNotFound(_) => StatusCode::NOT_FOUND,
            FlowError::Graph(_)
            | FlowError::Config(_)
            | FlowError::Io(_)
            | FlowError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
