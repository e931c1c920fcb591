// SPDX-License-Identifier: MIT

//! Graph definition documents
//!
//! These mirror the JSON accepted by `POST /graph/create` and the YAML/JSON
//! files accepted by the CLI.

use serde::{Deserialize, Serialize};

/// A graph described by step names instead of functions
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct GraphDefinition {
    #[serde(default)]
    pub name: String,
    /// Overrides the default step ceiling for this graph
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<usize>,
    #[serde(default)]
    pub nodes: Vec<NodeDefinition>,
    #[serde(default)]
    pub edges: Vec<EdgeDefinition>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct NodeDefinition {
    /// Unique node name within the graph
    pub name: String,
    /// Registered step to run for this node
    pub tool: String,
    #[serde(default)]
    pub is_start: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct EdgeDefinition {
    pub from_node: String,
    pub to_node: String,
    /// Guard expression, e.g. `quality_score < 80`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}
