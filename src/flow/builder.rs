// SPDX-License-Identifier: MIT

//! Graph builder - turns definitions into executable graphs
//!
//! Step names are resolved through the [`StepRegistry`] and edge conditions
//! are compiled into guards. The engine itself never sees names.

use std::path::Path;

use super::condition::ConditionGuard;
use super::error::FlowError;
use super::loader::GraphLoader;
use super::registry::StepRegistry;
use super::types::GraphDefinition;
use crate::engine::{Graph, MAX_STEPS};

pub struct GraphBuilder {
    registry: StepRegistry,
    default_max_steps: usize,
}

impl GraphBuilder {
    pub fn new(registry: StepRegistry) -> Self {
        Self {
            registry,
            default_max_steps: MAX_STEPS,
        }
    }

    /// Step ceiling for definitions that don't set `max_steps`
    pub fn with_default_max_steps(mut self, max_steps: usize) -> Self {
        self.default_max_steps = max_steps;
        self
    }

    /// Build a graph from a YAML or JSON file
    pub async fn build_file<P: AsRef<Path>>(&self, path: P) -> Result<Graph, FlowError> {
        let def = GraphLoader::new().load(path)?;
        self.build(&def).await
    }

    /// Build a graph from a parsed definition
    pub async fn build(&self, def: &GraphDefinition) -> Result<Graph, FlowError> {
        let mut graph = Graph::with_max_steps(def.max_steps.unwrap_or(self.default_max_steps));

        for node in &def.nodes {
            let step = self
                .registry
                .get(&node.tool)
                .await
                .ok_or_else(|| FlowError::tool_not_found(&node.tool))?;
            graph.add_node(node.name.clone(), step, node.is_start);
        }

        for edge in &def.edges {
            match &edge.condition {
                None => graph.add_edge(&edge.from_node, &edge.to_node, None)?,
                Some(source) => {
                    let guard = ConditionGuard::parse(source)?;
                    graph.add_conditional_edge(&edge.from_node, &edge.to_node, guard)?;
                }
            }
        }

        log::info!(
            "Built graph '{}' with {} nodes and {} edges",
            def.name,
            def.nodes.len(),
            def.edges.len()
        );

        Ok(graph)
    }
}
