// SPDX-License-Identifier: MIT

//! Graph data model and traversal
//!
//! A [`Graph`] owns named nodes, an ordered list of outgoing edges per node
//! and one start node. [`Graph::run`] executes nodes one at a time, merging
//! each step's update into state and following the first matching edge until
//! no edge matches or the step cap is reached.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::error::GraphError;
use super::state::{self, State};
use super::step::{Guard, StepFunction};

/// Default ceiling on node executions per run
pub const MAX_STEPS: usize = 100;

/// A named unit of work
pub struct Node {
    pub name: String,
    pub step: Arc<dyn StepFunction>,
}

/// A directed, optionally guarded transition
#[derive(Clone)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub guard: Option<Arc<dyn Guard>>,
}

impl Edge {
    /// Unguarded edges always match
    pub fn matches(&self, state: &State) -> bool {
        match &self.guard {
            None => true,
            Some(guard) => guard.evaluate(state),
        }
    }
}

/// One entry of the execution trace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceStep {
    /// Node that was executed
    pub node: String,
    /// State right after the node's update was merged
    pub state_snapshot: State,
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub final_state: State,
    pub steps: Vec<TraceStep>,
}

impl RunResult {
    /// Node names in execution order
    pub fn node_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.node.as_str()).collect()
    }
}

/// Workflow graph
pub struct Graph {
    nodes: HashMap<String, Node>,
    edges: HashMap<String, Vec<Edge>>,
    start_node: Option<String>,
    max_steps: usize,
}

impl Graph {
    pub fn new() -> Self {
        Self::with_max_steps(MAX_STEPS)
    }

    /// Create a graph with a custom step ceiling
    pub fn with_max_steps(max_steps: usize) -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            start_node: None,
            max_steps,
        }
    }

    /// Register a node, replacing any node with the same name.
    ///
    /// Existing outgoing edges of a replaced node are kept. When `is_start`
    /// is set the node becomes the start node, replacing any earlier one.
    pub fn add_node<S>(&mut self, name: impl Into<String>, step: S, is_start: bool)
    where
        S: StepFunction + 'static,
    {
        let name = name.into();

        if self.nodes.contains_key(&name) {
            log::warn!("Replacing existing node '{}'", name);
        }

        if is_start {
            if let Some(previous) = self.start_node.as_deref().filter(|p| *p != name) {
                log::warn!("Start node changed from '{}' to '{}'", previous, name);
            }
            self.start_node = Some(name.clone());
        }

        self.edges.entry(name.clone()).or_default();
        self.nodes.insert(
            name.clone(),
            Node {
                name,
                step: Arc::new(step),
            },
        );
    }

    /// Append an edge to `from`'s outgoing list.
    ///
    /// Both endpoints must already be registered. Registration order decides
    /// which edge wins when several match.
    pub fn add_edge(
        &mut self,
        from: &str,
        to: &str,
        guard: Option<Arc<dyn Guard>>,
    ) -> Result<(), GraphError> {
        if !self.nodes.contains_key(from) {
            return Err(GraphError::reference(from));
        }
        if !self.nodes.contains_key(to) {
            return Err(GraphError::reference(to));
        }

        self.edges.entry(from.to_string()).or_default().push(Edge {
            from: from.to_string(),
            to: to.to_string(),
            guard,
        });
        Ok(())
    }

    /// Append an edge that only fires when `guard` holds
    pub fn add_conditional_edge<G>(
        &mut self,
        from: &str,
        to: &str,
        guard: G,
    ) -> Result<(), GraphError>
    where
        G: Guard + 'static,
    {
        self.add_edge(from, to, Some(Arc::new(guard)))
    }

    pub fn start_node(&self) -> Option<&str> {
        self.start_node.as_deref()
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn contains_node(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Registered node names, sorted
    pub fn node_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.nodes.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Outgoing edges of `name` in registration order
    pub fn edges_from(&self, name: &str) -> &[Edge] {
        self.edges.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Run the graph from its start node
    pub fn run(&self, initial_state: &State) -> Result<RunResult, GraphError> {
        self.run_with_observer(initial_state, |_| {})
    }

    /// Run the graph, calling `observer` with each trace entry as it is recorded.
    ///
    /// If a step fails the observer has seen exactly the steps that completed.
    pub fn run_with_observer<F>(
        &self,
        initial_state: &State,
        mut observer: F,
    ) -> Result<RunResult, GraphError>
    where
        F: FnMut(&TraceStep),
    {
        let start = self
            .start_node
            .as_deref()
            .ok_or_else(|| GraphError::configuration("Graph has no start node"))?;

        let mut state = initial_state.clone();
        let mut steps: Vec<TraceStep> = Vec::new();
        let mut current = Some(start.to_string());

        while let Some(node_name) = current.take() {
            if steps.len() >= self.max_steps {
                log::warn!(
                    "Run stopped at step limit ({}) before executing '{}'",
                    self.max_steps,
                    node_name
                );
                break;
            }

            let node = self
                .nodes
                .get(&node_name)
                .ok_or_else(|| GraphError::reference(node_name.as_str()))?;

            log::debug!("Executing node: {}", node.name);

            let update = node.step.call(&mut state).map_err(|source| {
                log::error!("Error in node {}: {}", node.name, source);
                GraphError::StepExecution {
                    node: node.name.clone(),
                    source,
                }
            })?;
            state::merge(&mut state, update);

            let entry = TraceStep {
                node: node.name.clone(),
                state_snapshot: state.clone(),
            };
            observer(&entry);
            steps.push(entry);

            current = self.next_node(&node.name, &state);
            match &current {
                Some(next) => log::debug!("Transition {} -> {}", node.name, next),
                None => log::debug!("Node {} is terminal", node.name),
            }
        }

        log::info!("Run finished after {} steps", steps.len());

        Ok(RunResult {
            final_state: state,
            steps,
        })
    }

    /// First outgoing edge, in registration order, whose guard matches
    fn next_node(&self, from: &str, state: &State) -> Option<String> {
        self.edges_from(from)
            .iter()
            .find(|edge| edge.matches(state))
            .map(|edge| edge.to.clone())
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let edges: Vec<(&str, &str, bool)> = self
            .node_names()
            .into_iter()
            .flat_map(|n| self.edges_from(n))
            .map(|e| (e.from.as_str(), e.to.as_str(), e.guard.is_some()))
            .collect();

        f.debug_struct("Graph")
            .field("nodes", &self.node_names())
            .field("edges", &edges)
            .field("start_node", &self.start_node)
            .field("max_steps", &self.max_steps)
            .finish()
    }
}
