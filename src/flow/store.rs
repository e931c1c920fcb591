// SPDX-License-Identifier: MIT

//! In-memory storage for created graphs and run records
//!
//! Nothing here survives a restart.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::engine::{Graph, RunResult, State, TraceStep};

/// Graphs keyed by id
#[derive(Clone, Default)]
pub struct GraphStore {
    graphs: Arc<RwLock<HashMap<String, Arc<Graph>>>>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a graph under a fresh id and return the id
    pub async fn insert(&self, graph: Graph) -> String {
        let id = Uuid::new_v4().to_string();
        self.insert_with_id(&id, graph).await;
        id
    }

    pub async fn insert_with_id(&self, id: &str, graph: Graph) {
        self.graphs
            .write()
            .await
            .insert(id.to_string(), Arc::new(graph));
    }

    pub async fn get(&self, id: &str) -> Option<Arc<Graph>> {
        self.graphs.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.graphs.read().await.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Failed,
}

/// What is kept about one run, successful or not
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub run_id: String,
    pub graph_id: String,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_state: Option<State>,
    /// Steps that completed, in order
    pub execution_log: Vec<TraceStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunRecord {
    pub fn completed(graph_id: &str, started_at: DateTime<Utc>, result: RunResult) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            graph_id: graph_id.to_string(),
            status: RunStatus::Completed,
            final_state: Some(result.final_state),
            execution_log: result.steps,
            error: None,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Record a failed run with the steps that completed before the failure
    pub fn failed(
        graph_id: &str,
        started_at: DateTime<Utc>,
        completed_steps: Vec<TraceStep>,
        error: String,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            graph_id: graph_id.to_string(),
            status: RunStatus::Failed,
            final_state: None,
            execution_log: completed_steps,
            error: Some(error),
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Node names from the execution log
    pub fn node_names(&self) -> Vec<String> {
        self.execution_log.iter().map(|s| s.node.clone()).collect()
    }
}

/// Run records keyed by run id
#[derive(Clone, Default)]
pub struct RunStore {
    runs: Arc<RwLock<HashMap<String, RunRecord>>>,
}

impl RunStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, record: RunRecord) {
        self.runs
            .write()
            .await
            .insert(record.run_id.clone(), record);
    }

    pub async fn get(&self, run_id: &str) -> Option<RunRecord> {
        self.runs.read().await.get(run_id).cloned()
    }
}
