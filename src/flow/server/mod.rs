// SPDX-License-Identifier: MIT

//! HTTP API over the graph engine
//!
//! Graphs are created from definitions, stored in memory and run on the
//! blocking pool since traversal is synchronous.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::engine::{self, TraceStep};
use crate::flow::builder::GraphBuilder;
use crate::flow::error::FlowError;
use crate::flow::registry::StepRegistry;
use crate::flow::store::{GraphStore, RunRecord, RunStatus, RunStore};
use crate::flow::types::GraphDefinition;
use crate::flow::workflows::code_review::{create_code_review_graph, SAMPLE_GRAPH_ID};

/// Shared state for axum handlers
pub struct AppState {
    pub config: ServerConfig,
    pub registry: StepRegistry,
    pub graphs: GraphStore,
    pub runs: RunStore,
}

impl AppState {
    /// Builtin steps registered and the sample graph preloaded
    pub async fn new(config: ServerConfig) -> Result<Self, FlowError> {
        let graphs = GraphStore::new();
        graphs
            .insert_with_id(SAMPLE_GRAPH_ID, create_code_review_graph()?)
            .await;

        Ok(Self {
            config,
            registry: StepRegistry::with_builtin_steps().await,
            graphs,
            runs: RunStore::new(),
        })
    }
}

impl IntoResponse for FlowError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(read_root))
        .route("/health", get(health_check))
        .route("/tools", get(list_tools))
        .route("/graph/create", post(create_graph))
        .route("/graph/run", post(run_graph))
        .route("/graph/run/stream", post(stream_run))
        .route("/graph/state/{run_id}", get(get_run_state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(config: ServerConfig) -> Result<(), FlowError> {
    let addr = config.addr();
    let app = router(Arc::new(AppState::new(config).await?));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn read_root() -> Json<Value> {
    Json(json!({ "message": "Workflow Engine is running." }))
}

async fn health_check(State(app): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "graphs": app.graphs.len().await,
    }))
}

async fn list_tools(State(app): State<Arc<AppState>>) -> Json<Value> {
    Json(json!(app.registry.list().await))
}

async fn create_graph(
    State(app): State<Arc<AppState>>,
    payload: Result<Json<GraphDefinition>, JsonRejection>,
) -> Result<Json<Value>, FlowError> {
    let Json(def) = payload?;
    let builder =
        GraphBuilder::new(app.registry.clone()).with_default_max_steps(app.config.max_steps);
    let graph = builder.build(&def).await?;
    let graph_id = app.graphs.insert(graph).await;

    log::info!("Created graph {}", graph_id);
    Ok(Json(json!({
        "graph_id": graph_id,
        "message": "Graph created successfully",
    })))
}

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub graph_id: String,
    #[serde(default)]
    pub initial_state: engine::State,
}

/// Run a stored graph and keep its record, calling `on_step` for each trace entry
async fn execute_run<F>(
    app: &AppState,
    graph_id: &str,
    initial_state: engine::State,
    mut on_step: F,
) -> Result<RunRecord, FlowError>
where
    F: FnMut(&TraceStep) + Send + 'static,
{
    let graph = app
        .graphs
        .get(graph_id)
        .await
        .ok_or_else(|| FlowError::GraphNotFound(graph_id.to_string()))?;

    let started_at = Utc::now();
    let record_graph_id = graph_id.to_string();

    let record = tokio::task::spawn_blocking(move || {
        let mut completed: Vec<TraceStep> = Vec::new();
        let outcome = graph.run_with_observer(&initial_state, |entry| {
            completed.push(entry.clone());
            on_step(entry);
        });

        match outcome {
            Ok(result) => RunRecord::completed(&record_graph_id, started_at, result),
            Err(e) => RunRecord::failed(&record_graph_id, started_at, completed, e.to_string()),
        }
    })
    .await
    .map_err(|e| FlowError::other(format!("Run task failed: {}", e)))?;

    match &record.error {
        None => log::info!(
            "Run {} of graph {} completed in {} steps",
            record.run_id,
            graph_id,
            record.execution_log.len()
        ),
        Some(error) => log::error!("Run {} of graph {} failed: {}", record.run_id, graph_id, error),
    }

    app.runs.insert(record.clone()).await;
    Ok(record)
}

async fn run_graph(
    State(app): State<Arc<AppState>>,
    payload: Result<Json<RunRequest>, JsonRejection>,
) -> Result<Response, FlowError> {
    let Json(request) = payload?;
    let record = execute_run(&app, &request.graph_id, request.initial_state, |_| {}).await?;

    let response = match record.status {
        RunStatus::Completed => (
            StatusCode::OK,
            Json(json!({
                "run_id": record.run_id,
                "final_state": record.final_state,
                "execution_log": record.node_names(),
            })),
        ),
        RunStatus::Failed => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "run_id": record.run_id,
                "error": format!(
                    "Execution failed: {}",
                    record.error.as_deref().unwrap_or("unknown error")
                ),
            })),
        ),
    };
    Ok(response.into_response())
}

/// Events emitted by the streaming run endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    Step {
        node: String,
        state_snapshot: engine::State,
    },
    Completed {
        run_id: String,
        final_state: engine::State,
    },
    Failed {
        #[serde(skip_serializing_if = "Option::is_none")]
        run_id: Option<String>,
        error: String,
    },
}

impl RunEvent {
    fn name(&self) -> &'static str {
        match self {
            RunEvent::Step { .. } => "step",
            RunEvent::Completed { .. } => "completed",
            RunEvent::Failed { .. } => "failed",
        }
    }

    fn from_record(record: RunRecord) -> Self {
        match (record.final_state, record.error) {
            (Some(final_state), None) => RunEvent::Completed {
                run_id: record.run_id,
                final_state,
            },
            (_, error) => RunEvent::Failed {
                run_id: Some(record.run_id),
                error: error.unwrap_or_else(|| "unknown error".to_string()),
            },
        }
    }
}

async fn stream_run(
    State(app): State<Arc<AppState>>,
    payload: Result<Json<RunRequest>, JsonRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, FlowError> {
    let Json(request) = payload?;
    let (tx, rx) = mpsc::channel(100);

    tokio::spawn(async move {
        log::info!("Starting streaming run for graph: {}", request.graph_id);

        let step_tx = tx.clone();
        let on_step = move |entry: &TraceStep| {
            let _ = step_tx.blocking_send(RunEvent::Step {
                node: entry.node.clone(),
                state_snapshot: entry.state_snapshot.clone(),
            });
        };

        let last = match execute_run(&app, &request.graph_id, request.initial_state, on_step).await
        {
            Ok(record) => RunEvent::from_record(record),
            Err(e) => RunEvent::Failed {
                run_id: None,
                error: e.to_string(),
            },
        };
        let _ = tx.send(last).await;
    });

    let stream = ReceiverStream::new(rx).map(|event| {
        Ok(Event::default()
            .event(event.name())
            .json_data(&event)
            .unwrap_or_else(|e| Event::default().event("error").data(e.to_string())))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(1))))
}

async fn get_run_state(
    State(app): State<Arc<AppState>>,
    Path(run_id): Path<String>,
) -> Result<Json<RunRecord>, FlowError> {
    app.runs
        .get(&run_id)
        .await
        .map(Json)
        .ok_or(FlowError::RunNotFound(run_id))
}
