//! Integration tests for graph building, execution and the HTTP API
//!
//! These tests drive the crate through its public surface only.

use flowline_rs::config::ServerConfig;
use flowline_rs::engine::{guard, state, step, Graph, GraphError, State, MAX_STEPS};
use flowline_rs::flow::builder::GraphBuilder;
use flowline_rs::flow::loader::GraphLoader;
use flowline_rs::flow::registry::StepRegistry;
use flowline_rs::flow::server::{router, AppState};
use flowline_rs::flow::workflows::code_review::SAMPLE_GRAPH_ID;
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::sync::Arc;

// ============================================================================
// Fixtures
// ============================================================================

static RETRY_GRAPH_YAML: Lazy<String> = Lazy::new(|| {
    r#"
name: retry-until-ready
nodes:
  - name: attempt
    tool: bump_attempts
    is_start: true
  - name: finish
    tool: mark_done
edges:
  - from_node: attempt
    to_node: attempt
    condition: "attempts < 4"
  - from_node: attempt
    to_node: finish
"#
    .to_string()
});

fn state_of(value: Value) -> State {
    state::from_value(value).unwrap()
}

async fn test_registry() -> StepRegistry {
    let registry = StepRegistry::with_builtin_steps().await;
    registry
        .register(
            "bump_attempts",
            "Counts attempts",
            step(|state: &mut State| {
                let attempts = state.get("attempts").and_then(Value::as_i64).unwrap_or(0);
                Ok(state_of(json!({ "attempts": attempts + 1 })))
            }),
        )
        .await;
    registry
        .register(
            "mark_done",
            "Marks the run as done",
            step(|_state: &mut State| Ok(state_of(json!({ "done": true })))),
        )
        .await;
    registry
        .register(
            "fail",
            "Always fails",
            step(|_state: &mut State| Err("step blew up".into())),
        )
        .await;
    registry
}

/// Start the API on an ephemeral port and return its base URL
async fn spawn_server() -> String {
    let state = AppState::new(ServerConfig::default()).await.unwrap();
    let app = router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

// ============================================================================
// Engine scenarios
// ============================================================================

#[test]
fn test_linear_scenario() {
    let mut graph = Graph::new();
    graph.add_node(
        "S1",
        step(|_s: &mut State| Ok(state_of(json!({"a": 1})))),
        true,
    );
    graph.add_node(
        "S2",
        step(|_s: &mut State| Ok(state_of(json!({"b": 2})))),
        false,
    );
    graph.add_edge("S1", "S2", None).unwrap();

    let result = graph.run(&State::new()).unwrap();

    assert_eq!(Value::Object(result.final_state), json!({"a": 1, "b": 2}));
    assert_eq!(result.steps.len(), 2);
}

#[test]
fn test_pathological_self_loop_is_capped() {
    let mut graph = Graph::new();
    graph.add_node("spin", step(|_s: &mut State| Ok(State::new())), true);
    graph
        .add_conditional_edge("spin", "spin", guard(|_s: &State| true))
        .unwrap();

    let result = graph.run(&State::new()).unwrap();
    assert_eq!(result.steps.len(), MAX_STEPS);
}

#[test]
fn test_graph_shared_across_threads() {
    let mut graph = Graph::new();
    graph.add_node(
        "double",
        step(|state: &mut State| {
            let n = state.get("n").and_then(Value::as_i64).unwrap_or(0);
            Ok(state_of(json!({ "n": n * 2 })))
        }),
        true,
    );
    let graph = Arc::new(graph);

    let handles: Vec<_> = (1..=4)
        .map(|i| {
            let graph = graph.clone();
            std::thread::spawn(move || graph.run(&state_of(json!({ "n": i }))).unwrap())
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let result = handle.join().unwrap();
        assert_eq!(result.final_state["n"], json!((i as i64 + 1) * 2));
    }
}

// ============================================================================
// Definitions -> builder -> run
// ============================================================================

#[tokio::test]
async fn test_yaml_definition_with_condition_edges() {
    let def = GraphLoader::parse_yaml(&RETRY_GRAPH_YAML).unwrap();
    let graph = GraphBuilder::new(test_registry().await)
        .build(&def)
        .await
        .unwrap();

    let result = graph.run(&State::new()).unwrap();

    assert_eq!(
        result.node_names(),
        vec!["attempt", "attempt", "attempt", "attempt", "finish"]
    );
    assert_eq!(result.final_state["attempts"], json!(4));
    assert_eq!(result.final_state["done"], json!(true));
}

#[tokio::test]
async fn test_failing_definition_propagates_step_error() {
    let def = GraphLoader::parse_json(
        r#"{
            "nodes": [
                {"name": "ok", "tool": "mark_done", "is_start": true},
                {"name": "bad", "tool": "fail"}
            ],
            "edges": [{"from_node": "ok", "to_node": "bad"}]
        }"#,
    )
    .unwrap();
    let graph = GraphBuilder::new(test_registry().await)
        .build(&def)
        .await
        .unwrap();

    let mut completed = Vec::new();
    let err = graph
        .run_with_observer(&State::new(), |entry| completed.push(entry.node.clone()))
        .unwrap_err();

    assert!(matches!(err, GraphError::StepExecution { ref node, .. } if node == "bad"));
    assert_eq!(completed, vec!["ok".to_string()]);
}

// ============================================================================
// HTTP API
// ============================================================================

#[tokio::test]
async fn test_api_root_and_tools() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();

    let root: Value = client
        .get(format!("{}/", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(root["message"].as_str().unwrap().contains("running"));

    let tools: Value = client
        .get(format!("{}/tools", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        tools["extract_functions"],
        "Simulate extracting functions from code."
    );
}

#[tokio::test]
async fn test_api_create_and_run_graph() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();

    let created = client
        .post(format!("{}/graph/create", base))
        .json(&json!({
            "nodes": [
                {"name": "step1", "tool": "extract_functions", "is_start": true},
                {"name": "step2", "tool": "detect_issues"}
            ],
            "edges": [{"from_node": "step1", "to_node": "step2"}]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), 200);
    let created: Value = created.json().await.unwrap();
    let graph_id = created["graph_id"].as_str().unwrap().to_string();

    let run = client
        .post(format!("{}/graph/run", base))
        .json(&json!({
            "graph_id": graph_id,
            "initial_state": {"code": "def hello():\n    print('world')"}
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(run.status(), 200);
    let run: Value = run.json().await.unwrap();

    assert_eq!(run["execution_log"], json!(["step1", "step2"]));
    assert_eq!(run["final_state"]["functions"], json!(["def hello():"]));
    assert_eq!(
        run["final_state"]["issues"],
        json!(["Avoid using print() in production."])
    );

    let run_id = run["run_id"].as_str().unwrap();
    let record: Value = client
        .get(format!("{}/graph/state/{}", base, run_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(record["status"], "completed");
    assert_eq!(record["graph_id"], graph_id);
    assert_eq!(record["execution_log"][1]["node"], "step2");
}

#[tokio::test]
async fn test_api_sample_graph() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();

    let run: Value = client
        .post(format!("{}/graph/run", base))
        .json(&json!({
            "graph_id": SAMPLE_GRAPH_ID,
            "initial_state": {
                "code": "import *\ndef bad():\n    print('bad')\n",
                "target_quality": 80,
                "max_retries": 2
            }
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let log: Vec<&str> = run["execution_log"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(log[0], "extract_functions");
    assert_eq!(log.last(), Some(&"suggest_improvements"));
    assert_eq!(run["final_state"]["iteration"], json!(2));
}

#[tokio::test]
async fn test_api_errors() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();

    let unknown_tool = client
        .post(format!("{}/graph/create", base))
        .json(&json!({
            "nodes": [{"name": "a", "tool": "does_not_exist", "is_start": true}],
            "edges": []
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown_tool.status(), 400);

    let unknown_node = client
        .post(format!("{}/graph/create", base))
        .json(&json!({
            "nodes": [{"name": "a", "tool": "detect_issues", "is_start": true}],
            "edges": [{"from_node": "a", "to_node": "ghost"}]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown_node.status(), 400);
    let body: Value = unknown_node.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("ghost"));

    let missing_graph = client
        .post(format!("{}/graph/run", base))
        .json(&json!({"graph_id": "nope", "initial_state": {}}))
        .send()
        .await
        .unwrap();
    assert_eq!(missing_graph.status(), 404);

    let missing_run = client
        .get(format!("{}/graph/state/nope", base))
        .send()
        .await
        .unwrap();
    assert_eq!(missing_run.status(), 404);
}

#[tokio::test]
async fn test_api_malformed_body_returns_json_error() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();

    let missing_field = client
        .post(format!("{}/graph/run", base))
        .json(&json!({"initial_state": {}}))
        .send()
        .await
        .unwrap();
    assert_eq!(missing_field.status(), 422);
    let body: Value = missing_field.json().await.unwrap();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid request body"));

    let broken_json = client
        .post(format!("{}/graph/create", base))
        .header("content-type", "application/json")
        .body("{\"nodes\": [")
        .send()
        .await
        .unwrap();
    assert_eq!(broken_json.status(), 400);
    let body: Value = broken_json.json().await.unwrap();
    assert!(body["error"].is_string());

    let stream = client
        .post(format!("{}/graph/run/stream", base))
        .json(&json!({"graph_id": 7}))
        .send()
        .await
        .unwrap();
    assert_eq!(stream.status(), 422);
    let body: Value = stream.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_api_health_counts_graphs() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();

    let health: Value = client
        .get(format!("{}/health", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["graphs"], json!(1));

    client
        .post(format!("{}/graph/create", base))
        .json(&json!({
            "nodes": [{"name": "a", "tool": "detect_issues", "is_start": true}],
            "edges": []
        }))
        .send()
        .await
        .unwrap();

    let health: Value = client
        .get(format!("{}/health", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["graphs"], json!(2));
}

#[tokio::test]
async fn test_api_run_without_start_node_fails() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();

    let created: Value = client
        .post(format!("{}/graph/create", base))
        .json(&json!({
            "nodes": [{"name": "a", "tool": "detect_issues"}],
            "edges": []
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let run = client
        .post(format!("{}/graph/run", base))
        .json(&json!({"graph_id": created["graph_id"], "initial_state": {}}))
        .send()
        .await
        .unwrap();
    assert_eq!(run.status(), 500);
    let body: Value = run.json().await.unwrap();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Graph has no start node"));

    let record: Value = client
        .get(format!("{}/graph/state/{}", base, body["run_id"].as_str().unwrap()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(record["status"], "failed");
    assert_eq!(record["execution_log"], json!([]));
}

#[tokio::test]
async fn test_api_stream_run() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();

    let body = client
        .post(format!("{}/graph/run/stream", base))
        .json(&json!({
            "graph_id": SAMPLE_GRAPH_ID,
            "initial_state": {"code": "def a():\n    pass", "max_retries": 1}
        }))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert_eq!(body.matches("event: step").count(), 4);
    assert!(body.contains("event: completed"));
    assert!(body.contains("\"node\":\"detect_issues\""));
}
