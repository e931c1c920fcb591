// SPDX-License-Identifier: MIT

//! Sample "code review" workflow
//!
//! extract_functions -> check_complexity -> detect_issues -> suggest_improvements,
//! then suggest_improvements loops on itself until the quality target is met
//! or the retry budget is spent.

use rand::Rng;
use serde_json::{json, Number, Value};

use crate::engine::{guard, step, Graph, GraphError, State, StepFunction, StepResult};
use crate::flow::registry::StepRegistry;

/// Id under which the sample graph is preloaded
pub const SAMPLE_GRAPH_ID: &str = "sample-code-review";

const DEFAULT_TARGET_QUALITY: f64 = 80.0;
const DEFAULT_MAX_RETRIES: f64 = 3.0;

fn number_field(state: &State, key: &str, default: f64) -> f64 {
    state.get(key).and_then(Value::as_f64).unwrap_or(default)
}

/// `key + delta`, staying integral unless the stored value is a float
fn add_to_field(state: &State, key: &str, delta: i64) -> Value {
    match state.get(key) {
        Some(Value::Number(n)) => add_number(n, delta),
        _ => json!(delta),
    }
}

fn add_number(n: &Number, delta: i64) -> Value {
    match n.as_i64() {
        Some(i) => json!(i + delta),
        None => json!(n.as_f64().unwrap_or(0.0) + delta as f64),
    }
}

fn code(state: &State) -> &str {
    state.get("code").and_then(Value::as_str).unwrap_or("")
}

fn update(value: Value) -> State {
    match value {
        Value::Object(map) => map,
        _ => State::new(),
    }
}

/// Collect the lines that define functions
pub fn extract_functions(state: &mut State) -> StepResult {
    let functions: Vec<&str> = code(state)
        .split('\n')
        .filter(|line| line.trim().starts_with("def "))
        .collect();
    Ok(update(json!({ "functions": functions })))
}

/// Mock complexity score: number of functions times a random factor
pub fn check_complexity(state: &mut State) -> StepResult {
    let count = state
        .get("functions")
        .and_then(Value::as_array)
        .map_or(0, Vec::len) as i64;
    let factor: i64 = rand::thread_rng().gen_range(1..=10);
    Ok(update(json!({ "complexity_score": count * factor })))
}

pub fn detect_issues(state: &mut State) -> StepResult {
    let source = code(state);
    let mut issues = Vec::new();
    if source.contains("print(") {
        issues.push("Avoid using print() in production.");
    }
    if source.contains("import *") {
        issues.push("Avoid wildcard imports.");
    }
    Ok(update(json!({ "issues": issues })))
}

/// Raise the quality score and count the iteration.
///
/// `iteration` is bumped directly on the live state rather than returned.
pub fn suggest_improvements(state: &mut State) -> StepResult {
    let quality = add_to_field(state, "quality_score", rand::thread_rng().gen_range(10..=30));

    let iteration = add_to_field(state, "iteration", 1);
    state.insert("iteration".to_string(), iteration);

    let summary = format!("Improved code quality to {}", quality);
    Ok(update(json!({
        "quality_score": quality,
        "review_summary": summary,
    })))
}

/// True once the target is met or the retry budget is exhausted
pub fn is_quality_sufficient(state: &State) -> bool {
    let target = number_field(state, "target_quality", DEFAULT_TARGET_QUALITY);
    let current = number_field(state, "quality_score", 0.0);
    let iteration = number_field(state, "iteration", 0.0);
    let max_retries = number_field(state, "max_retries", DEFAULT_MAX_RETRIES);

    current >= target || iteration >= max_retries
}

fn steps() -> Vec<(&'static str, &'static str, Box<dyn StepFunction>)> {
    vec![
        (
            "extract_functions",
            "Simulate extracting functions from code.",
            Box::new(step(extract_functions)),
        ),
        (
            "check_complexity",
            "Simulate complexity check.",
            Box::new(step(check_complexity)),
        ),
        (
            "detect_issues",
            "Simulate issue detection.",
            Box::new(step(detect_issues)),
        ),
        (
            "suggest_improvements",
            "Simulate suggestion generation and improvement.",
            Box::new(step(suggest_improvements)),
        ),
    ]
}

/// Register the code review steps under their function names
pub async fn register_steps(registry: &StepRegistry) {
    for (name, description, step) in steps() {
        registry.register_shared(name, description, step.into()).await;
    }
}

/// Build the sample code review graph
pub fn create_code_review_graph() -> Result<Graph, GraphError> {
    let mut graph = Graph::new();

    graph.add_node("extract_functions", step(extract_functions), true);
    graph.add_node("check_complexity", step(check_complexity), false);
    graph.add_node("detect_issues", step(detect_issues), false);
    graph.add_node("suggest_improvements", step(suggest_improvements), false);

    graph.add_edge("extract_functions", "check_complexity", None)?;
    graph.add_edge("check_complexity", "detect_issues", None)?;
    graph.add_edge("detect_issues", "suggest_improvements", None)?;

    // No edge out once quality is sufficient, so the run ends there.
    graph.add_conditional_edge(
        "suggest_improvements",
        "suggest_improvements",
        guard(|state: &State| !is_quality_sufficient(state)),
    )?;

    Ok(graph)
}
