// SPDX-License-Identifier: MIT

//! Schema-less workflow state
//!
//! State is a plain JSON object. Steps agree out-of-band on which keys they
//! read and write; there is no schema layer.

use serde_json::{Map, Value};

/// The key/value document threaded through a run
pub type State = Map<String, Value>;

/// Shallow-merge `update` into `state`.
///
/// Each key in `update` overwrites or inserts into `state`. Nested objects are
/// replaced wholesale, never deep-merged.
pub fn merge(state: &mut State, update: State) {
    for (key, value) in update {
        state.insert(key, value);
    }
}

/// Get a nested value using dot notation (e.g., "result.intent")
pub fn get_path<'a>(state: &'a State, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = state.get(parts.next()?)?;
    for part in parts {
        current = current.get(part)?;
    }
    Some(current)
}

/// Build a state from a JSON value, rejecting anything that isn't an object
pub fn from_value(value: Value) -> Option<State> {
    match value {
        Value::Object(map) => Some(map),
        Value::Null => Some(State::new()),
        _ => None,
    }
}
