//! Graph definition loader - YAML/JSON file loading and parsing

use super::error::FlowError;
use super::types::GraphDefinition;
use std::fs;
use std::path::Path;

/// Loads graph definitions from files
pub struct GraphLoader;

impl GraphLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a definition; `.json` files are parsed as JSON, anything else as YAML
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<GraphDefinition, FlowError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::parse_json(&content)
        } else {
            Self::parse_yaml(&content)
        }
    }

    pub fn parse_yaml(content: &str) -> Result<GraphDefinition, FlowError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn parse_json(content: &str) -> Result<GraphDefinition, FlowError> {
        Ok(serde_json::from_str(content)?)
    }
}

impl Default for GraphLoader {
    fn default() -> Self {
        Self::new()
    }
}
