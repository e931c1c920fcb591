// SPDX-License-Identifier: MIT

use crate::engine::StepFunction;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
struct RegisteredStep {
    description: String,
    step: Arc<dyn StepFunction>,
}

/// Name -> step function lookup used when building graphs from definitions
#[derive(Clone)]
pub struct StepRegistry {
    steps: Arc<RwLock<HashMap<String, RegisteredStep>>>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self {
            steps: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registry preloaded with the sample workflow steps
    pub async fn with_builtin_steps() -> Self {
        let registry = Self::new();
        crate::flow::workflows::code_review::register_steps(&registry).await;
        registry
    }

    /// Register a step; an existing step with the same name is replaced
    pub async fn register<S>(&self, name: &str, description: &str, step: S)
    where
        S: StepFunction + 'static,
    {
        self.register_shared(name, description, Arc::new(step)).await
    }

    pub async fn register_shared(
        &self,
        name: &str,
        description: &str,
        step: Arc<dyn StepFunction>,
    ) {
        let mut steps = self.steps.write().await;
        if steps.contains_key(name) {
            log::debug!("Replacing registered step: {}", name);
        }
        steps.insert(
            name.to_string(),
            RegisteredStep {
                description: description.to_string(),
                step,
            },
        );
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn StepFunction>> {
        let steps = self.steps.read().await;
        steps.get(name).map(|s| s.step.clone())
    }

    /// Registered step names with their descriptions
    pub async fn list(&self) -> BTreeMap<String, String> {
        let steps = self.steps.read().await;
        steps
            .iter()
            .map(|(name, s)| {
                let description = if s.description.is_empty() {
                    "No description".to_string()
                } else {
                    s.description.clone()
                };
                (name.clone(), description)
            })
            .collect()
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::new()
    }
}
