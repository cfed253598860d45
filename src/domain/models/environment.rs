//! Shared environment dictionary owned by the phase chain.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// String-keyed values shared across phases (task prompt, modality,
/// language, code artifacts, review comments, test reports), plus the
/// roster of recruited roles.
///
/// Owned by the chain; mutated only by the currently executing phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainEnv {
    values: HashMap<String, String>,
    recruited: BTreeSet<String>,
}

impl ChainEnv {
    /// Create an environment seeded with the task prompt.
    pub fn new(task_prompt: impl Into<String>) -> Self {
        let mut env = Self::default();
        env.set("task_prompt", task_prompt.into());
        env
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Value for `key`, or the empty string when absent.
    pub fn get_or_empty(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// All values, for placeholder rendering.
    pub fn values(&self) -> &HashMap<String, String> {
        &self.values
    }

    /// Register a role as an active participant.
    pub fn recruit(&mut self, role_name: impl Into<String>) {
        self.recruited.insert(role_name.into());
    }

    pub fn is_recruited(&self, role_name: &str) -> bool {
        self.recruited.contains(role_name)
    }

    /// Recruited roles in stable (sorted) order.
    pub fn recruited(&self) -> impl Iterator<Item = &str> {
        self.recruited.iter().map(String::as_str)
    }

    pub fn task_prompt(&self) -> &str {
        self.get_or_empty("task_prompt")
    }
}
