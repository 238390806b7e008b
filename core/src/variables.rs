//! Thread-local variable scope

use std::collections::HashMap;

use crate::plan::ConfigElement;

/// Key/value store owned by exactly one virtual user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables {
    values: HashMap<String, String>,
}

impl Variables {
    /// Create an empty scope
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a variable
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Write a variable, returning the previous value
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(key.into(), value.into())
    }

    /// Remove a variable
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    /// Whether the variable is set
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of variables
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the scope is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over variables, sorted by key
    pub fn iter_sorted(&self) -> impl Iterator<Item = (&str, &str)> {
        let mut entries: Vec<_> = self
            .values
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries.into_iter()
    }

    /// Seed defaults from a config element without overwriting existing keys
    pub fn apply_defaults(&mut self, config: &ConfigElement) {
        for (key, value) in &config.variables {
            self.values
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }
}
