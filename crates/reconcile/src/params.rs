//! Parameter maps built from `key=value` lists

use crate::error::ReconcileError;
use crate::types::Stage;
use std::collections::BTreeMap;

/// Key/value lookup for template rendering. Last write wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterMap {
    values: BTreeMap<String, String>,
}

impl ParameterMap {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from `entries`, splitting each on its first `=`.
    ///
    /// `list` names the source list in error messages.
    pub fn parse(list: &str, entries: &[String]) -> Result<Self, ReconcileError> {
        let mut map = Self::new();
        for (index, entry) in entries.iter().enumerate() {
            let (key, value) =
                vaultkit::split_entry(index, entry).map_err(|_| {
                    ReconcileError::input(
                        Stage::Render,
                        format!("{list} parameters"),
                        format!("entry #{index} is not of the form key=value"),
                    )
                })?;
            map.insert(key.trim(), value);
        }
        Ok(map)
    }

    /// Insert or replace a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Look up a value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}
