//! Catalog configuration.

use std::path::Path;

use serde::Deserialize;

use crate::error::Result;

/// Configuration for a [`Database`](crate::Database) catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Load dictionaries lazily.
    ///
    /// When set, attaching a dictionary with `load_now` only schedules a
    /// background reload. When cleared, the attach blocks until the loader
    /// has finished.
    pub dictionaries_lazy_load: bool,

    /// Run the shutdown sequence when the database is dropped.
    pub shutdown_on_drop: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            dictionaries_lazy_load: true,
            shutdown_on_drop: true,
        }
    }
}

impl CatalogConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from a JSON document. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Set lazy dictionary loading.
    pub fn with_dictionaries_lazy_load(mut self, lazy: bool) -> Self {
        self.dictionaries_lazy_load = lazy;
        self
    }

    /// Set whether dropping the database shuts it down.
    pub fn with_shutdown_on_drop(mut self, enabled: bool) -> Self {
        self.shutdown_on_drop = enabled;
        self
    }
}
