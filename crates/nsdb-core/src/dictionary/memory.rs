//! In-process dictionary loader.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::{Dictionary, DictionaryLoader, DictionaryPtr, DictionaryStructure};
use crate::error::{Error, Result};

/// A dictionary materialized by [`MemoryDictionaryLoader`].
#[derive(Debug, Clone)]
pub struct LoadedDictionary {
    full_name: String,
    structure: DictionaryStructure,
}

impl LoadedDictionary {
    /// Create a loaded dictionary.
    pub fn new(full_name: impl Into<String>, structure: DictionaryStructure) -> Self {
        Self {
            full_name: full_name.into(),
            structure,
        }
    }
}

impl Dictionary for LoadedDictionary {
    fn full_name(&self) -> &str {
        &self.full_name
    }

    fn structure(&self) -> &DictionaryStructure {
        &self.structure
    }
}

struct LoaderState {
    /// Registered definitions by qualified name.
    definitions: DashMap<String, DictionaryStructure>,
    /// Names whose next reloads fail with the stored message.
    failures: DashMap<String, String>,
    /// Currently loaded dictionaries.
    loaded: DashMap<String, DictionaryPtr>,
    lookups: AtomicU64,
    reloads: AtomicU64,
}

impl LoaderState {
    fn reload_now(&self, name: &str) -> Result<()> {
        self.reloads.fetch_add(1, Ordering::Relaxed);

        if let Some(message) = self.failures.get(name).map(|m| m.value().clone()) {
            self.loaded.remove(name);
            return Err(Error::Loader {
                name: name.to_string(),
                message,
            });
        }

        let definition = self.definitions.get(name).map(|d| d.value().clone());
        match definition {
            Some(structure) => {
                let dictionary: DictionaryPtr = Arc::new(LoadedDictionary::new(name, structure));
                self.loaded.insert(name.to_string(), dictionary);
                debug!(dictionary = %name, "dictionary loaded");
            }
            None => {
                if self.loaded.remove(name).is_some() {
                    debug!(dictionary = %name, "dictionary unloaded");
                }
            }
        }
        Ok(())
    }
}

/// Dictionary loader that keeps definitions and loaded dictionaries in memory.
///
/// A reload brings the loaded state of a name in line with its current
/// definition: a registered definition is (re)materialized, a missing one is
/// unloaded. Non-waiting reloads run on a background thread.
pub struct MemoryDictionaryLoader {
    state: Arc<LoaderState>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl MemoryDictionaryLoader {
    /// Create an empty loader.
    pub fn new() -> Self {
        Self {
            state: Arc::new(LoaderState {
                definitions: DashMap::new(),
                failures: DashMap::new(),
                loaded: DashMap::new(),
                lookups: AtomicU64::new(0),
                reloads: AtomicU64::new(0),
            }),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Register or replace a definition. Takes effect on the next reload.
    pub fn register(&self, name: impl Into<String>, structure: DictionaryStructure) {
        self.state.definitions.insert(name.into(), structure);
    }

    /// Remove a definition. Returns true if it existed.
    pub fn remove_definition(&self, name: &str) -> bool {
        self.state.definitions.remove(name).is_some()
    }

    /// Make reloads of `name` fail until [`clear_failure`](Self::clear_failure).
    pub fn set_failure(&self, name: impl Into<String>, message: impl Into<String>) {
        self.state.failures.insert(name.into(), message.into());
    }

    /// Stop failing reloads of `name`.
    pub fn clear_failure(&self, name: &str) {
        self.state.failures.remove(name);
    }

    /// Check if a dictionary is currently loaded.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.state.loaded.contains_key(name)
    }

    /// Number of `try_get_dictionary` calls served.
    pub fn lookup_count(&self) -> u64 {
        self.state.lookups.load(Ordering::Relaxed)
    }

    /// Number of reloads performed, including background ones that finished.
    pub fn reload_count(&self) -> u64 {
        self.state.reloads.load(Ordering::Relaxed)
    }

    /// Block until every scheduled background reload has finished.
    pub fn wait_for_pending(&self) {
        let handles = std::mem::take(&mut *self.pending.lock());
        for handle in handles {
            if handle.join().is_err() {
                warn!("background dictionary reload panicked");
            }
        }
    }
}

impl Default for MemoryDictionaryLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DictionaryLoader for MemoryDictionaryLoader {
    fn try_get_dictionary(&self, name: &str) -> Option<DictionaryPtr> {
        self.state.lookups.fetch_add(1, Ordering::Relaxed);
        self.state.loaded.get(name).map(|entry| entry.value().clone())
    }

    fn reload(&self, name: &str, wait_until_loaded: bool) -> Result<()> {
        if wait_until_loaded {
            return self.state.reload_now(name);
        }

        let state = Arc::clone(&self.state);
        let name = name.to_string();
        let handle = thread::spawn(move || {
            if let Err(e) = state.reload_now(&name) {
                warn!(dictionary = %name, error = %e, "background dictionary reload failed");
            }
        });
        let mut pending = self.pending.lock();
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
        Ok(())
    }
}
