//! In-memory catalog of one database namespace.
//!
//! Tables and dictionaries share one naming space and one mutex. The mutex
//! is held only while the maps are read or mutated; the dictionary loader and
//! table shutdown routines are always called after it is released, since
//! either may call back into the database and the lock is not reentrant.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::config::CatalogConfig;
use crate::dictionary::{qualified_name, DictionaryLoader};
use crate::error::{Error, ObjectKind, Result};
use crate::lifecycle::Lifecycle;
use crate::metrics::{CatalogMetrics, MetricsSnapshot};
use crate::snapshot::{DictionariesSnapshot, TablesSnapshot};
use crate::storage::StoragePtr;
use crate::view::build_view;

/// Name predicate used to narrow enumerations.
pub type NameFilter<'a> = &'a dyn Fn(&str) -> bool;

/// State guarded by the database mutex.
#[derive(Default)]
struct Registry {
    tables: BTreeMap<String, StoragePtr>,
    dictionaries: BTreeSet<String>,
    lifecycle: Lifecycle,
}

/// A named database owning its tables and the names of its dictionaries.
pub struct Database {
    name: String,
    loader: Arc<dyn DictionaryLoader>,
    config: CatalogConfig,
    state: Mutex<Registry>,
    metrics: CatalogMetrics,
}

impl Database {
    /// Create an empty database with default configuration.
    pub fn new(name: impl Into<String>, loader: Arc<dyn DictionaryLoader>) -> Self {
        Self::with_config(name, loader, CatalogConfig::default())
    }

    /// Create an empty database.
    pub fn with_config(
        name: impl Into<String>,
        loader: Arc<dyn DictionaryLoader>,
        config: CatalogConfig,
    ) -> Self {
        Self {
            name: name.into(),
            loader,
            config,
            state: Mutex::new(Registry::default()),
            metrics: CatalogMetrics::new(),
        }
    }

    /// Database name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Qualified name of `object` in this database.
    pub fn qualified_name(&self, object: &str) -> String {
        qualified_name(&self.name, object)
    }

    /// Catalog configuration.
    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn lifecycle(&self) -> Lifecycle {
        self.state.lock().lifecycle
    }

    /// Read the activity counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    // ========== Existence checks ==========

    /// Check if `name` is a table or a dictionary of this database.
    pub fn is_table_exist(&self, name: &str) -> bool {
        let state = self.state.lock();
        state.tables.contains_key(name) || state.dictionaries.contains(name)
    }

    /// Check if `name` is a dictionary of this database.
    pub fn is_dictionary_exist(&self, name: &str) -> bool {
        self.state.lock().dictionaries.contains(name)
    }

    /// Check if the database has neither tables nor dictionaries.
    pub fn is_empty(&self) -> bool {
        let state = self.state.lock();
        state.tables.is_empty() && state.dictionaries.is_empty()
    }

    /// Number of tables, not counting dictionaries.
    pub fn table_count(&self) -> usize {
        self.state.lock().tables.len()
    }

    /// Number of attached dictionaries.
    pub fn dictionary_count(&self) -> usize {
        self.state.lock().dictionaries.len()
    }

    // ========== Lookup ==========

    /// Get a table by name.
    ///
    /// A dictionary name resolves to a freshly built read-only view, or to
    /// `None` while the loader has no live dictionary for it.
    pub fn try_get_table(&self, name: &str) -> Option<StoragePtr> {
        {
            let state = self.state.lock();
            if let Some(table) = state.tables.get(name) {
                return Some(Arc::clone(table));
            }
            if !state.dictionaries.contains(name) {
                return None;
            }
        }

        self.dictionary_view(name)
    }

    fn dictionary_view(&self, name: &str) -> Option<StoragePtr> {
        let view = build_view(self.loader.as_ref(), &self.name, name);
        self.metrics.record_view(view.is_some());
        view
    }

    // ========== Tables ==========

    /// Attach a table under `name`.
    ///
    /// Fails with `AlreadyExists` if the name is taken by a table or a dictionary.
    pub fn attach_table(&self, name: &str, table: StoragePtr) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.dictionaries.contains(name) {
                return Err(self.already_exists(ObjectKind::Dictionary, name));
            }
            match state.tables.entry(name.to_string()) {
                Entry::Occupied(_) => return Err(self.already_exists(ObjectKind::Table, name)),
                Entry::Vacant(entry) => {
                    entry.insert(table);
                }
            }
        }

        self.metrics.record_table_attached();
        debug!(database = %self.name, table = %name, "table attached");
        Ok(())
    }

    /// Detach a table and return it.
    ///
    /// The table is not shut down; other holders of the handle keep it alive.
    pub fn detach_table(&self, name: &str) -> Result<StoragePtr> {
        let table = {
            let mut state = self.state.lock();
            if state.dictionaries.contains(name) {
                return Err(Error::Misuse {
                    name: self.qualified_name(name),
                });
            }
            state.tables.remove(name).ok_or_else(|| Error::NotFound {
                kind: ObjectKind::Table,
                name: self.qualified_name(name),
            })?
        };

        self.metrics.record_table_detached();
        debug!(database = %self.name, table = %name, "table detached");
        Ok(table)
    }

    // ========== Dictionaries ==========

    /// Attach a dictionary name.
    ///
    /// With `load_now` the loader is asked to reload the dictionary once the
    /// name is attached. Lazy loading only schedules that reload; otherwise
    /// this call waits for it and returns its failure. The name stays
    /// attached even when the load fails.
    pub fn attach_dictionary(&self, name: &str, load_now: bool) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.tables.contains_key(name) {
                return Err(self.already_exists(ObjectKind::Table, name));
            }
            if !state.dictionaries.insert(name.to_string()) {
                return Err(self.already_exists(ObjectKind::Dictionary, name));
            }
        }

        self.metrics.record_dictionary_attached();
        debug!(database = %self.name, dictionary = %name, load_now, "dictionary attached");

        if load_now {
            let wait_until_loaded = !self.config.dictionaries_lazy_load;
            self.loader
                .reload(&self.qualified_name(name), wait_until_loaded)?;
        }
        Ok(())
    }

    /// Detach a dictionary name and have the loader drop it.
    pub fn detach_dictionary(&self, name: &str) -> Result<()> {
        {
            let mut state = self.state.lock();
            if !state.dictionaries.remove(name) {
                return Err(Error::NotFound {
                    kind: ObjectKind::Dictionary,
                    name: self.qualified_name(name),
                });
            }
        }

        self.metrics.record_dictionary_detached();
        debug!(database = %self.name, dictionary = %name, "dictionary detached");

        self.loader.reload(&self.qualified_name(name), true)
    }

    // ========== Enumeration ==========

    /// Snapshot of all tables. Dictionaries are not included.
    pub fn tables(&self) -> TablesSnapshot {
        TablesSnapshot::new(self.state.lock().tables.clone())
    }

    /// Snapshot of the tables whose names pass `filter`.
    pub fn tables_filtered(&self, filter: impl Fn(&str) -> bool) -> TablesSnapshot {
        let state = self.state.lock();
        TablesSnapshot::new(filter_tables(&state.tables, &filter))
    }

    /// Snapshot of all dictionary names.
    pub fn dictionaries(&self) -> DictionariesSnapshot {
        DictionariesSnapshot::new(self.state.lock().dictionaries.clone())
    }

    /// Snapshot of the dictionary names that pass `filter`.
    pub fn dictionaries_filtered(&self, filter: impl Fn(&str) -> bool) -> DictionariesSnapshot {
        let state = self.state.lock();
        DictionariesSnapshot::new(filter_names(&state.dictionaries, &filter))
    }

    /// Snapshot of all tables plus a view for every loadable dictionary.
    pub fn tables_with_dictionaries(&self) -> TablesSnapshot {
        self.collect_with_dictionaries(None)
    }

    /// Like [`tables_with_dictionaries`](Self::tables_with_dictionaries),
    /// restricted to names passing `filter`.
    ///
    /// The filter runs before any view is built, so rejected dictionaries
    /// are never loaded.
    pub fn tables_with_dictionaries_filtered(
        &self,
        filter: impl Fn(&str) -> bool,
    ) -> TablesSnapshot {
        let filter: NameFilter<'_> = &filter;
        self.collect_with_dictionaries(Some(filter))
    }

    fn collect_with_dictionaries(&self, filter: Option<NameFilter<'_>>) -> TablesSnapshot {
        let (mut tables, dictionaries) = {
            let state = self.state.lock();
            match filter {
                Some(filter) => (
                    filter_tables(&state.tables, filter),
                    filter_names(&state.dictionaries, filter),
                ),
                None => (state.tables.clone(), state.dictionaries.clone()),
            }
        };

        for name in dictionaries {
            if let Some(view) = self.dictionary_view(&name) {
                tables.entry(name).or_insert(view);
            }
        }

        TablesSnapshot::new(tables)
    }

    // ========== Lifecycle ==========

    /// Shut down every table and clear the catalog.
    ///
    /// Tables are shut down without the lock held and may call back into the
    /// database. Tables attached while shutdown is in progress are released
    /// without being shut down. Calling this again only clears empty maps.
    #[instrument(skip(self), fields(database = %self.name))]
    pub fn shutdown(&self) {
        let tables_snapshot: Vec<StoragePtr> = {
            let mut state = self.state.lock();
            state.lifecycle = state.lifecycle.begin_shutdown();
            state.tables.values().cloned().collect()
        };

        for table in &tables_snapshot {
            table.shutdown();
        }

        // Released after unlocking: the last reference to a table may run
        // code that re-enters the database.
        let (tables, dictionaries) = {
            let mut state = self.state.lock();
            state.lifecycle = state.lifecycle.finish_shutdown();
            (
                std::mem::take(&mut state.tables),
                std::mem::take(&mut state.dictionaries),
            )
        };

        self.metrics.record_shutdown();
        info!(
            tables_shut_down = tables_snapshot.len(),
            tables_released = tables.len(),
            dictionaries_released = dictionaries.len(),
            "database shut down"
        );
    }

    fn already_exists(&self, kind: ObjectKind, name: &str) -> Error {
        Error::AlreadyExists {
            kind,
            name: self.qualified_name(name),
        }
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if !self.config.shutdown_on_drop {
            return;
        }
        // A panicking table must not unwind out of the destructor.
        if panic::catch_unwind(AssertUnwindSafe(|| self.shutdown())).is_err() {
            warn!(database = %self.name, "table shutdown panicked while dropping database");
        }
    }
}

fn filter_tables(
    tables: &BTreeMap<String, StoragePtr>,
    filter: &dyn Fn(&str) -> bool,
) -> BTreeMap<String, StoragePtr> {
    tables
        .iter()
        .filter(|(name, _)| filter(name))
        .map(|(name, table)| (name.clone(), Arc::clone(table)))
        .collect()
}

fn filter_names(names: &BTreeSet<String>, filter: &dyn Fn(&str) -> bool) -> BTreeSet<String> {
    names.iter().filter(|name| filter(name)).cloned().collect()
}
