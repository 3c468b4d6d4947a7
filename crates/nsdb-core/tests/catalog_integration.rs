//! Integration tests for the database catalog.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, OnceLock, Weak};
use std::thread;

use parking_lot::Mutex;

use nsdb_core::{
    CatalogConfig, ColumnDef, DataType, Database, DictionaryAttribute, DictionaryLoader,
    DictionaryPtr, DictionaryStructure, ErrorKind, LoadedDictionary, Lifecycle, Storage,
    StoragePtr, DICTIONARY_ENGINE,
};

/// Loader stub that records every call.
#[derive(Default)]
struct CountingLoader {
    loaded: Mutex<HashMap<String, DictionaryPtr>>,
    lookups: AtomicUsize,
    reloads: Mutex<Vec<(String, bool)>>,
}

impl CountingLoader {
    fn load(&self, name: &str, structure: DictionaryStructure) {
        let dictionary: DictionaryPtr = Arc::new(LoadedDictionary::new(name, structure));
        self.loaded.lock().insert(name.to_string(), dictionary);
    }

    fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn reloads(&self) -> Vec<(String, bool)> {
        self.reloads.lock().clone()
    }
}

impl DictionaryLoader for CountingLoader {
    fn try_get_dictionary(&self, name: &str) -> Option<DictionaryPtr> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.loaded.lock().get(name).cloned()
    }

    fn reload(&self, name: &str, wait_until_loaded: bool) -> nsdb_core::Result<()> {
        self.reloads
            .lock()
            .push((name.to_string(), wait_until_loaded));
        Ok(())
    }
}

/// Table stub counting shutdowns. Optionally calls back into its database
/// while shutting down.
struct CountingTable {
    name: String,
    columns: Vec<ColumnDef>,
    shutdowns: AtomicUsize,
    database: OnceLock<Weak<Database>>,
    seen_during_shutdown: Mutex<Option<bool>>,
    lifecycle_during_shutdown: Mutex<Option<Lifecycle>>,
}

impl CountingTable {
    fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            columns: vec![
                ColumnDef::new("id", DataType::UInt64),
                ColumnDef::new("value", DataType::String),
            ],
            shutdowns: AtomicUsize::new(0),
            database: OnceLock::new(),
            seen_during_shutdown: Mutex::new(None),
            lifecycle_during_shutdown: Mutex::new(None),
        })
    }

    fn reentrant(name: &str, database: &Arc<Database>) -> Arc<Self> {
        let table = Self::new(name);
        let _ = table.database.set(Arc::downgrade(database));
        table
    }

    fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

impl Storage for CountingTable {
    fn engine_name(&self) -> &str {
        "Memory"
    }

    fn database_name(&self) -> &str {
        "db"
    }

    fn table_name(&self) -> &str {
        &self.name
    }

    fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        if let Some(database) = self.database.get().and_then(Weak::upgrade) {
            let seen = database.is_table_exist(&self.name);
            *self.seen_during_shutdown.lock() = Some(seen);
            *self.lifecycle_during_shutdown.lock() = Some(database.lifecycle());
        }
    }
}

struct TestContext {
    database: Arc<Database>,
    loader: Arc<CountingLoader>,
}

impl TestContext {
    fn new() -> Self {
        Self::with_config(CatalogConfig::default())
    }

    fn with_config(config: CatalogConfig) -> Self {
        let loader = Arc::new(CountingLoader::default());
        let database = Arc::new(Database::with_config("db", loader.clone(), config));
        Self { database, loader }
    }
}

fn currency_rates() -> DictionaryStructure {
    DictionaryStructure::complex(vec![DictionaryAttribute::new("currency", DataType::String)])
        .with_attribute(DictionaryAttribute::new("rate", DataType::Float64))
}

fn names(snapshot: nsdb_core::TablesSnapshot) -> Vec<String> {
    snapshot.map(|(name, _)| name).collect()
}

// ============== Tests ==============

#[test]
fn test_table_and_dictionary_scenario() {
    let ctx = TestContext::new();
    let db = &ctx.database;

    db.attach_table("t1", CountingTable::new("t1")).unwrap();
    db.attach_dictionary("d1", false).unwrap();

    assert!(db.is_table_exist("t1"));
    assert!(db.is_table_exist("d1"));
    assert!(db.is_dictionary_exist("d1"));

    // Not loaded yet.
    assert!(db.try_get_table("d1").is_none());

    ctx.loader.load("db.d1", currency_rates());
    let view = db.try_get_table("d1").unwrap();
    assert!(view.is_read_only());
    assert_eq!(view.engine_name(), DICTIONARY_ENGINE);
    let columns: Vec<(&str, DataType)> = view
        .columns()
        .iter()
        .map(|c| (c.name.as_str(), c.data_type))
        .collect();
    assert_eq!(
        columns,
        vec![("currency", DataType::String), ("rate", DataType::Float64)]
    );

    let err = db.detach_table("d1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Misuse);
    assert!(db.is_dictionary_exist("d1"));

    db.detach_dictionary("d1").unwrap();
    assert!(!db.is_dictionary_exist("d1"));
    assert!(!db.is_table_exist("d1"));
}

#[test]
fn test_lazy_attach_schedules_reload() {
    let ctx = TestContext::new();
    ctx.database.attach_dictionary("d1", true).unwrap();
    ctx.database.detach_dictionary("d1").unwrap();

    assert_eq!(
        ctx.loader.reloads(),
        vec![("db.d1".to_string(), false), ("db.d1".to_string(), true)]
    );
}

#[test]
fn test_eager_attach_waits_for_reload() {
    let ctx = TestContext::with_config(CatalogConfig::new().with_dictionaries_lazy_load(false));
    ctx.database.attach_dictionary("d1", true).unwrap();

    assert_eq!(ctx.loader.reloads(), vec![("db.d1".to_string(), true)]);
}

#[test]
fn test_failed_attach_does_not_reload() {
    let ctx = TestContext::new();
    ctx.database.attach_dictionary("d1", false).unwrap();

    let err = ctx.database.attach_dictionary("d1", true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert!(ctx.loader.reloads().is_empty());

    let err = ctx.database.detach_dictionary("missing").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(ctx.loader.reloads().is_empty());
}

#[test]
fn test_filter_matching_nothing_builds_no_views() {
    let ctx = TestContext::new();
    for name in ["d1", "d2", "d3"] {
        ctx.loader.load(&format!("db.{name}"), currency_rates());
        ctx.database.attach_dictionary(name, false).unwrap();
    }
    ctx.database
        .attach_table("t1", CountingTable::new("t1"))
        .unwrap();

    let snapshot = ctx.database.tables_with_dictionaries_filtered(|_| false);
    assert_eq!(snapshot.len(), 0);
    assert_eq!(ctx.loader.lookups(), 0);
    assert_eq!(ctx.database.metrics().views_built, 0);
}

#[test]
fn test_filter_limits_view_construction() {
    let ctx = TestContext::new();
    for name in ["d1", "d2", "d3"] {
        ctx.loader.load(&format!("db.{name}"), currency_rates());
        ctx.database.attach_dictionary(name, false).unwrap();
    }

    let snapshot = ctx.database.tables_with_dictionaries_filtered(|name| name == "d2");
    assert_eq!(names(snapshot), vec!["d2"]);
    assert_eq!(ctx.loader.lookups(), 1);

    let all = ctx.database.tables_with_dictionaries();
    assert_eq!(all.len(), 3);
    assert_eq!(ctx.loader.lookups(), 4);
}

#[test]
fn test_shutdown_calls_each_table_once() {
    let ctx = TestContext::new();
    let tables: Vec<_> = (0..5)
        .map(|i| CountingTable::new(&format!("t{i}")))
        .collect();
    for table in &tables {
        ctx.database
            .attach_table(&table.name, table.clone())
            .unwrap();
    }
    ctx.database.attach_dictionary("d1", false).unwrap();

    ctx.database.shutdown();

    assert!(ctx.database.is_empty());
    assert_eq!(ctx.database.lifecycle(), Lifecycle::Closed);
    for table in &tables {
        assert_eq!(table.shutdown_count(), 1);
    }
}

#[test]
fn test_shutdown_allows_reentrant_tables() {
    let ctx = TestContext::new();
    let table = CountingTable::reentrant("t1", &ctx.database);
    ctx.database.attach_table("t1", table.clone()).unwrap();

    // Would deadlock if the catalog lock were held during table shutdown.
    ctx.database.shutdown();

    assert_eq!(table.shutdown_count(), 1);
    assert_eq!(*table.seen_during_shutdown.lock(), Some(true));
    assert_eq!(
        *table.lifecycle_during_shutdown.lock(),
        Some(Lifecycle::ShuttingDown)
    );
    assert!(!ctx.database.is_table_exist("t1"));
    assert_eq!(ctx.database.lifecycle(), Lifecycle::Closed);
}

#[test]
fn test_handle_survives_detach_and_shutdown() {
    let ctx = TestContext::new();
    ctx.database
        .attach_table("t1", CountingTable::new("t1"))
        .unwrap();

    let held: StoragePtr = ctx.database.try_get_table("t1").unwrap();
    ctx.database.shutdown();

    assert_eq!(held.table_name(), "t1");
    assert_eq!(held.columns().len(), 2);
}

#[test]
fn test_concurrent_attach_same_name() {
    let ctx = TestContext::new();
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let database = ctx.database.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                database.attach_table("shared", CountingTable::new("shared"))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    for err in results.into_iter().filter_map(|r| r.err()) {
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }
    assert_eq!(ctx.database.table_count(), 1);
}

#[test]
fn test_concurrent_attach_detach_and_enumerate() {
    let ctx = TestContext::new();
    let writers = 4;
    let per_writer = 50;

    let mut handles = Vec::new();
    for w in 0..writers {
        let database = ctx.database.clone();
        handles.push(thread::spawn(move || {
            for i in 0..per_writer {
                let name = format!("w{w}_t{i}");
                database
                    .attach_table(&name, CountingTable::new(&name))
                    .unwrap();
                assert!(database.is_table_exist(&name));
                if i % 2 == 0 {
                    database.detach_table(&name).unwrap();
                    assert!(!database.is_table_exist(&name));
                }
            }
        }));
    }
    for _ in 0..2 {
        let database = ctx.database.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..100 {
                let snapshot = database.tables_with_dictionaries();
                assert!(snapshot.len() <= writers * per_writer);
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(ctx.database.table_count(), writers * per_writer / 2);
    let metrics = ctx.database.metrics();
    assert_eq!(metrics.tables_attached, (writers * per_writer) as u64);
    assert_eq!(metrics.tables_detached, (writers * per_writer / 2) as u64);
}

#[test]
fn test_snapshot_ignores_later_attach_from_other_thread() {
    let ctx = TestContext::new();
    ctx.database
        .attach_table("before", CountingTable::new("before"))
        .unwrap();

    let snapshot = ctx.database.tables();

    let database = ctx.database.clone();
    thread::spawn(move || {
        database
            .attach_table("after", CountingTable::new("after"))
            .unwrap();
    })
    .join()
    .unwrap();

    assert!(ctx.database.is_table_exist("after"));
    assert_eq!(names(snapshot), vec!["before"]);
}
