//! NSDB Core - In-memory catalog of a database namespace.
//!
//! A [`Database`] maps table names to shared [`Storage`] handles and keeps
//! the names of the external dictionaries attached to it. Dictionaries are
//! owned by a [`DictionaryLoader`] and show up as read-only tables when
//! addressed by name.

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod config;
pub mod database;
pub mod dictionary;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod snapshot;
pub mod storage;
pub mod types;
pub mod view;

pub use config::CatalogConfig;
pub use database::{Database, NameFilter};
pub use dictionary::{
    qualified_name, Dictionary, DictionaryAttribute, DictionaryLoader, DictionaryPtr,
    DictionaryStructure, LoadedDictionary, MemoryDictionaryLoader,
};
pub use error::{Error, ErrorKind, ObjectKind, Result};
pub use lifecycle::Lifecycle;
pub use metrics::{CatalogMetrics, MetricsSnapshot};
pub use snapshot::{DictionariesSnapshot, TablesSnapshot};
pub use storage::{Storage, StoragePtr};
pub use types::{ColumnDef, DataType};
pub use view::{build_view, DictionaryTable, DICTIONARY_ENGINE};
