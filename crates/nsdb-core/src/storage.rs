//! Storage handle abstraction.
//!
//! The catalog never looks inside a table. It only needs a name, a column
//! list and a way to shut the table down, so every table engine sits behind
//! the [`Storage`] trait and is shared through [`StoragePtr`].

use std::fmt;
use std::sync::Arc;

use crate::types::ColumnDef;
use crate::view::DictionaryTable;

/// A table implementation registered in a database.
pub trait Storage: Send + Sync {
    /// Name of the engine backing this table.
    fn engine_name(&self) -> &str;

    /// Name of the database the table belongs to.
    fn database_name(&self) -> &str;

    /// Table name within its database.
    fn table_name(&self) -> &str;

    /// Ordered column list.
    fn columns(&self) -> &[ColumnDef];

    /// Whether writes to this table are rejected.
    fn is_read_only(&self) -> bool {
        false
    }

    /// Release resources held by the table.
    ///
    /// Called once per shutdown of the owning database, without any catalog
    /// lock held, so implementations may call back into the database.
    /// Concurrent `Database::shutdown` calls each snapshot the same tables,
    /// so callers must not race shutdowns if this has to run only once.
    fn shutdown(&self) {}

    /// Downcast to a dictionary-backed view.
    fn as_dictionary_table(&self) -> Option<&DictionaryTable> {
        None
    }
}

impl fmt::Debug for dyn Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("engine", &self.engine_name())
            .field("database", &self.database_name())
            .field("table", &self.table_name())
            .finish()
    }
}

/// Shared handle to a table.
///
/// A handle returned to a caller stays valid after the table is detached;
/// detaching only drops the catalog's reference.
pub type StoragePtr = Arc<dyn Storage>;
