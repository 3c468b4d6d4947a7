//! Read-only table views over external dictionaries.
//!
//! A view is rebuilt from the dictionary's current structure on every call
//! and never cached, so structure changes in the loader are always visible.

use std::sync::Arc;

use tracing::trace;

use crate::dictionary::{qualified_name, DictionaryLoader, DictionaryStructure};
use crate::storage::{Storage, StoragePtr};
use crate::types::{ColumnDef, DataType};

/// Engine name reported by dictionary-backed views.
pub const DICTIONARY_ENGINE: &str = "Dictionary";

/// A dictionary exposed as a read-only table.
#[derive(Debug, Clone)]
pub struct DictionaryTable {
    database: String,
    table_name: String,
    dictionary_name: String,
    columns: Vec<ColumnDef>,
}

impl DictionaryTable {
    /// Create a view named `table_name` in `database` over `dictionary_name`.
    pub fn new(
        database: impl Into<String>,
        table_name: impl Into<String>,
        dictionary_name: impl Into<String>,
        columns: Vec<ColumnDef>,
    ) -> Self {
        Self {
            database: database.into(),
            table_name: table_name.into(),
            dictionary_name: dictionary_name.into(),
            columns,
        }
    }

    /// Qualified name of the backing dictionary.
    pub fn dictionary_name(&self) -> &str {
        &self.dictionary_name
    }

    /// Derive the column list of a dictionary.
    ///
    /// Order: simple id (always `UInt64`), range bounds, complex key
    /// attributes, then value attributes.
    pub fn names_and_types(structure: &DictionaryStructure) -> Vec<ColumnDef> {
        let mut columns = Vec::new();

        if let Some(id) = &structure.id {
            columns.push(ColumnDef::new(id.name.clone(), DataType::UInt64));
        }
        for bound in [&structure.range_min, &structure.range_max].into_iter().flatten() {
            columns.push(ColumnDef::new(bound.name.clone(), bound.data_type));
        }
        if let Some(key) = &structure.key {
            columns.extend(key.iter().map(|a| ColumnDef::new(a.name.clone(), a.data_type)));
        }
        columns.extend(
            structure
                .attributes
                .iter()
                .map(|a| ColumnDef::new(a.name.clone(), a.data_type)),
        );

        columns
    }
}

impl Storage for DictionaryTable {
    fn engine_name(&self) -> &str {
        DICTIONARY_ENGINE
    }

    fn database_name(&self) -> &str {
        &self.database
    }

    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    fn is_read_only(&self) -> bool {
        true
    }

    fn as_dictionary_table(&self) -> Option<&DictionaryTable> {
        Some(self)
    }
}

/// Build a fresh view of dictionary `name` in `database`.
///
/// Returns `None` when the loader has no live dictionary under the qualified
/// name. That is absence, not an error.
pub fn build_view(loader: &dyn DictionaryLoader, database: &str, name: &str) -> Option<StoragePtr> {
    let dictionary_name = qualified_name(database, name);
    let Some(dictionary) = loader.try_get_dictionary(&dictionary_name) else {
        trace!(dictionary = %dictionary_name, "dictionary not loaded, no view built");
        return None;
    };

    let columns = DictionaryTable::names_and_types(dictionary.structure());
    Some(Arc::new(DictionaryTable::new(
        database,
        name,
        dictionary_name,
        columns,
    )))
}
