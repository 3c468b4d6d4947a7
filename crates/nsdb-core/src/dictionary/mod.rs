//! External dictionaries.
//!
//! Dictionary data is owned by a [`DictionaryLoader`]. A database only keeps
//! the names of the dictionaries attached to it and addresses them in the
//! loader by qualified name (`database.dictionary`).

mod memory;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::DataType;

pub use memory::{LoadedDictionary, MemoryDictionaryLoader};

/// Build the qualified name a loader uses for `object` in `database`.
pub fn qualified_name(database: &str, object: &str) -> String {
    format!("{}.{}", database, object)
}

/// A single dictionary attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryAttribute {
    /// Attribute name.
    pub name: String,
    /// Attribute data type.
    pub data_type: DataType,
}

impl DictionaryAttribute {
    /// Create a new attribute.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Structural schema of a dictionary.
///
/// A dictionary is keyed either by a simple numeric `id` or by a complex
/// `key` made of several attributes. Range dictionaries additionally carry
/// `range_min` and `range_max` bounds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DictionaryStructure {
    /// Simple numeric key.
    pub id: Option<DictionaryAttribute>,
    /// Complex key attributes.
    pub key: Option<Vec<DictionaryAttribute>>,
    /// Lower range bound.
    pub range_min: Option<DictionaryAttribute>,
    /// Upper range bound.
    pub range_max: Option<DictionaryAttribute>,
    /// Value attributes.
    pub attributes: Vec<DictionaryAttribute>,
}

impl DictionaryStructure {
    /// Structure keyed by a simple numeric id.
    pub fn simple(id_name: impl Into<String>) -> Self {
        Self {
            id: Some(DictionaryAttribute::new(id_name, DataType::UInt64)),
            ..Default::default()
        }
    }

    /// Structure keyed by several attributes.
    pub fn complex(key: Vec<DictionaryAttribute>) -> Self {
        Self {
            key: Some(key),
            ..Default::default()
        }
    }

    /// Add range bounds.
    pub fn with_range(mut self, min: DictionaryAttribute, max: DictionaryAttribute) -> Self {
        self.range_min = Some(min);
        self.range_max = Some(max);
        self
    }

    /// Add a value attribute.
    pub fn with_attribute(mut self, attribute: DictionaryAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }
}

/// A loaded dictionary.
pub trait Dictionary: Send + Sync {
    /// Qualified name of the dictionary.
    fn full_name(&self) -> &str;

    /// Current structural schema.
    fn structure(&self) -> &DictionaryStructure;
}

/// Shared handle to a loaded dictionary.
pub type DictionaryPtr = Arc<dyn Dictionary>;

/// Service owning dictionary definitions and their loaded data.
pub trait DictionaryLoader: Send + Sync {
    /// Look up a loaded dictionary by qualified name.
    ///
    /// Returns `None` if the dictionary is unknown, not loaded yet, or failed to load.
    fn try_get_dictionary(&self, name: &str) -> Option<DictionaryPtr>;

    /// Reload (or unload, if its definition is gone) the named dictionary.
    ///
    /// With `wait_until_loaded` the call returns once the loader is done and
    /// reports its failure; otherwise the work is only scheduled.
    fn reload(&self, name: &str, wait_until_loaded: bool) -> Result<()>;
}
