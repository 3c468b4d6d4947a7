//! Point-in-time copies of a database's tables and dictionaries.
//!
//! Snapshots own their data. Traversing one takes no lock and never observes
//! attaches or detaches made after it was taken.

use std::collections::{btree_map, btree_set, BTreeMap, BTreeSet};

use crate::storage::StoragePtr;

/// Frozen name to table mapping, iterated in name order.
pub struct TablesSnapshot {
    tables: btree_map::IntoIter<String, StoragePtr>,
}

impl TablesSnapshot {
    pub(crate) fn new(tables: BTreeMap<String, StoragePtr>) -> Self {
        Self {
            tables: tables.into_iter(),
        }
    }

    /// Check if no entries remain.
    pub fn is_empty(&self) -> bool {
        self.tables.len() == 0
    }
}

impl Iterator for TablesSnapshot {
    type Item = (String, StoragePtr);

    fn next(&mut self) -> Option<Self::Item> {
        self.tables.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.tables.size_hint()
    }
}

impl ExactSizeIterator for TablesSnapshot {}

/// Frozen set of dictionary names, iterated in name order.
pub struct DictionariesSnapshot {
    names: btree_set::IntoIter<String>,
}

impl DictionariesSnapshot {
    pub(crate) fn new(names: BTreeSet<String>) -> Self {
        Self {
            names: names.into_iter(),
        }
    }

    /// Check if no names remain.
    pub fn is_empty(&self) -> bool {
        self.names.len() == 0
    }
}

impl Iterator for DictionariesSnapshot {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        self.names.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.names.size_hint()
    }
}

impl ExactSizeIterator for DictionariesSnapshot {}
