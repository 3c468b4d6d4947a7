//! Catalog activity counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for catalog operations on one database.
#[derive(Debug, Default)]
pub struct CatalogMetrics {
    tables_attached: AtomicU64,
    tables_detached: AtomicU64,
    dictionaries_attached: AtomicU64,
    dictionaries_detached: AtomicU64,
    views_built: AtomicU64,
    views_missing: AtomicU64,
    shutdowns: AtomicU64,
}

/// Point-in-time copy of [`CatalogMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Successful table attaches.
    pub tables_attached: u64,
    /// Successful table detaches.
    pub tables_detached: u64,
    /// Successful dictionary attaches.
    pub dictionaries_attached: u64,
    /// Successful dictionary detaches.
    pub dictionaries_detached: u64,
    /// Dictionary views constructed.
    pub views_built: u64,
    /// Dictionary view requests the loader could not serve.
    pub views_missing: u64,
    /// Completed shutdown runs.
    pub shutdowns: u64,
}

impl CatalogMetrics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_table_attached(&self) {
        self.tables_attached.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_table_detached(&self) {
        self.tables_detached.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dictionary_attached(&self) {
        self.dictionaries_attached.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dictionary_detached(&self) {
        self.dictionaries_detached.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of one view request.
    pub(crate) fn record_view(&self, built: bool) {
        if built {
            self.views_built.fetch_add(1, Ordering::Relaxed);
        } else {
            self.views_missing.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tables_attached: self.tables_attached.load(Ordering::Relaxed),
            tables_detached: self.tables_detached.load(Ordering::Relaxed),
            dictionaries_attached: self.dictionaries_attached.load(Ordering::Relaxed),
            dictionaries_detached: self.dictionaries_detached.load(Ordering::Relaxed),
            views_built: self.views_built.load(Ordering::Relaxed),
            views_missing: self.views_missing.load(Ordering::Relaxed),
            shutdowns: self.shutdowns.load(Ordering::Relaxed),
        }
    }
}
