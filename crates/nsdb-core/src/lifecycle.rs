//! Database lifecycle states.

use std::fmt;

/// Lifecycle of a database: `Active -> ShuttingDown -> Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    /// Accepting catalog operations.
    #[default]
    Active,
    /// Owned tables are being shut down.
    ShuttingDown,
    /// Shutdown finished. Terminal.
    Closed,
}

impl Lifecycle {
    /// State entered when shutdown begins.
    pub fn begin_shutdown(self) -> Self {
        match self {
            Lifecycle::Active | Lifecycle::ShuttingDown => Lifecycle::ShuttingDown,
            Lifecycle::Closed => Lifecycle::Closed,
        }
    }

    /// State entered when shutdown completes.
    pub fn finish_shutdown(self) -> Self {
        Lifecycle::Closed
    }

    /// Check if shutdown has completed.
    pub fn is_closed(&self) -> bool {
        matches!(self, Lifecycle::Closed)
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Active => f.write_str("active"),
            Lifecycle::ShuttingDown => f.write_str("shutting down"),
            Lifecycle::Closed => f.write_str("closed"),
        }
    }
}
