//! Catalog error types.

use std::fmt;

use thiserror::Error;

/// Kind of catalog object an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// A table owned by the database.
    Table,
    /// A dictionary attached to the database.
    Dictionary,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Table => f.write_str("table"),
            ObjectKind::Dictionary => f.write_str("dictionary"),
        }
    }
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The name is already attached.
    AlreadyExists,
    /// The name is not attached.
    NotFound,
    /// The operation was called on the wrong kind of object.
    Misuse,
    /// The dictionary loader reported a failure.
    Loader,
    /// Configuration could not be read.
    Config,
}

/// Catalog errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Attach called with a name that is already present.
    #[error("{kind} {name} already exists")]
    AlreadyExists {
        /// Object kind the name is already attached as.
        kind: ObjectKind,
        /// Qualified object name.
        name: String,
    },

    /// Detach called with a name that is not present.
    #[error("{kind} {name} doesn't exist")]
    NotFound {
        /// Object kind that was looked up.
        kind: ObjectKind,
        /// Qualified object name.
        name: String,
    },

    /// A dictionary was detached through the table path.
    #[error("cannot detach dictionary {name} as table, use DETACH DICTIONARY")]
    Misuse {
        /// Qualified dictionary name.
        name: String,
    },

    /// A synchronous dictionary reload failed.
    #[error("failed to reload dictionary {name}: {message}")]
    Loader {
        /// Qualified dictionary name.
        name: String,
        /// Loader-provided reason.
        message: String,
    },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error while reading configuration.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Misuse { .. } => ErrorKind::Misuse,
            Error::Loader { .. } => ErrorKind::Loader,
            Error::Config(_) | Error::Io(_) => ErrorKind::Config,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e.to_string())
    }
}

/// Result alias for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;
