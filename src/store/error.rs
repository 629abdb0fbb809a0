use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Which kind of record an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Note,
    Template,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Note => f.write_str("note"),
            RecordKind::Template => f.write_str("template"),
        }
    }
}

/// Errors raised by the note and template stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record has no backing file (already deleted, or never existed).
    #[error("{kind} '{id}' not found")]
    NotFound { kind: RecordKind, id: String },

    /// A record file exists but could not be parsed.
    #[error("unreadable record {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Two files hold the same id. The file at `path` was skipped.
    #[error("{path} repeats {kind} id '{id}'")]
    DuplicateId { kind: RecordKind, id: String, path: PathBuf },

    /// A create or update was rejected before touching disk.
    #[error("{0}")]
    Validation(String),

    /// Built-in templates are fixed.
    #[error("template '{0}' is built in and cannot be removed or renamed")]
    BuiltinTemplate(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io { path: path.into(), source }
    }

    pub fn not_found(kind: RecordKind, id: impl Into<String>) -> Self {
        StoreError::NotFound { kind, id: id.into() }
    }

    /// True for errors the UI should treat as "already gone".
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
