// src/errors.rs
//! Error taxonomy for the snapshot DAG and the tiered recall resolver.
//!
//! Mutating operations fail strictly with no partial effect; read paths
//! (trace, recall) prefer degrading to partial results over raising, so
//! `NotFound` and `CorruptRecord` are expected outcomes against stale or
//! hand-edited stores, not alarms.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MemoryError>;

#[derive(Debug, Error)]
pub enum MemoryError {
    /// Node, branch, or hash absent. Recoverable; normal in operation.
    #[error("not found: {0}")]
    NotFound(String),

    /// Branch name collision on diverge. Caller picks a fresh name.
    #[error("branch already exists: {0}")]
    DuplicateBranch(String),

    /// Consolidate attempted without ancestry; destination left untouched.
    #[error("not fast-forwardable: '{dst}' is not an ancestor of '{src}'")]
    NotFastForwardable { src: String, dst: String },

    /// Durable write failed; the operation has no effect.
    #[error("store write failed at {path}: {source}")]
    StoreWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed persisted record. Traversal stops and keeps its prefix.
    #[error("corrupt record: {0}")]
    CorruptRecord(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Cache(#[from] rusqlite::Error),
}

impl MemoryError {
    /// True for absences that read paths treat as ordinary misses.
    pub fn is_not_found(&self) -> bool {
        matches!(self, MemoryError::NotFound(_))
    }
}
