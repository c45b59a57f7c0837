//! Storage error types for assetforge-storage.
//!
//! [`StorageError`] covers every failure mode of the incremental index:
//! SQLite and migration failures, record (de)serialization, and I/O while
//! hashing the recorded files.

use thiserror::Error;

/// Errors produced by index storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The SQLite backend reported an error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Applying schema migrations failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// JSON serialization or deserialization of a record failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading a recorded file (or creating the index directory) failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored record violates an index invariant.
    #[error("invalid record for program {program_hash}: {reason}")]
    InvalidRecord { program_hash: String, reason: String },
}
