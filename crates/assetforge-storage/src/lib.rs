//! Persistent incremental build index for assetforge.
//!
//! The [`IncrementalIndex`] answers one question per request: did anything
//! this program read change since it last ran? Records live behind the
//! [`IndexStore`] trait, with [`SqliteIndexStore`] for persistence and
//! [`InMemoryIndexStore`] for tests and throwaway sessions.
//!
//! # Modules
//!
//! - [`index`]: IncrementalIndex (load once, buffer, flush on close)
//! - [`types`]: IncrementalRecord
//! - [`traits`]: IndexStore trait definition
//! - [`memory`]: InMemoryIndexStore implementation
//! - [`schema`]: migration setup for the SQLite backend
//! - [`sqlite`]: SqliteIndexStore implementation
//! - [`error`]: StorageError enum with all failure modes

pub mod error;
pub mod index;
pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod traits;
pub mod types;

// Re-export key types for ergonomic use.
pub use error::StorageError;
pub use assetforge_core::fileset_hash;
pub use index::{IncrementalIndex, CURRENT_SCHEMA_VERSION};
pub use memory::InMemoryIndexStore;
pub use sqlite::SqliteIndexStore;
pub use traits::IndexStore;
pub use types::IncrementalRecord;
