//! The [`IndexStore`] trait: the persistence contract behind the
//! incremental index.
//!
//! The index loads every record once when it opens and writes back only the
//! records it changed, in one batch, when it closes. Backends therefore only
//! need bulk operations. Both backends (InMemoryIndexStore,
//! SqliteIndexStore) implement this trait and are swappable without touching
//! the index logic.

use crate::error::StorageError;
use crate::types::IncrementalRecord;

/// Bulk load/store of incremental records keyed by program hash (hex).
pub trait IndexStore {
    /// Returns every stored record. Unreadable records are skipped.
    fn load_all(&self) -> Result<Vec<(String, IncrementalRecord)>, StorageError>;

    /// Inserts or replaces the given records atomically.
    fn write_all(&mut self, records: &[(&str, &IncrementalRecord)]) -> Result<(), StorageError>;
}
