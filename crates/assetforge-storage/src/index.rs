//! The incremental build index.
//!
//! Maps a program's text hash to the set of files its last execution read
//! and a digest of their contents. A program is *unchanged* when a record
//! exists, was written under the current schema version, and the recorded
//! files still hash to the stored digest.
//!
//! Records are loaded once when the index opens and buffered in memory for
//! the session. [`IncrementalIndex::close`] writes every record touched
//! during the session in one transaction; dropping the index without
//! closing it discards those updates.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use tracing::{debug, info, warn};

use assetforge_core::{fileset_hash, hash_bytes, FileLog, Workspace};

use crate::error::StorageError;
use crate::memory::InMemoryIndexStore;
use crate::sqlite::SqliteIndexStore;
use crate::traits::IndexStore;
use crate::types::IncrementalRecord;

/// Version stamped on every record. Bumping it invalidates all records.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

pub struct IncrementalIndex {
    store: Box<dyn IndexStore>,
    records: HashMap<String, IncrementalRecord>,
    dirty: BTreeSet<String>,
    workspace: Workspace,
    schema_version: u32,
}

impl IncrementalIndex {
    /// Opens the SQLite-backed index at `path`.
    pub fn open(path: impl AsRef<Path>, workspace: Workspace) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let store = SqliteIndexStore::open(path)?;
        let index = Self::with_store(Box::new(store), workspace, CURRENT_SCHEMA_VERSION)?;
        info!(path = %path.display(), records = index.len(), "opened incremental index");
        Ok(index)
    }

    /// A fresh index that persists nothing.
    pub fn in_memory(workspace: Workspace) -> Self {
        IncrementalIndex {
            store: Box::new(InMemoryIndexStore::new()),
            records: HashMap::new(),
            dirty: BTreeSet::new(),
            workspace,
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    /// Opens an index over an arbitrary store, stamping new records with
    /// `schema_version`.
    pub fn with_store(
        store: Box<dyn IndexStore>,
        workspace: Workspace,
        schema_version: u32,
    ) -> Result<Self, StorageError> {
        let records = store.load_all()?.into_iter().collect();
        Ok(IncrementalIndex {
            store,
            records,
            dirty: BTreeSet::new(),
            workspace,
            schema_version,
        })
    }

    /// Index key for a program: hex digest of its exact text.
    pub fn program_key(program_text: &str) -> String {
        hash_bytes(program_text.as_bytes()).to_hex()
    }

    /// True if `program_text` ran before and none of its files changed since.
    pub fn unchanged(&self, program_text: &str) -> Result<bool, StorageError> {
        let key = Self::program_key(program_text);
        let Some(record) = self.records.get(&key) else {
            return Ok(false);
        };
        if record.schema_version != self.schema_version {
            debug!(
                program = %key,
                stored = record.schema_version,
                current = self.schema_version,
                "incremental record from another schema version"
            );
            return Ok(false);
        }
        let current = fileset_hash(&self.workspace, &record.files)?;
        Ok(current == record.fileset_hash)
    }

    /// Records the files `program_text` just read, digesting their current
    /// contents. Buffered until [`IncrementalIndex::close`].
    pub fn update(&mut self, program_text: &str, files: &FileLog) -> Result<(), StorageError> {
        let key = Self::program_key(program_text);
        let files = files.to_vec();
        let record = IncrementalRecord {
            fileset_hash: fileset_hash(&self.workspace, &files)?,
            files,
            schema_version: self.schema_version,
        };
        debug!(program = %key, files = record.files.len(), "updated incremental record");
        self.records.insert(key.clone(), record);
        self.dirty.insert(key);
        Ok(())
    }

    pub fn get(&self, program_text: &str) -> Option<&IncrementalRecord> {
        self.records.get(&Self::program_key(program_text))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records updated since the last flush.
    pub fn pending(&self) -> usize {
        self.dirty.len()
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Writes buffered records to the store in one batch.
    pub fn flush(&mut self) -> Result<(), StorageError> {
        if self.dirty.is_empty() {
            return Ok(());
        }
        let mut batch = Vec::with_capacity(self.dirty.len());
        for key in &self.dirty {
            let record = self.records.get(key).ok_or_else(|| StorageError::InvalidRecord {
                program_hash: key.clone(),
                reason: "updated record missing from buffer".to_string(),
            })?;
            batch.push((key.as_str(), record));
        }
        self.store.write_all(&batch)?;
        info!(records = batch.len(), "flushed incremental index");
        self.dirty.clear();
        Ok(())
    }

    /// Flushes and releases the index.
    pub fn close(mut self) -> Result<(), StorageError> {
        self.flush()
    }
}

impl Drop for IncrementalIndex {
    fn drop(&mut self) {
        if !self.dirty.is_empty() {
            warn!(
                records = self.dirty.len(),
                "incremental index dropped without close; updates discarded"
            );
        }
    }
}

impl std::fmt::Debug for IncrementalIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncrementalIndex")
            .field("records", &self.records.len())
            .field("pending", &self.dirty.len())
            .field("workspace", &self.workspace)
            .field("schema_version", &self.schema_version)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_program_is_changed() {
        let index = IncrementalIndex::in_memory(Workspace::new("."));
        assert!(!index.unchanged("[]").unwrap());
    }

    #[test]
    fn program_key_is_text_sensitive() {
        assert_ne!(
            IncrementalIndex::program_key("[1]"),
            IncrementalIndex::program_key("[ 1 ]")
        );
        assert_eq!(IncrementalIndex::program_key("x").len(), 64);
    }

    #[test]
    fn update_without_files_is_unchanged() {
        let mut index = IncrementalIndex::in_memory(Workspace::new("."));
        index.update("prog", &FileLog::new()).unwrap();
        assert!(index.unchanged("prog").unwrap());
        assert_eq!(index.pending(), 1);
    }

    #[test]
    fn flush_writes_and_clears_pending() {
        let store = InMemoryIndexStore::new();
        let mut index =
            IncrementalIndex::with_store(Box::new(store.clone()), Workspace::new("."), 1).unwrap();
        index.update("a", &FileLog::new()).unwrap();
        index.update("b", &FileLog::new()).unwrap();
        index.flush().unwrap();
        assert_eq!(index.pending(), 0);
        assert_eq!(store.len(), 2);
    }
}
