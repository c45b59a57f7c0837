//! In-memory implementation of [`IndexStore`].
//!
//! [`InMemoryIndexStore`] backs tests and sessions that run incremental
//! checks without persisting anything. Clones share the same records, so a
//! test can hand one clone to an index and inspect or reuse the other.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::StorageError;
use crate::traits::IndexStore;
use crate::types::IncrementalRecord;

#[derive(Debug, Clone, Default)]
pub struct InMemoryIndexStore {
    records: Arc<Mutex<BTreeMap<String, IncrementalRecord>>>,
}

impl InMemoryIndexStore {
    pub fn new() -> Self {
        InMemoryIndexStore::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn get(&self, program_hash: &str) -> Option<IncrementalRecord> {
        self.lock().get(program_hash).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, IncrementalRecord>> {
        // Writers never panic mid-update, so a poisoned map is still consistent.
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl IndexStore for InMemoryIndexStore {
    fn load_all(&self) -> Result<Vec<(String, IncrementalRecord)>, StorageError> {
        Ok(self
            .lock()
            .iter()
            .map(|(hash, record)| (hash.clone(), record.clone()))
            .collect())
    }

    fn write_all(&mut self, records: &[(&str, &IncrementalRecord)]) -> Result<(), StorageError> {
        let mut stored = self.lock();
        for (hash, record) in records {
            stored.insert((*hash).to_string(), (*record).clone());
        }
        Ok(())
    }
}
