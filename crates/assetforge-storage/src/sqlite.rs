//! SQLite implementation of [`IndexStore`].
//!
//! [`SqliteIndexStore`] persists incremental records in a single table with
//! WAL mode and automatic schema migrations. Records are stored as JSON TEXT
//! via serde_json; every batch write runs in one transaction.

use std::path::Path;

use rusqlite::{params, Connection};
use tracing::warn;

use crate::error::StorageError;
use crate::traits::IndexStore;
use crate::types::IncrementalRecord;

pub struct SqliteIndexStore {
    conn: Connection,
}

impl SqliteIndexStore {
    /// Opens (or creates) the index at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = crate::schema::open_database(path)?;
        Ok(SqliteIndexStore { conn })
    }

    /// Opens an in-memory SQLite index (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = crate::schema::open_in_memory()?;
        Ok(SqliteIndexStore { conn })
    }
}

impl IndexStore for SqliteIndexStore {
    fn load_all(&self) -> Result<Vec<(String, IncrementalRecord)>, StorageError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT program_hash, record_json FROM incremental_records ORDER BY program_hash",
        )?;
        let rows = stmt.query_map([], |row| {
            let program_hash: String = row.get(0)?;
            let record_json: String = row.get(1)?;
            Ok((program_hash, record_json))
        })?;

        let mut result = Vec::new();
        for row in rows {
            let (program_hash, record_json) = row?;
            match serde_json::from_str::<IncrementalRecord>(&record_json) {
                Ok(record) => result.push((program_hash, record)),
                Err(err) => {
                    // An unreadable record only costs one rebuild of that program.
                    warn!(%program_hash, error = %err, "skipping unreadable incremental record");
                }
            }
        }
        Ok(result)
    }

    fn write_all(&mut self, records: &[(&str, &IncrementalRecord)]) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO incremental_records (program_hash, record_json) VALUES (?1, ?2)
                 ON CONFLICT(program_hash) DO UPDATE SET record_json = excluded.record_json",
            )?;
            for (program_hash, record) in records {
                let record_json = serde_json::to_string(record)?;
                stmt.execute(params![program_hash, record_json])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetforge_core::hash_bytes;

    fn record(tag: &[u8], files: &[&str]) -> IncrementalRecord {
        IncrementalRecord {
            fileset_hash: hash_bytes(tag),
            files: files.iter().map(Into::into).collect(),
            schema_version: 1,
        }
    }

    #[test]
    fn write_and_load_roundtrip() {
        let mut store = SqliteIndexStore::in_memory().unwrap();
        let a = record(b"a", &["x.txt", "y.bin"]);
        store.write_all(&[("p1", &a)]).unwrap();
        assert_eq!(store.load_all().unwrap(), vec![("p1".to_string(), a)]);
    }

    #[test]
    fn write_upserts() {
        let mut store = SqliteIndexStore::in_memory().unwrap();
        store.write_all(&[("p1", &record(b"old", &[]))]).unwrap();
        store.write_all(&[("p1", &record(b"new", &["n.txt"]))]).unwrap();
        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].1, record(b"new", &["n.txt"]));
    }

    #[test]
    fn unreadable_rows_are_skipped() {
        let mut store = SqliteIndexStore::in_memory().unwrap();
        store.write_all(&[("good", &record(b"g", &[]))]).unwrap();
        store
            .conn
            .execute(
                "INSERT INTO incremental_records (program_hash, record_json) VALUES ('bad', '{not json')",
                [],
            )
            .unwrap();
        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].0, "good");
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/index.db");
        let mut store = SqliteIndexStore::open(&path).unwrap();
        store.write_all(&[("p", &record(b"p", &[]))]).unwrap();
        drop(store);

        assert!(path.exists());
        let reopened = SqliteIndexStore::open(&path).unwrap();
        assert_eq!(reopened.load_all().unwrap().len(), 1);
    }
}
