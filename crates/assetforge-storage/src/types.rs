//! Storage-layer record types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use assetforge_core::ContentHash;

/// What the index remembers about one program text.
///
/// `files` is the exact set read while the program last executed;
/// `fileset_hash` digests their contents at that moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncrementalRecord {
    pub fileset_hash: ContentHash,
    pub files: Vec<PathBuf>,
    pub schema_version: u32,
}
