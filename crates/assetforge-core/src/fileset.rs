//! Content digests over sets of workspace files.
//!
//! Each file contributes its path and either its full contents or an
//! "absent" marker. Creating, deleting or editing a tracked file therefore
//! changes the digest of every set containing it. Order follows the file
//! list.

use std::collections::HashMap;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use crate::hash::{update_framed, ContentHash};
use crate::workspace::Workspace;

const FILE_DOMAIN: &[u8] = b"assetforge:file";
const FILESET_DOMAIN: &[u8] = b"assetforge:fileset";
const ABSENT: u8 = 0;
const PRESENT: u8 = 1;

/// Digest of one file's path and current contents.
///
/// Paths that are not readable regular files (missing, or a directory) hash
/// as absent. Any other I/O failure is returned.
pub fn file_digest(workspace: &Workspace, path: &Path) -> io::Result<ContentHash> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(FILE_DOMAIN);
    update_framed(&mut hasher, path.as_os_str().as_encoded_bytes());
    let resolved = workspace.resolve(path);
    match std::fs::read(&resolved) {
        Ok(contents) => {
            hasher.update(&[PRESENT]);
            update_framed(&mut hasher, &contents);
        }
        Err(err) if err.kind() == ErrorKind::NotFound || resolved.is_dir() => {
            hasher.update(&[ABSENT]);
        }
        Err(err) => return Err(err),
    }
    Ok(hasher.finalize().into())
}

/// Digests the current contents of `files`, resolved against `workspace`.
pub fn fileset_hash(workspace: &Workspace, files: &[PathBuf]) -> io::Result<ContentHash> {
    FileDigests::new(workspace).fileset_hash(files)
}

/// Per-file digests memoized for the duration of one build, so a file shared
/// by many file sets is read once.
#[derive(Debug)]
pub struct FileDigests<'a> {
    workspace: &'a Workspace,
    digests: HashMap<PathBuf, ContentHash>,
}

impl<'a> FileDigests<'a> {
    pub fn new(workspace: &'a Workspace) -> Self {
        FileDigests {
            workspace,
            digests: HashMap::new(),
        }
    }

    pub fn file_digest(&mut self, path: &Path) -> io::Result<ContentHash> {
        if let Some(digest) = self.digests.get(path) {
            return Ok(*digest);
        }
        let digest = file_digest(self.workspace, path)?;
        self.digests.insert(path.to_path_buf(), digest);
        Ok(digest)
    }

    pub fn fileset_hash(&mut self, files: &[PathBuf]) -> io::Result<ContentHash> {
        let mut hasher = blake3::Hasher::new();
        hasher.update(FILESET_DOMAIN);
        hasher.update(&(files.len() as u64).to_le_bytes());
        for path in files {
            hasher.update(self.file_digest(path)?.as_bytes());
        }
        Ok(hasher.finalize().into())
    }

    /// Number of distinct files digested so far.
    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }
}
