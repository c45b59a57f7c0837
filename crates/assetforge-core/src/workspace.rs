//! Workspace root for materializer file access.
//!
//! Every relative path a materializer touches resolves against one root
//! directory, fixed when the process starts. [`Workspace`] has no setters.

use std::path::{Path, PathBuf};

/// Root directory that relative asset paths resolve against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Workspace { root: root.into() }
    }

    /// Workspace rooted at the process working directory.
    pub fn current_dir() -> std::io::Result<Self> {
        Ok(Workspace::new(std::env::current_dir()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `path` against the root. Absolute paths pass through.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}
