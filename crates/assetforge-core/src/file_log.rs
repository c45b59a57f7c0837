//! Accumulator of files read while a program executes.
//!
//! A fresh [`FileLog`] is created for every program execution and handed to
//! materializers through their context. When the execution finishes the
//! caller drains it into the incremental index. Paths are kept as the
//! materializer spelled them (usually workspace relative), in first-touch
//! order, without duplicates.

use std::path::{Path, PathBuf};

use indexmap::IndexSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileLog {
    paths: IndexSet<PathBuf>,
}

impl FileLog {
    pub fn new() -> Self {
        FileLog::default()
    }

    /// Records a touched path. Returns false if it was already recorded.
    pub fn record(&mut self, path: impl Into<PathBuf>) -> bool {
        self.paths.insert(path.into())
    }

    pub fn extend<I, P>(&mut self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        for path in paths {
            self.record(path);
        }
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.paths.contains(path.as_ref())
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> + '_ {
        self.paths.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }

    pub fn into_vec(self) -> Vec<PathBuf> {
        self.paths.into_iter().collect()
    }

    pub fn to_vec(&self) -> Vec<PathBuf> {
        self.paths.iter().cloned().collect()
    }
}
