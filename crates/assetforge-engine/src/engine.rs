//! The execution engine: replays a program node by node through the
//! memoization cache.
//!
//! For each entry the engine builds its node (hash-consing it against the
//! hashes of earlier entries), then asks the cache for that hash. A miss
//! invokes the registered materializer with the entry's resolved inputs and
//! a context that records every file it reads.
//!
//! A cache entry keeps every file its value depends on, its own reads plus
//! those of its dependencies, and a digest of their contents at compute
//! time. A hit whose files no longer match that digest is dropped and
//! recomputed, so an edited asset is never answered from the cache. Hits
//! replay their files into the current [`FileLog`], keeping the log complete
//! even when parts of the program were computed by an earlier request.

use std::path::PathBuf;
use std::sync::Arc;

use smallvec::SmallVec;
use tracing::{debug, warn};

use assetforge_core::value::{error_payload, serialize};
use assetforge_core::{
    ContentHash, FileDigests, FileLog, Inputs, MaterializeContext, MaterializationError, Node,
    NodeShape, Registry, Value, Workspace,
};

use crate::cache::{CacheStats, MemoCache, DEFAULT_CACHE_CAPACITY};
use crate::error::ExecError;
use crate::program::{parse_program, EntryShape, Program};
use crate::timing::TimerMap;

/// Engine construction options.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of resident cache entries. Zero is treated as one.
    pub cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// A cached materialization: the value, the files it transitively depends
/// on, and the digest of those files when it was computed.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Arc<Value>,
    pub files: Arc<[PathBuf]>,
    pub fileset_hash: ContentHash,
}

/// Result of one program execution.
#[derive(Debug)]
pub struct ProgramOutput {
    /// Serialized final value, or an error payload when `failed`.
    pub payload: String,
    /// Every file read (or replayed from the cache) during this execution.
    pub files: FileLog,
    /// True if a materializer failed and the failure was captured.
    pub failed: bool,
}

pub struct Engine {
    registry: Registry,
    workspace: Workspace,
    cache: MemoCache<CacheEntry>,
    timers: TimerMap,
}

impl Engine {
    pub fn new(registry: Registry, workspace: Workspace, config: EngineConfig) -> Self {
        Engine {
            registry,
            workspace,
            cache: MemoCache::new(config.cache_capacity),
            timers: TimerMap::new(),
        }
    }

    /// Parses, evaluates and serializes one program.
    ///
    /// With `propagate_errors` false, a materializer failure becomes an
    /// error payload (`failed` set) instead of an `Err`. Every other error
    /// class is returned regardless.
    pub fn exec_program(
        &mut self,
        text: &str,
        propagate_errors: bool,
    ) -> Result<ProgramOutput, ExecError> {
        let program = parse_program(text)?;
        let mut files = FileLog::new();
        match self.evaluate(&program, &mut files) {
            Ok(value) => {
                let payload = serialize(&value)?;
                Ok(ProgramOutput {
                    payload,
                    files,
                    failed: false,
                })
            }
            Err(ExecError::Materialization(err)) if !propagate_errors => {
                warn!(kind = %err.kind, error = %err, "materialization failed; returning error payload");
                Ok(ProgramOutput {
                    payload: error_payload(&err.chain()),
                    files,
                    failed: true,
                })
            }
            Err(err) => Err(err),
        }
    }

    fn evaluate(&mut self, program: &Program, files: &mut FileLog) -> Result<Arc<Value>, ExecError> {
        let mut hashes: Vec<ContentHash> = Vec::with_capacity(program.len());
        let mut resolved: Vec<CacheEntry> = Vec::with_capacity(program.len());
        let mut digests = FileDigests::new(&self.workspace);

        for (index, entry) in program.entries().iter().enumerate() {
            let op = self
                .registry
                .lookup(&entry.kind)
                .ok_or_else(|| ExecError::UnknownOperation {
                    kind: entry.kind.clone(),
                    index,
                })?;

            let mut inherited = FileLog::new();
            let (node, dep_values) = match &entry.shape {
                EntryShape::Literal(data) => (
                    Node::literal(entry.kind.as_str(), data.clone()),
                    SmallVec::<[Arc<Value>; 4]>::new(),
                ),
                EntryShape::Derived(deps) => {
                    for &dep in deps {
                        inherited.extend(resolved[dep].files.iter());
                    }
                    (
                        Node::derived(entry.kind.as_str(), deps.iter().map(|&dep| hashes[dep])),
                        deps.iter()
                            .map(|&dep| Arc::clone(&resolved[dep].value))
                            .collect(),
                    )
                }
            };
            let hash = node.hash();

            let stale = match self.cache.peek(&hash) {
                Some(cached) if !cached.files.is_empty() => digests
                    .fileset_hash(&cached.files)
                    .map_or(true, |current| current != cached.fileset_hash),
                _ => false,
            };
            if stale {
                debug!(hash = ?hash, kind = %entry.kind, "cached value depends on changed files");
                self.cache.remove(&hash);
            }

            let registry = &self.registry;
            let workspace = &self.workspace;
            let timers = &mut self.timers;
            let mut attempted = FileLog::new();
            let result = self.cache.get_or_compute(hash, || {
                let inputs = match node.shape() {
                    NodeShape::Literal(data) => Inputs::Literal(data),
                    NodeShape::Derived(_) => Inputs::Derived(dep_values.as_slice()),
                };
                let value = {
                    let _watch = timers.start(&entry.kind);
                    let mut ctx = MaterializeContext::new(workspace, &mut attempted);
                    registry.invoke(op, inputs, &mut ctx)?
                };
                let mut depends_on = inherited.clone();
                depends_on.extend(attempted.paths());
                let depends_on = depends_on.into_vec();
                let fileset_hash = digests.fileset_hash(&depends_on).map_err(|e| {
                    MaterializationError::with_source("failed to digest input files", e)
                })?;
                Ok::<_, MaterializationError>(CacheEntry {
                    value: Arc::new(value),
                    files: depends_on.into(),
                    fileset_hash,
                })
            });

            match result {
                Ok(cached) => {
                    files.extend(cached.files.iter());
                    hashes.push(hash);
                    resolved.push(cached);
                }
                Err(err) => {
                    // The failed read set still matters to the incremental index.
                    files.extend(attempted.paths());
                    return Err(err.into());
                }
            }
        }

        debug!(
            entries = program.len(),
            files = files.len(),
            digested = digests.len(),
            "program evaluated"
        );
        resolved
            .pop()
            .map(|entry| entry.value)
            .ok_or_else(|| ExecError::parse("program has no entries"))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Number of resident cache entries.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_cached(&self, hash: &ContentHash) -> bool {
        self.cache.contains(hash)
    }

    pub fn timers(&self) -> &TimerMap {
        &self.timers
    }

    pub fn reset_timers(&mut self) {
        self.timers.clear();
    }

    /// Timer table followed by cache counters.
    pub fn profile_report(&self) -> String {
        let stats = self.cache.stats();
        let mut report = self.timers.render();
        report.push_str(&format!(
            "cache: {} hits, {} misses, {} evictions, {}/{} resident ({:.1}% hit rate)\n",
            stats.hits,
            stats.misses,
            stats.evictions,
            self.cache.len(),
            self.cache.capacity(),
            stats.hit_rate() * 100.0
        ));
        report
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &self.registry)
            .field("workspace", &self.workspace)
            .field("cache_len", &self.cache.len())
            .field("cache_stats", &self.cache.stats())
            .finish()
    }
}
