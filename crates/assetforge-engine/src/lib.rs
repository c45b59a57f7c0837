//! Memoized program execution for assetforge.
//!
//! The [`Engine`] parses program text, hash-conses every entry into a
//! content-addressed node, and resolves each node through a bounded LRU
//! [`MemoCache`] so that structurally identical work is done once per
//! process. Materializer calls are timed per operation kind.
//!
//! # Architecture
//!
//! - [`program`]: program text parsing and validation, [`ProgramBuilder`]
//! - [`cache`]: [`MemoCache`] (strict LRU keyed by content hash)
//! - [`engine`]: [`Engine`], [`EngineConfig`], [`ProgramOutput`]
//! - [`timing`]: [`TimerMap`] and scoped [`Stopwatch`]
//! - [`error`]: [`ExecError`]
//!
//! # Usage
//!
//! ```ignore
//! let mut engine = Engine::new(Registry::with_builtins(), workspace, EngineConfig::default());
//! let out = engine.exec_program(text, false)?;
//! println!("{}", out.payload);
//! ```

pub mod cache;
pub mod engine;
pub mod error;
pub mod program;
pub mod timing;

pub use cache::{CacheStats, MemoCache, DEFAULT_CACHE_CAPACITY};
pub use engine::{CacheEntry, Engine, EngineConfig, ProgramOutput};
pub use error::ExecError;
pub use program::{parse_program, EntryShape, Program, ProgramBuilder, ProgramEntry};
pub use timing::{Stopwatch, TimerMap, TimerStat};
