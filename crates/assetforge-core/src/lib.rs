//! Core data model for the assetforge build pipeline.
//!
//! Defines the content-addressed node model, the materialized value model and
//! its wire encoding, and the registry that maps operation kinds to
//! materializer implementations.
//!
//! # Modules
//!
//! - [`hash`]: [`ContentHash`] and the structural hashing functions
//! - [`node`]: Literal and Derived node shapes
//! - [`value`]: [`Value`], the [`DomainValue`] extension trait, wire payloads
//! - [`registry`]: [`Registry`], [`Materializer`], [`MaterializeContext`]
//! - [`builtins`]: primitive literal kinds and a handful of generic operations
//! - [`fileset`]: [`fileset_hash`] and the per-build [`FileDigests`] memo
//! - [`file_log`]: [`FileLog`] accumulator of files read during a build
//! - [`workspace`]: [`Workspace`] root for relative file paths
//! - [`id`]: interned operation identifiers
//! - [`error`]: error types shared by the other crates

pub mod builtins;
pub mod error;
pub mod file_log;
pub mod fileset;
pub mod hash;
pub mod id;
pub mod node;
pub mod registry;
pub mod value;
pub mod workspace;

// Re-export commonly used types
pub use error::{CoreError, MaterializationError, SerializationError};
pub use file_log::FileLog;
pub use fileset::{file_digest, fileset_hash, FileDigests};
pub use hash::{hash_bytes, hash_derived, hash_literal, ContentHash};
pub use id::OpId;
pub use node::{LiteralData, Node, NodeShape};
pub use registry::{Inputs, MaterializeContext, Materializer, Registry};
pub use value::{DomainValue, Value};
pub use workspace::Workspace;
