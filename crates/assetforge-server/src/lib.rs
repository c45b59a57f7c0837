//! Long-lived batch protocol server for assetforge.
//!
//! One process serves many build requests over a pair of byte streams
//! (typically named pipes), reusing the engine's memoization cache across
//! requests and consulting the incremental index before executing.
//!
//! # Modules
//!
//! - [`framing`]: length-prefixed requests, base64 line responses
//! - [`session`]: [`Session`] (engine + optional index), [`BatchSummary`]
//! - [`batch`]: [`BatchServer`] serve loop
//! - [`error`]: [`ServerError`] with exit code mapping

pub mod batch;
pub mod error;
pub mod framing;
pub mod session;

pub use batch::BatchServer;
pub use error::ServerError;
pub use framing::{decode_response, read_request, write_request, write_response};
pub use session::{BatchSummary, Session, SessionOptions};
