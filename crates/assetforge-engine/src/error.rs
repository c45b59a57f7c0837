//! Execution error types.
//!
//! Four failure classes reach the caller of
//! [`Engine::exec_program`](crate::Engine::exec_program). Only
//! [`ExecError::Materialization`] may be captured into an error payload; the
//! others are always fatal to the request.

use assetforge_core::{MaterializationError, SerializationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    /// The program text is not a well-formed program.
    #[error("invalid program: {reason}")]
    Parse { reason: String },

    /// A node names a kind with no registered materializer.
    #[error("unknown operation '{kind}' at entry {index}")]
    UnknownOperation { kind: String, index: usize },

    #[error(transparent)]
    Materialization(#[from] MaterializationError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

impl ExecError {
    pub(crate) fn parse(reason: impl Into<String>) -> Self {
        ExecError::Parse {
            reason: reason.into(),
        }
    }

    /// True for the only class an error-capturing caller may intercept.
    pub fn is_capturable(&self) -> bool {
        matches!(self, ExecError::Materialization(_))
    }
}
