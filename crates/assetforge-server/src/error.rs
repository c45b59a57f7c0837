//! Server error types with process exit code mapping.
//!
//! [`ServerError`] is the unified error type for a batch session. Any value
//! of it ends the session; captured materialization failures never reach
//! this type because the engine turns them into error payloads.

use assetforge_engine::ExecError;
use assetforge_storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The request stream violates the length-prefixed framing.
    #[error("framing error: {reason}")]
    Framing { reason: String },

    /// Reading requests or writing responses failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A request failed in a way that cannot be captured into a payload.
    #[error(transparent)]
    Exec(#[from] ExecError),

    /// The incremental index could not be read or written.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ServerError {
    pub(crate) fn framing(reason: impl Into<String>) -> Self {
        ServerError::Framing {
            reason: reason.into(),
        }
    }

    /// Process exit code for this error: 1 execution, 2 framing, 3 I/O or
    /// index storage.
    pub fn exit_code(&self) -> i32 {
        match self {
            ServerError::Exec(_) => 1,
            ServerError::Framing { .. } => 2,
            ServerError::Io(_) | ServerError::Storage(_) => 3,
        }
    }
}
