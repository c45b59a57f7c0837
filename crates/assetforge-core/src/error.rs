//! Core error types for assetforge-core.
//!
//! Uses `thiserror` for structured, matchable error variants. Materializer
//! failures and wire-encoding failures get their own types because the
//! engine treats them differently: only [`MaterializationError`] can be
//! captured into an error payload.

use std::path::Path;

use thiserror::Error;

/// Errors produced while building registries or parsing core identifiers.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A second implementation was registered for an existing kind.
    #[error("duplicate operation: '{kind}' is already registered")]
    DuplicateOperation { kind: String },

    /// A string could not be decoded into a [`crate::ContentHash`].
    #[error("invalid content hash: '{input}'")]
    InvalidHash { input: String },
}

type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A registered operation failed while producing its value.
///
/// `kind` is filled in by the registry on dispatch, so materializers build
/// errors with [`MaterializationError::msg`] and never need to know their own
/// registration name.
#[derive(Debug, Error)]
#[error("error materializing '{kind}': {message}")]
pub struct MaterializationError {
    pub kind: String,
    pub message: String,
    #[source]
    pub source: Option<BoxedSource>,
}

impl MaterializationError {
    /// Creates an error with a plain message and no underlying cause.
    pub fn msg(message: impl Into<String>) -> Self {
        MaterializationError {
            kind: String::new(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error wrapping an underlying cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        MaterializationError {
            kind: String::new(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Wraps an I/O failure on `path`.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::with_source(format!("failed to read '{}'", path.display()), source)
    }

    /// Sets the operation kind, keeping an already assigned one.
    pub fn with_kind(mut self, kind: &str) -> Self {
        if self.kind.is_empty() {
            self.kind = kind.to_string();
        }
        self
    }

    /// Renders the error and its cause chain, outermost first.
    pub fn chain(&self) -> Vec<String> {
        let mut info = vec![self.to_string()];
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            info.push(cause.to_string());
            source = cause.source();
        }
        info
    }
}

/// A produced value has no wire encoding.
#[derive(Debug, Error)]
#[error("unable to serialize {type_name}: {reason}")]
pub struct SerializationError {
    pub type_name: String,
    pub reason: String,
}

impl SerializationError {
    pub fn new(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        SerializationError {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }
}
