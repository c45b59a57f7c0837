//! Per-process session state shared by every request of a batch.
//!
//! [`Session`] owns the engine (and with it the memoization cache) and, in
//! incremental mode, the open [`IncrementalIndex`]. Requests run strictly
//! one after another; nothing here is shared across threads.

use tracing::{debug, info};

use assetforge_core::value::unchanged_signal;
use assetforge_engine::Engine;
use assetforge_storage::IncrementalIndex;

use crate::error::ServerError;

#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    /// Return materialization failures as errors instead of error payloads.
    pub propagate_errors: bool,
}

/// Counters for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub requests: u64,
    /// Requests answered with the unchanged signal.
    pub skipped: u64,
    /// Requests answered with a captured error payload.
    pub failed: u64,
}

pub struct Session {
    engine: Engine,
    index: Option<IncrementalIndex>,
    options: SessionOptions,
    summary: BatchSummary,
}

impl Session {
    /// `index` enables incremental mode.
    pub fn new(engine: Engine, index: Option<IncrementalIndex>, options: SessionOptions) -> Self {
        Session {
            engine,
            index,
            options,
            summary: BatchSummary::default(),
        }
    }

    /// Handles one program, returning the response payload.
    ///
    /// In incremental mode an unchanged program is answered with the
    /// unchanged signal without executing it; otherwise the files it read
    /// are recorded in the index after it runs.
    pub fn handle(&mut self, program_text: &str) -> Result<String, ServerError> {
        self.summary.requests += 1;

        if let Some(index) = &self.index {
            if index.unchanged(program_text)? {
                self.summary.skipped += 1;
                debug!(request = self.summary.requests, "program unchanged; skipped");
                return Ok(unchanged_signal());
            }
        }

        let output = self
            .engine
            .exec_program(program_text, self.options.propagate_errors)?;
        if output.failed {
            self.summary.failed += 1;
        }
        if let Some(index) = &mut self.index {
            index.update(program_text, &output.files)?;
        }
        debug!(
            request = self.summary.requests,
            files = output.files.len(),
            failed = output.failed,
            "request handled"
        );
        Ok(output.payload)
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn index(&self) -> Option<&IncrementalIndex> {
        self.index.as_ref()
    }

    pub fn options(&self) -> SessionOptions {
        self.options
    }

    pub fn summary(&self) -> BatchSummary {
        self.summary
    }

    /// Flushes the index (if any) and ends the session.
    pub fn close(mut self) -> Result<BatchSummary, ServerError> {
        if let Some(index) = self.index.take() {
            index.close()?;
        }
        info!(
            requests = self.summary.requests,
            skipped = self.summary.skipped,
            failed = self.summary.failed,
            "session closed"
        );
        Ok(self.summary)
    }
}
