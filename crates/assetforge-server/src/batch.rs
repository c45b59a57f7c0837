//! The duplex batch loop.
//!
//! Reads framed requests from `input` until end of stream and writes one
//! response line per request to `output`. A request that fails with a
//! [`ServerError`] ends the loop immediately; responses already written
//! stay written.

use std::io::{BufRead, Write};

use tracing::{info, warn};

use crate::error::ServerError;
use crate::framing::{read_request, write_response};
use crate::session::{BatchSummary, Session};

pub struct BatchServer {
    session: Session,
}

impl BatchServer {
    pub fn new(session: Session) -> Self {
        BatchServer { session }
    }

    pub fn serve<R: BufRead, W: Write>(
        &mut self,
        input: &mut R,
        output: &mut W,
    ) -> Result<BatchSummary, ServerError> {
        info!("batch session started");
        while let Some(request) = read_request(input)? {
            let payload = match self.session.handle(&request) {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(error = %err, "request failed; ending session");
                    return Err(err);
                }
            };
            write_response(output, &payload)?;
        }
        let summary = self.session.summary();
        info!(
            requests = summary.requests,
            skipped = summary.skipped,
            failed = summary.failed,
            "end of request stream"
        );
        Ok(summary)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }
}
