//! Length-prefixed request framing and base64 line responses.
//!
//! A request is a decimal ASCII byte count on its own line followed by
//! exactly that many bytes of UTF-8 program text. A `0` header, an empty
//! header line, or end of input at a header boundary ends the stream.
//!
//! Each response is the base64 (standard alphabet, padded) encoding of the
//! payload on a single line, flushed immediately.

use std::io::{BufRead, Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::ServerError;

/// Reads the next request, or `None` at end of stream.
pub fn read_request<R: BufRead>(input: &mut R) -> Result<Option<String>, ServerError> {
    let mut header = Vec::new();
    if input.read_until(b'\n', &mut header)? == 0 {
        return Ok(None);
    }
    let header = std::str::from_utf8(&header)
        .map_err(|_| ServerError::framing("length header is not ASCII"))?
        .trim();
    if header.is_empty() {
        return Ok(None);
    }
    let len: u64 = header
        .parse()
        .map_err(|_| ServerError::framing(format!("invalid length header {header:?}")))?;
    if len == 0 {
        return Ok(None);
    }

    let mut body = Vec::new();
    input.take(len).read_to_end(&mut body)?;
    if (body.len() as u64) < len {
        return Err(ServerError::framing(format!(
            "truncated request: expected {len} bytes, got {}",
            body.len()
        )));
    }
    String::from_utf8(body)
        .map(Some)
        .map_err(|_| ServerError::framing("request body is not valid UTF-8"))
}

/// Writes `payload` as one base64 line and flushes.
pub fn write_response<W: Write>(output: &mut W, payload: &str) -> Result<(), ServerError> {
    let mut line = STANDARD.encode(payload.as_bytes());
    line.push('\n');
    output.write_all(line.as_bytes())?;
    output.flush()?;
    Ok(())
}

/// Client side of the framing: writes one length-prefixed request.
pub fn write_request<W: Write>(output: &mut W, program_text: &str) -> Result<(), ServerError> {
    write!(output, "{}\n{}", program_text.len(), program_text)?;
    output.flush()?;
    Ok(())
}

/// Client side of the framing: decodes one response line.
pub fn decode_response(line: &str) -> Result<String, ServerError> {
    let bytes = STANDARD
        .decode(line.trim_end())
        .map_err(|e| ServerError::framing(format!("invalid base64 response: {e}")))?;
    String::from_utf8(bytes).map_err(|_| ServerError::framing("response is not valid UTF-8"))
}
