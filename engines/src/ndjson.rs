//! Newline-delimited JSON framing for streamed HTTP bodies

use lakehouse_bench_core::EngineError;

/// Longest accepted line (1MB), guarding against unbounded buffering.
const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Incremental NDJSON line splitter.
///
/// Bytes arrive in arbitrary chunks, so a line (or a multibyte character)
/// may span several of them. Raw bytes are buffered and a line is decoded
/// only once its terminating newline is seen.
///
/// # Buffer Limits
///
/// A line longer than 1MB is a protocol error: skipping it would silently
/// lose rows.
#[derive(Debug, Default)]
pub struct NdjsonParser {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already scanned without finding a newline
    scanned: usize,
}

impl NdjsonParser {
    /// Create a new parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes and return complete, non-empty lines.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<String>, EngineError> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        let mut start = 0;
        let mut search_from = self.scanned;
        while let Some(offset) = self.buffer[search_from..].iter().position(|&b| b == b'\n') {
            let end = search_from + offset;
            if let Some(line) = decode(&self.buffer[start..end])? {
                lines.push(line);
            }
            start = end + 1;
            search_from = start;
        }
        self.buffer.drain(..start);
        self.scanned = self.buffer.len();

        if self.buffer.len() > MAX_LINE_BYTES {
            return Err(EngineError::Protocol(format!(
                "NDJSON line exceeds {MAX_LINE_BYTES} bytes"
            )));
        }
        Ok(lines)
    }

    /// Return the trailing line of a body that did not end with a newline.
    pub fn finish(&mut self) -> Result<Option<String>, EngineError> {
        let rest = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        decode(&rest)
    }

    /// Check if the parser has buffered data.
    pub fn has_buffered_data(&self) -> bool {
        !self.buffer.is_empty()
    }
}

fn decode(raw: &[u8]) -> Result<Option<String>, EngineError> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| EngineError::Protocol(format!("NDJSON line is not valid UTF-8: {e}")))?;
    let trimmed = text.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}
