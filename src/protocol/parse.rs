use serde_json::Value;
use tracing::{debug, warn};

use super::types::EventRecord;

/// Incremental decoder for the `event:` / `data:` / blank-line stream format.
///
/// Chunks may split anywhere, including inside a multi-byte character. Only
/// complete lines are interpreted; the trailing partial line stays buffered
/// until the next [`push`](Self::push).
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    event_type: Option<String>,
    data: Option<Value>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every record it completed, in stream order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<EventRecord> {
        self.buffer.extend_from_slice(chunk);
        let Some(last_newline) = self.buffer.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };
        let complete: Vec<u8> = self.buffer.drain(..=last_newline).collect();

        let mut records = Vec::new();
        // The drained region ends with '\n', so the final split piece is empty.
        let mut lines: Vec<&[u8]> = complete.split(|b| *b == b'\n').collect();
        lines.pop();
        for line in lines {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if let Some(record) = self.feed_line(line) {
                records.push(record);
            }
        }
        records
    }

    /// End of stream. Discards any unterminated residual and pending fields.
    pub fn finish(&mut self) {
        if !self.buffer.is_empty() || self.event_type.is_some() || self.data.is_some() {
            debug!(
                residual_bytes = self.buffer.len(),
                pending_event = ?self.event_type,
                "discarding truncated final record"
            );
        }
        self.reset();
    }

    /// Drop all buffered state, as if freshly constructed.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.event_type = None;
        self.data = None;
    }

    /// Number of bytes waiting for a line terminator.
    pub fn residual_len(&self) -> usize {
        self.buffer.len()
    }

    fn feed_line(&mut self, line: &[u8]) -> Option<EventRecord> {
        let Ok(line) = std::str::from_utf8(line) else {
            warn!(len = line.len(), "dropping non-UTF-8 stream line");
            return None;
        };

        if line.is_empty() {
            let event_type = self.event_type.take();
            let data = self.data.take();
            return Some(EventRecord::new(event_type?, data?));
        }

        if let Some(value) = field_value(line, "event") {
            self.event_type = Some(value.to_string());
        } else if let Some(value) = field_value(line, "data") {
            self.data = match serde_json::from_str(value) {
                Ok(data) => Some(data),
                Err(e) => {
                    warn!(
                        event = ?self.event_type,
                        error = %e,
                        "dropping record with undecodable payload"
                    );
                    None
                }
            };
        }
        // Anything else (comments, ids, retry hints) is noise.
        None
    }
}

/// Return the value of a `name: value` line, tolerating a missing space.
fn field_value<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(name)?.strip_prefix(':')?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

/// Decode a complete stream in one pass.
pub fn decode_all(bytes: &[u8]) -> Vec<EventRecord> {
    let mut decoder = FrameDecoder::new();
    let records = decoder.push(bytes);
    decoder.finish();
    records
}
