//! Incremental parser for the provider's server-sent-event wire format.
//!
//! Each frame is a two-line block (`event: <type>` then `data: <json>`)
//! terminated by a blank line. Frames arrive over a byte stream and may be
//! split at arbitrary read boundaries, so the parser buffers the trailing
//! incomplete frame between calls. The buffer belongs to exactly one stream
//! for its lifetime.

use serde::{Deserialize, Serialize};

/// One structurally complete SSE frame: event tag plus decoded JSON payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SseFrame {
    pub event: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Default)]
pub struct SseFrameParser {
    buffer: String,
}

impl SseFrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk of bytes, returning every frame completed by it.
    ///
    /// Buffered data from the previous call is prepended before splitting,
    /// so a frame cut anywhere by the read boundary parses identically to
    /// one delivered whole. Input that ends exactly on a frame boundary
    /// leaves the buffer empty. A frame whose payload is not valid JSON is
    /// dropped with a warning; later frames are unaffected.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseFrame> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.find("\n\n") {
            let raw: String = self.buffer.drain(..pos + 2).collect();
            let raw = raw.trim_end_matches('\n');
            if raw.trim().is_empty() {
                continue;
            }
            if let Some(frame) = parse_frame(raw) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Whether a partial frame is still buffered.
    pub fn has_partial(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// End of stream. Trailing buffered bytes are discarded, not an error:
    /// a well-formed stream always ends on a frame boundary.
    pub fn finish(self) {
        if !self.buffer.is_empty() {
            tracing::debug!(
                len = self.buffer.len(),
                "Discarding partial SSE frame at end of stream"
            );
        }
    }
}

fn parse_frame(raw: &str) -> Option<SseFrame> {
    let mut event = None;
    let mut data = None;

    for line in raw.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(rest) = strip_field(line, "event:") {
            event = Some(rest.to_string());
        } else if let Some(rest) = strip_field(line, "data:") {
            data = Some(rest.to_string());
        }
        // Comment lines (":keepalive") and unknown fields are ignored.
    }

    let event = event?;
    let data = data.unwrap_or_default();

    match serde_json::from_str(&data) {
        Ok(json) => Some(SseFrame { event, data: json }),
        Err(e) => {
            tracing::warn!(event = %event, error = %e, "Dropping SSE frame with malformed JSON payload");
            None
        }
    }
}

fn strip_field<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    line.strip_prefix(prefix).map(str::trim)
}
