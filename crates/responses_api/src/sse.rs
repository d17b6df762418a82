use crate::error::ApiError;
use crate::events::{decode_event, StreamEvent};

/// Incremental parser for SSE byte streams.
#[derive(Debug, Default)]
pub struct SseStreamParser {
    buffer: Vec<u8>,
}

impl SseStreamParser {
    /// Feed arbitrary bytes into the parser and drain complete events.
    ///
    /// Malformed payloads and unknown event tags come back as errors in the
    /// position the server sent them.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Result<StreamEvent, ApiError>> {
        self.buffer
            .extend(bytes.iter().copied().filter(|byte| *byte != b'\r'));
        let mut events = Vec::new();

        while let Some(split) = find_frame_end(&self.buffer) {
            let frame: Vec<u8> = self.buffer.drain(..split + 2).collect();
            if let Some(event) = decode_frame(&frame[..split]) {
                events.push(event);
            }
        }

        events
    }

    /// Flush a trailing frame that was not followed by a blank line.
    pub fn finish(&mut self) -> Vec<Result<StreamEvent, ApiError>> {
        let frame = std::mem::take(&mut self.buffer);
        decode_frame(&frame).into_iter().collect()
    }

    /// Parse a complete SSE payload string in one shot.
    pub fn parse_frames(input: &str) -> Vec<Result<StreamEvent, ApiError>> {
        let mut parser = Self::default();
        let mut events = parser.feed(input.as_bytes());
        events.extend(parser.finish());
        events
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.iter().all(u8::is_ascii_whitespace)
    }
}

fn find_frame_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|window| window == b"\n\n")
}

fn decode_frame(frame: &[u8]) -> Option<Result<StreamEvent, ApiError>> {
    let frame = String::from_utf8_lossy(frame);
    let payload = extract_data_payload(&frame)?;
    if payload == "[DONE]" {
        return None;
    }
    Some(decode_event(&payload))
}

/// Joins the frame's `data:` lines. `event:`, `id:`, `retry:` and comment
/// lines are ignored.
fn extract_data_payload(frame: &str) -> Option<String> {
    let data_lines: Vec<&str> = frame
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|value| value.strip_prefix(' ').unwrap_or(value))
        .collect();

    let payload = data_lines.join("\n");
    if payload.trim().is_empty() {
        None
    } else {
        Some(payload)
    }
}
