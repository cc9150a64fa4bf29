use serde_json::Value;

use crate::error::ChatApiError;
use crate::events::ChatStreamEvent;

/// Incremental parser for newline-delimited JSON streams.
///
/// Each complete line must be one of the two wire shapes; anything
/// else is a [`ChatApiError::MalformedPayload`], which callers treat
/// as a stream failure rather than a crash.
#[derive(Debug, Default)]
pub struct NdjsonStreamParser {
    // Raw bytes, not a String: a transport chunk may end in the middle
    // of a multi-byte UTF-8 character, so decoding happens per
    // complete line.
    buffer: Vec<u8>,
}

impl NdjsonStreamParser {
    /// Feed arbitrary bytes into the parser and drain complete lines.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<ChatStreamEvent>, ChatApiError> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(split) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(0..=split).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim();

            if line.is_empty() {
                continue;
            }

            events.push(map_payload(line)?);
        }

        Ok(events)
    }

    /// Drains a trailing payload that arrived without a final newline.
    pub fn finish(&mut self) -> Result<Option<ChatStreamEvent>, ChatApiError> {
        let raw = std::mem::take(&mut self.buffer);
        let line = String::from_utf8_lossy(&raw);
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        map_payload(line).map(Some)
    }

    /// Parse a complete stream body in one shot.
    pub fn parse_lines(input: &str) -> Result<Vec<ChatStreamEvent>, ChatApiError> {
        let mut parser = Self::default();
        let mut events = parser.feed(input.as_bytes())?;
        if let Some(trailing) = parser.finish()? {
            events.push(trailing);
        }
        Ok(events)
    }

    #[must_use]
    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.iter().all(u8::is_ascii_whitespace)
    }
}

fn map_payload(line: &str) -> Result<ChatStreamEvent, ChatApiError> {
    let value = serde_json::from_str::<Value>(line)
        .map_err(|_| ChatApiError::MalformedPayload(line.to_string()))?;

    if let Some(error) = value.get("error") {
        let message = error
            .as_str()
            .ok_or_else(|| ChatApiError::MalformedPayload(line.to_string()))?;
        return Ok(ChatStreamEvent::AuthError {
            message: message.to_owned(),
        });
    }

    let content = value
        .get("result")
        .and_then(|result| result.get("output"))
        .and_then(|output| output.get("content"))
        .and_then(|content| content.as_str())
        .ok_or_else(|| ChatApiError::MalformedPayload(line.to_string()))?;

    Ok(ChatStreamEvent::Content {
        text: content.to_owned(),
    })
}
