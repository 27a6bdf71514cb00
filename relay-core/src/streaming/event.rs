//! Event-typed JSON line framing
//!
//! Each line is a JSON object whose `type` names the event. Only text deltas
//! and the stop event produce chunks; the other known events are bookkeeping
//! and unknown events are tolerated so new backend event kinds do not break
//! existing streams.

use super::{Frame, FrameDecoder};
use crate::protocol::{CompletionChunk, FinishReason};
use crate::providers::{ProviderError, ProviderResult};
use serde_json::Value;
use tracing::debug;

/// Event tags understood by [`EventDecoder`]
pub mod tags {
    pub const MESSAGE_START: &str = "messageStart";
    pub const CONTENT_BLOCK_START: &str = "contentBlockStart";
    pub const CONTENT_BLOCK_DELTA: &str = "contentBlockDelta";
    pub const CONTENT_BLOCK_STOP: &str = "contentBlockStop";
    pub const MESSAGE_STOP: &str = "messageStop";
    pub const METADATA: &str = "metadata";
}

/// Decoder for event-typed JSON lines
pub struct EventDecoder {
    backend: String,
    id: String,
    model: String,
    stop_reason: fn(&str) -> FinishReason,
}

impl EventDecoder {
    /// `stop_reason` maps the backend's stop vocabulary to a finish reason
    pub fn new(
        backend: impl Into<String>,
        model: impl Into<String>,
        stop_reason: fn(&str) -> FinishReason,
    ) -> Self {
        Self {
            backend: backend.into(),
            id: format!("chatcmpl-{}", uuid::Uuid::new_v4().simple()),
            model: model.into(),
            stop_reason,
        }
    }

    fn stop_chunk(&self, event: &Value) -> CompletionChunk {
        let reason = event
            .get("messageStop")
            .and_then(|stop| stop.get("stopReason"))
            .or_else(|| event.get("stopReason"))
            .and_then(Value::as_str)
            .map(self.stop_reason)
            .unwrap_or(FinishReason::Stop);
        CompletionChunk::finish(&self.id, &self.model, reason)
    }
}

impl FrameDecoder for EventDecoder {
    fn decode_line(&mut self, line: &str) -> ProviderResult<Frame> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Frame::Skip);
        }

        let event: Value = serde_json::from_str(line).map_err(|e| {
            ProviderError::decode(&self.backend, format!("invalid stream event: {}", e))
        })?;

        let kind = event.get("type").and_then(Value::as_str).unwrap_or_default();
        match kind {
            tags::CONTENT_BLOCK_DELTA => {
                let text = event
                    .get("delta")
                    .and_then(|delta| delta.get("text"))
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                if text.is_empty() {
                    Ok(Frame::Skip)
                } else {
                    Ok(Frame::Chunk(CompletionChunk::content(&self.id, &self.model, text)))
                }
            }
            tags::MESSAGE_STOP => Ok(Frame::Chunk(self.stop_chunk(&event))),
            tags::MESSAGE_START
            | tags::CONTENT_BLOCK_START
            | tags::CONTENT_BLOCK_STOP
            | tags::METADATA => Ok(Frame::Skip),
            other => {
                debug!(backend = %self.backend, event = other, "skipping unknown stream event");
                Ok(Frame::Skip)
            }
        }
    }
}
