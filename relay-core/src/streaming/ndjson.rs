//! Newline-delimited JSON framing
//!
//! Each non-blank line is one JSON object. An object with `"done": true` is
//! the last one: its chunk is emitted with a terminal finish reason and the
//! following pull reports end-of-stream.

use super::{Frame, FrameDecoder};
use crate::protocol::{ChunkChoice, CompletionChunk, Delta, FinishReason};
use crate::providers::{ProviderError, ProviderResult};
use serde_json::Value;

/// NDJSON decoder mapping each object with `mapper`
pub struct NdjsonDecoder<F> {
    backend: String,
    mapper: F,
}

impl<F> NdjsonDecoder<F>
where
    F: FnMut(&Value) -> ProviderResult<CompletionChunk> + Send,
{
    pub fn new(backend: impl Into<String>, mapper: F) -> Self {
        Self {
            backend: backend.into(),
            mapper,
        }
    }
}

impl<F> FrameDecoder for NdjsonDecoder<F>
where
    F: FnMut(&Value) -> ProviderResult<CompletionChunk> + Send,
{
    fn decode_line(&mut self, line: &str) -> ProviderResult<Frame> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Frame::Skip);
        }

        let value: Value = serde_json::from_str(line)
            .map_err(|e| ProviderError::decode(&self.backend, format!("invalid NDJSON line: {}", e)))?;

        let mut chunk = (self.mapper)(&value)?;

        if value.get("done").and_then(Value::as_bool) == Some(true) {
            ensure_terminal(&mut chunk);
            return Ok(Frame::Final(chunk));
        }

        Ok(Frame::Chunk(chunk))
    }
}

/// Make sure the chunk carries a finish reason
fn ensure_terminal(chunk: &mut CompletionChunk) {
    match chunk.choices.first_mut() {
        Some(choice) => {
            choice.finish_reason.get_or_insert(FinishReason::Stop);
        }
        None => chunk.choices.push(ChunkChoice {
            index: 0,
            delta: Delta::default(),
            finish_reason: Some(FinishReason::Stop),
        }),
    }
}
