//! Streaming support for OpenAI responses

use super::converter::from_openai_stream_chunk;
use super::types::OpenAIStreamChunk;
use crate::providers::{ProviderError, ProviderResult};
use crate::streaming::sse::SseDecoder;
use crate::streaming::{Frame, FrameDecoder};

/// Map one SSE payload to a frame
///
/// Chunks with neither choices nor usage (some compatible servers send them
/// as keep-alives) are skipped. An `error` object fails the stream.
pub fn map_stream_payload(backend: &str, payload: &str) -> ProviderResult<Frame> {
    let chunk: OpenAIStreamChunk = serde_json::from_str(payload)
        .map_err(|e| ProviderError::decode(backend, format!("invalid stream chunk: {}", e)))?;

    if let Some(error) = chunk.error {
        let kind = error.kind.as_deref().unwrap_or("error");
        return Err(ProviderError::decode(
            backend,
            format!("stream error ({}): {}", kind, error.message),
        ));
    }

    if chunk.choices.is_empty() && chunk.usage.is_none() {
        return Ok(Frame::Skip);
    }

    Ok(Frame::Chunk(from_openai_stream_chunk(chunk)))
}

/// SSE decoder for OpenAI-compatible streams
pub fn decoder(backend: impl Into<String>) -> Box<dyn FrameDecoder> {
    let backend = backend.into();
    Box::new(SseDecoder::new(move |payload: &str| {
        map_stream_payload(&backend, payload)
    }))
}
