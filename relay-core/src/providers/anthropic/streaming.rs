//! Streaming support for Anthropic responses
//!
//! Anthropic streams are SSE with named events. The `event:` lines are
//! ignored; every `data:` payload carries its own `type`, and
//! `message_stop` ends the stream.

use super::converter::map_stop_reason;
use super::types::{AnthropicBlockDelta, AnthropicContentBlock, AnthropicStreamEvent};
use crate::protocol::{ChunkChoice, CompletionChunk, Delta, ToolCallDelta, Usage};
use crate::providers::{synthetic_id, ProviderError, ProviderResult};
use crate::streaming::sse::SseDecoder;
use crate::streaming::{Frame, FrameDecoder};
use tracing::debug;

/// Per-stream state carried between events
#[derive(Debug)]
pub struct StreamMapper {
    backend: String,
    id: String,
    model: String,
    input_tokens: Option<u32>,
    /// Block indices of tool-use blocks, in arrival order
    tool_blocks: Vec<u32>,
}

impl StreamMapper {
    pub fn new(backend: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            id: synthetic_id("msg"),
            model: model.into(),
            input_tokens: None,
            tool_blocks: Vec::new(),
        }
    }

    /// Map one SSE payload to a frame
    pub fn map(&mut self, payload: &str) -> ProviderResult<Frame> {
        let event: AnthropicStreamEvent = serde_json::from_str(payload)
            .map_err(|e| ProviderError::decode(&self.backend, format!("invalid stream event: {}", e)))?;

        match event {
            AnthropicStreamEvent::MessageStart { message } => {
                if !message.id.is_empty() {
                    self.id = message.id;
                }
                if !message.model.is_empty() {
                    self.model = message.model;
                }
                self.input_tokens = message.usage.and_then(|usage| usage.input_tokens);
                Ok(Frame::Skip)
            }
            AnthropicStreamEvent::ContentBlockStart {
                index,
                content_block: AnthropicContentBlock::ToolUse { id, name, .. },
            } => {
                let ordinal = self.tool_blocks.len() as u32;
                self.tool_blocks.push(index);
                Ok(Frame::Chunk(self.tool_chunk(ToolCallDelta {
                    index: ordinal,
                    id: Some(id),
                    name: Some(name),
                    arguments: None,
                })))
            }
            AnthropicStreamEvent::ContentBlockDelta { index, delta } => match delta {
                AnthropicBlockDelta::TextDelta { text } => {
                    Ok(Frame::Chunk(CompletionChunk::content(&self.id, &self.model, text)))
                }
                AnthropicBlockDelta::InputJsonDelta { partial_json } => {
                    let Some(ordinal) = self.tool_blocks.iter().position(|&block| block == index) else {
                        return Ok(Frame::Skip);
                    };
                    Ok(Frame::Chunk(self.tool_chunk(ToolCallDelta {
                        index: ordinal as u32,
                        id: None,
                        name: None,
                        arguments: Some(partial_json),
                    })))
                }
                AnthropicBlockDelta::Other => Ok(Frame::Skip),
            },
            AnthropicStreamEvent::MessageDelta { delta, usage } => {
                let Some(reason) = delta.stop_reason else {
                    return Ok(Frame::Skip);
                };
                let mut chunk = CompletionChunk::finish(&self.id, &self.model, map_stop_reason(&reason));
                chunk.usage = usage.and_then(|usage| {
                    Usage::from_counts(self.input_tokens.or(usage.input_tokens), usage.output_tokens, None)
                });
                Ok(Frame::Chunk(chunk))
            }
            AnthropicStreamEvent::MessageStop => Ok(Frame::Done),
            AnthropicStreamEvent::Error { error } => Err(ProviderError::decode(
                &self.backend,
                format!("stream error ({}): {}", error.kind, error.message),
            )),
            AnthropicStreamEvent::Unknown => {
                debug!(backend = %self.backend, "skipping unknown stream event");
                Ok(Frame::Skip)
            }
            _ => Ok(Frame::Skip),
        }
    }

    fn tool_chunk(&self, delta: ToolCallDelta) -> CompletionChunk {
        CompletionChunk {
            id: self.id.clone(),
            model: self.model.clone(),
            choices: vec![ChunkChoice {
                index: 0,
                delta: Delta {
                    tool_calls: Some(vec![delta]),
                    ..Default::default()
                },
                finish_reason: None,
            }],
            usage: None,
        }
    }
}

/// SSE decoder for Anthropic streams
pub fn decoder(backend: impl Into<String>, model: impl Into<String>) -> Box<dyn FrameDecoder> {
    let mut mapper = StreamMapper::new(backend, model);
    Box::new(SseDecoder::new(move |payload: &str| mapper.map(payload)))
}
