//! Protocol module for the canonical request/response structures
//!
//! This module defines the data models every backend adapter maps into.
//! These structures are:
//! - Backend-agnostic
//! - Shared by non-streaming and streaming calls
//! - Pure data with no I/O or shared state

pub mod types;

pub use types::{
    Choice, ChunkChoice, CompletionChunk, CompletionRequest, CompletionResponse, ContentPart,
    Delta, EmbeddingRequest, EmbeddingResponse, FinishReason, FunctionCall, ImageDetail, ImageUrl,
    InlineImage, Message, MessageContent, ResponseFormat, Role, ToolCall, ToolCallDelta,
    ToolChoice, ToolDefinition, Usage,
};

pub use types::MessageBuilder;
