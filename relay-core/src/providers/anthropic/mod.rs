//! Anthropic provider implementation
//!
//! Adapter for the Messages API. The request conversion is shared with the
//! Bedrock `anthropic.*` model family.

mod client;
pub mod converter;
pub mod streaming;
pub mod types;

pub use client::{AnthropicProvider, ANTHROPIC_VERSION, DEFAULT_BASE_URL};
pub use converter::map_stop_reason;
pub use types::{AnthropicRequest, AnthropicResponse};
