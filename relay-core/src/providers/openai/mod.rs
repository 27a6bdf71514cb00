//! OpenAI provider implementation
//!
//! This module provides an adapter for the OpenAI chat completions API and
//! for servers that speak the same protocol under another base URL.

mod client;
pub mod converter;
pub mod streaming;
pub mod types;

pub use client::{OpenAIProvider, DEFAULT_BASE_URL};
pub use types::{OpenAIRequest, OpenAIResponse, OpenAIStreamChunk};
