//! Ollama provider implementation
//!
//! Non-streaming and NDJSON streaming chat against `/api/chat`, embeddings
//! against `/api/embed`.

mod client;
pub mod converter;
pub mod types;

pub use client::{OllamaProvider, DEFAULT_BASE_URL};
pub use types::{OllamaChatRequest, OllamaChatResponse};
