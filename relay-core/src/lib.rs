//! Relay Core Library
//!
//! Protocol adaptation for LLM backends: one canonical chat request is
//! translated into each backend's wire format, and each backend's response
//! (buffered or streamed) is translated back.
//!
//! ```no_run
//! use relay_core::{config, Gateway, CompletionRequest, Message};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = config::load_from_yaml("relay.yaml")?;
//! let gateway = Gateway::from_config(&config)?;
//!
//! let request = CompletionRequest::new("openai/gpt-4o-mini", vec![Message::user("Hello")]);
//! let mut stream = gateway.stream(request, CancellationToken::new()).await?;
//! while let Some(chunk) = stream.recv().await? {
//!     print!("{}", chunk.text());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod gateway;
pub mod http;
pub mod protocol;
pub mod providers;
pub mod signing;
pub mod streaming;

pub use gateway::Gateway;
pub use protocol::{
    CompletionChunk, CompletionRequest, CompletionResponse, EmbeddingRequest, EmbeddingResponse,
    FinishReason, Message, Usage,
};
pub use providers::{Capability, ChatProvider, ProviderError, ProviderResult};
pub use streaming::{ChatStream, StreamCloser};

/// Returns the version of the Relay Core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
