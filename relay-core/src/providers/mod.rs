//! Backend adapters
//!
//! Every backend implements [`ChatProvider`]. Internally each one is split
//! into a request transformer (canonical request to native JSON), a response
//! normalizer (native JSON back to canonical) and a sender that drives the
//! HTTP exchange through the shared [`crate::http::HttpSender`].

pub mod anthropic;
pub mod bedrock;
pub mod capabilities;
pub mod error;
pub mod ollama;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use bedrock::BedrockProvider;
pub use capabilities::{Capability, ProviderCapabilities};
pub use error::{BackendError, BackendErrorKind, ProviderError, ProviderResult};
pub use ollama::OllamaProvider;
pub use openai::OpenAIProvider;

use crate::protocol::{CompletionRequest, CompletionResponse, EmbeddingRequest, EmbeddingResponse};
use crate::streaming::ChatStream;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// A chat backend
///
/// Callers should consult [`ChatProvider::capabilities`] before dispatch;
/// [`crate::Gateway`] does so for every call.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Backend name, used in errors and logs
    fn name(&self) -> &str;

    /// Fixed capability record
    fn capabilities(&self) -> ProviderCapabilities;

    /// Non-streaming chat completion
    async fn complete(
        &self,
        request: CompletionRequest,
        cancel: &CancellationToken,
    ) -> ProviderResult<CompletionResponse>;

    /// Streaming chat completion; the returned stream reads lazily
    async fn stream(
        &self,
        request: CompletionRequest,
        cancel: CancellationToken,
    ) -> ProviderResult<ChatStream>;

    /// Text embeddings
    async fn embed(
        &self,
        request: EmbeddingRequest,
        cancel: &CancellationToken,
    ) -> ProviderResult<EmbeddingResponse> {
        let _ = (request, cancel);
        Err(ProviderError::unsupported(self.name(), Capability::Embeddings))
    }
}

/// Join a base URL and an endpoint path without doubling the slash
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Serialize a native request body
pub(crate) fn encode_body<T: serde::Serialize>(backend: &str, body: &T) -> ProviderResult<Vec<u8>> {
    serde_json::to_vec(body)
        .map_err(|e| ProviderError::InvalidRequest(format!("{}: cannot encode request: {}", backend, e)))
}

/// Seconds since the unix epoch, for responses that carry no timestamp
pub(crate) fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Synthesized response id for responses that carry none
pub(crate) fn synthetic_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}
