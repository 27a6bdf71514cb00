//! Ollama client implementation

use super::converter::{
    from_ollama_embed_response, from_ollama_stream_line, normalize, to_ollama_embed_request,
    to_ollama_request,
};
use super::types::OllamaEmbedResponse;
use crate::config::BackendConfig;
use crate::http::{HttpSender, OutgoingRequest};
use crate::protocol::{CompletionRequest, CompletionResponse, EmbeddingRequest, EmbeddingResponse};
use crate::providers::{
    encode_body, endpoint, synthetic_id, ChatProvider, ProviderCapabilities, ProviderResult,
};
use crate::streaming::ndjson::NdjsonDecoder;
use crate::streaming::ChatStream;
use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Default local server
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Ollama provider; the server is unauthenticated
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    name: String,
    base_url: String,
    sender: HttpSender,
}

impl OllamaProvider {
    pub fn new(sender: HttpSender) -> Self {
        Self {
            name: "ollama".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            sender,
        }
    }

    pub fn from_config(config: &BackendConfig, sender: HttpSender) -> Self {
        let mut provider = Self::new(sender).with_name(&config.name);
        if let Some(base_url) = &config.base_url {
            provider = provider.with_base_url(base_url);
        }
        provider
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn post(&self, path: &str, body: Vec<u8>) -> OutgoingRequest<'_> {
        OutgoingRequest::post_json(&self.name, endpoint(&self.base_url, path), body)
    }
}

#[async_trait]
impl ChatProvider for OllamaProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::default()
            .with_embeddings()
            .with_tools()
            .with_vision()
    }

    async fn complete(
        &self,
        request: CompletionRequest,
        cancel: &CancellationToken,
    ) -> ProviderResult<CompletionResponse> {
        let body = encode_body(&self.name, &to_ollama_request(&request, false))?;
        let bytes = self.sender.send_bytes(self.post("/api/chat", body), cancel).await?;
        normalize(&self.name, &bytes)
    }

    async fn stream(
        &self,
        request: CompletionRequest,
        cancel: CancellationToken,
    ) -> ProviderResult<ChatStream> {
        let body = encode_body(&self.name, &to_ollama_request(&request, true))?;
        let response = self
            .sender
            .send(self.post("/api/chat", body).streaming(), &cancel)
            .await?;

        let backend = self.name.clone();
        let id = synthetic_id("chatcmpl");
        let decoder = NdjsonDecoder::new(self.name.clone(), move |line: &Value| {
            from_ollama_stream_line(&backend, &id, line)
        });

        Ok(ChatStream::new(self.name.clone(), Box::new(response), Box::new(decoder), cancel))
    }

    async fn embed(
        &self,
        request: EmbeddingRequest,
        cancel: &CancellationToken,
    ) -> ProviderResult<EmbeddingResponse> {
        let body = encode_body(&self.name, &to_ollama_embed_request(&request))?;
        let response: OllamaEmbedResponse = self
            .sender
            .send_json(self.post("/api/embed", body), cancel)
            .await?;
        Ok(from_ollama_embed_response(response))
    }
}
