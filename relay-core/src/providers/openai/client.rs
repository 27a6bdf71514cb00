//! OpenAI client implementation

use super::converter::{
    from_openai_embedding_response, normalize, to_openai_embedding_request, to_openai_request,
    to_openai_stream_request,
};
use super::streaming;
use super::types::OpenAIEmbeddingResponse;
use crate::config::{BackendConfig, SecretString};
use crate::http::{HttpSender, OutgoingRequest};
use crate::protocol::{CompletionRequest, CompletionResponse, EmbeddingRequest, EmbeddingResponse};
use crate::providers::{
    encode_body, endpoint, ChatProvider, ProviderCapabilities, ProviderError, ProviderResult,
};
use crate::streaming::ChatStream;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI (or OpenAI-compatible) provider
#[derive(Debug, Clone)]
pub struct OpenAIProvider {
    name: String,
    api_key: SecretString,
    base_url: String,
    organization: Option<String>,
    sender: HttpSender,
}

impl OpenAIProvider {
    /// Create a provider against the public API
    pub fn new(api_key: impl Into<String>, sender: HttpSender) -> Self {
        Self {
            name: "openai".to_string(),
            api_key: SecretString::new(api_key.into()),
            base_url: DEFAULT_BASE_URL.to_string(),
            organization: None,
            sender,
        }
    }

    /// Create a provider from a configured backend
    pub fn from_config(config: &BackendConfig, sender: HttpSender) -> ProviderResult<Self> {
        let api_key = config
            .api_key
            .as_ref()
            .ok_or_else(|| ProviderError::Configuration(format!("{}: api_key is required", config.name)))?;

        let mut provider = Self::new(api_key.expose_secret(), sender).with_name(&config.name);
        if let Some(base_url) = &config.base_url {
            provider = provider.with_base_url(base_url);
        }
        Ok(provider)
    }

    /// Point at an OpenAI-compatible endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    /// Build a POST with the authentication headers attached
    fn post(&self, path: &str, body: Vec<u8>) -> OutgoingRequest<'_> {
        let mut request = OutgoingRequest::post_json(&self.name, endpoint(&self.base_url, path), body)
            .header("authorization", format!("Bearer {}", self.api_key.expose_secret()));
        if let Some(org) = &self.organization {
            request = request.header("openai-organization", org);
        }
        request
    }
}

#[async_trait]
impl ChatProvider for OpenAIProvider {
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
        let body = encode_body(&self.name, &to_openai_request(&request))?;
        let bytes = self
            .sender
            .send_bytes(self.post("/chat/completions", body), cancel)
            .await?;
        normalize(&self.name, &bytes)
    }

    async fn stream(
        &self,
        request: CompletionRequest,
        cancel: CancellationToken,
    ) -> ProviderResult<ChatStream> {
        let body = encode_body(&self.name, &to_openai_stream_request(&request))?;
        let response = self
            .sender
            .send(self.post("/chat/completions", body).streaming(), &cancel)
            .await?;

        Ok(ChatStream::new(
            self.name.clone(),
            Box::new(response),
            streaming::decoder(self.name.clone()),
            cancel,
        ))
    }

    async fn embed(
        &self,
        request: EmbeddingRequest,
        cancel: &CancellationToken,
    ) -> ProviderResult<EmbeddingResponse> {
        let body = encode_body(&self.name, &to_openai_embedding_request(&request))?;
        let response: OpenAIEmbeddingResponse = self
            .sender
            .send_json(self.post("/embeddings", body), cancel)
            .await?;
        Ok(from_openai_embedding_response(response))
    }
}
