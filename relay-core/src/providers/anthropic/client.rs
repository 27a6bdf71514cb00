//! Anthropic client implementation

use super::converter::{normalize, to_anthropic_request, to_anthropic_stream_request};
use super::streaming;
use crate::config::{BackendConfig, SecretString};
use crate::http::{HttpSender, OutgoingRequest};
use crate::protocol::{CompletionRequest, CompletionResponse};
use crate::providers::{
    encode_body, endpoint, ChatProvider, ProviderCapabilities, ProviderError, ProviderResult,
};
use crate::streaming::ChatStream;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Pinned Messages API version
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API provider
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    name: String,
    api_key: SecretString,
    base_url: String,
    sender: HttpSender,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>, sender: HttpSender) -> Self {
        Self {
            name: "anthropic".to_string(),
            api_key: SecretString::new(api_key.into()),
            base_url: DEFAULT_BASE_URL.to_string(),
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

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn post(&self, body: Vec<u8>) -> OutgoingRequest<'_> {
        OutgoingRequest::post_json(&self.name, endpoint(&self.base_url, "/messages"), body)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
    }
}

#[async_trait]
impl ChatProvider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::default().with_tools().with_vision()
    }

    async fn complete(
        &self,
        request: CompletionRequest,
        cancel: &CancellationToken,
    ) -> ProviderResult<CompletionResponse> {
        let body = encode_body(&self.name, &to_anthropic_request(&request))?;
        let bytes = self.sender.send_bytes(self.post(body), cancel).await?;
        normalize(&self.name, &bytes)
    }

    async fn stream(
        &self,
        request: CompletionRequest,
        cancel: CancellationToken,
    ) -> ProviderResult<ChatStream> {
        let body = encode_body(&self.name, &to_anthropic_stream_request(&request))?;
        let response = self
            .sender
            .send(self.post(body).streaming(), &cancel)
            .await?;

        Ok(ChatStream::new(
            self.name.clone(),
            Box::new(response),
            streaming::decoder(self.name.clone(), request.model),
            cancel,
        ))
    }
}
