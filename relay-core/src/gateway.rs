//! Name-based dispatch over the configured backends
//!
//! A model id of the form `backend/model` selects a backend explicitly and is
//! stripped to `model` before dispatch, provided `backend` is registered. Any
//! other id, including ones like `meta-llama/Llama-3-8b-instruct`, goes to the
//! default backend whole. Capabilities are checked here, before any backend is called.

use crate::config::{BackendType, GatewayConfig, SafeLogging};
use crate::http::HttpSender;
use crate::protocol::{
    CompletionRequest, CompletionResponse, ContentPart, EmbeddingRequest, EmbeddingResponse,
    MessageContent,
};
use crate::providers::{
    AnthropicProvider, BedrockProvider, Capability, ChatProvider, OllamaProvider, OpenAIProvider,
    ProviderError, ProviderResult,
};
use crate::streaming::ChatStream;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Routes canonical requests to registered backends
#[derive(Default)]
pub struct Gateway {
    backends: HashMap<String, Arc<dyn ChatProvider>>,
    default_models: HashMap<String, String>,
    default_backend: Option<String>,
}

impl Gateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every configured backend over one shared HTTP sender
    pub fn from_config(config: &GatewayConfig) -> ProviderResult<Self> {
        let sender = HttpSender::with_config(&config.connection)?;
        let mut gateway = Self::new();

        for backend in &config.backends {
            let provider: Arc<dyn ChatProvider> = match backend.backend_type {
                BackendType::OpenAI => Arc::new(OpenAIProvider::from_config(backend, sender.clone())?),
                BackendType::Anthropic => {
                    Arc::new(AnthropicProvider::from_config(backend, sender.clone())?)
                }
                BackendType::Ollama => Arc::new(OllamaProvider::from_config(backend, sender.clone())),
                BackendType::Bedrock => Arc::new(BedrockProvider::from_config(backend, sender.clone())?),
            };

            info!(backend = %backend.safe_for_logging(), "registered backend");
            gateway.register(provider);
            if let Some(model) = &backend.default_model {
                gateway.set_default_model(&backend.name, model);
            }
        }

        if let Some(name) = &config.default_backend {
            gateway.set_default_backend(name)?;
        }
        Ok(gateway)
    }

    /// Register a backend under its own name, replacing any previous one
    pub fn register(&mut self, provider: Arc<dyn ChatProvider>) -> &mut Self {
        self.backends.insert(provider.name().to_string(), provider);
        self
    }

    pub fn set_default_backend(&mut self, name: &str) -> ProviderResult<&mut Self> {
        if !self.backends.contains_key(name) {
            return Err(ProviderError::Configuration(format!(
                "default backend '{}' is not registered",
                name
            )));
        }
        self.default_backend = Some(name.to_string());
        Ok(self)
    }

    /// Model used when a request routed to `backend` names none
    pub fn set_default_model(&mut self, backend: &str, model: &str) -> &mut Self {
        self.default_models.insert(backend.to_string(), model.to_string());
        self
    }

    pub fn backend(&self, name: &str) -> Option<Arc<dyn ChatProvider>> {
        self.backends.get(name).cloned()
    }

    /// Registered backend names, sorted
    pub fn backend_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.backends.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Non-streaming completion
    pub async fn complete(
        &self,
        mut request: CompletionRequest,
        cancel: &CancellationToken,
    ) -> ProviderResult<CompletionResponse> {
        let (provider, model) = self.resolve(&request.model)?;
        request.model = model;
        check_request(provider.as_ref(), &request, Capability::Chat)?;
        provider.complete(request, cancel).await
    }

    /// Streaming completion
    pub async fn stream(
        &self,
        mut request: CompletionRequest,
        cancel: CancellationToken,
    ) -> ProviderResult<ChatStream> {
        let (provider, model) = self.resolve(&request.model)?;
        request.model = model;
        check_request(provider.as_ref(), &request, Capability::Streaming)?;
        provider.stream(request, cancel).await
    }

    /// Text embeddings
    pub async fn embed(
        &self,
        mut request: EmbeddingRequest,
        cancel: &CancellationToken,
    ) -> ProviderResult<EmbeddingResponse> {
        let (provider, model) = self.resolve(&request.model)?;
        request.model = model;
        require(provider.as_ref(), Capability::Embeddings)?;
        provider.embed(request, cancel).await
    }

    /// Pick the backend for a model id and return the backend-local model
    fn resolve(&self, model: &str) -> ProviderResult<(Arc<dyn ChatProvider>, String)> {
        let (name, model) = match model.split_once('/') {
            Some((prefix, rest)) if self.backends.contains_key(prefix) => (prefix, rest),
            _ => (self.default_name()?, model),
        };

        let provider = self.backends.get(name).cloned().ok_or_else(|| {
            ProviderError::Configuration(format!("unknown backend '{}'", name))
        })?;

        let model = if model.is_empty() {
            self.default_models.get(name).cloned().ok_or_else(|| {
                ProviderError::InvalidRequest(format!("no model given and '{}' has no default model", name))
            })?
        } else {
            model.to_string()
        };

        debug!(backend = name, model = %model, "resolved backend");
        Ok((provider, model))
    }

    fn default_name(&self) -> ProviderResult<&str> {
        if let Some(name) = &self.default_backend {
            return Ok(name.as_str());
        }
        let mut names = self.backends.keys();
        match (names.next(), names.next()) {
            (Some(only), None) => Ok(only.as_str()),
            (None, _) => Err(ProviderError::Configuration("no backends registered".to_string())),
            _ => Err(ProviderError::Configuration(
                "model has no backend prefix and no default backend is set".to_string(),
            )),
        }
    }
}

fn require(provider: &dyn ChatProvider, capability: Capability) -> ProviderResult<()> {
    if provider.capabilities().supports(capability) {
        Ok(())
    } else {
        Err(ProviderError::unsupported(provider.name(), capability))
    }
}

/// Check the operation itself plus what the request content needs
fn check_request(
    provider: &dyn ChatProvider,
    request: &CompletionRequest,
    operation: Capability,
) -> ProviderResult<()> {
    require(provider, operation)?;
    if request.tools.as_ref().is_some_and(|tools| !tools.is_empty()) {
        require(provider, Capability::Tools)?;
    }
    if request.messages.iter().any(|message| has_images(&message.content)) {
        require(provider, Capability::Vision)?;
    }
    Ok(())
}

fn has_images(content: &MessageContent) -> bool {
    match content {
        MessageContent::Text(_) => false,
        MessageContent::Parts(parts) => parts
            .iter()
            .any(|part| matches!(part, ContentPart::ImageUrl { .. })),
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("backends", &self.backend_names())
            .field("default_backend", &self.default_backend)
            .finish()
    }
}
