//! Bedrock runtime client

use super::converse::to_converse_request;
use super::family::ModelFamily;
use crate::config::BackendConfig;
use crate::http::{HttpSender, OutgoingRequest};
use crate::protocol::{CompletionRequest, CompletionResponse};
use crate::providers::anthropic::map_stop_reason;
use crate::providers::{encode_body, ChatProvider, ProviderCapabilities, ProviderError, ProviderResult};
use crate::signing::{AwsCredentials, SigV4Signer};
use crate::streaming::event::EventDecoder;
use crate::streaming::ChatStream;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// SigV4 service name
pub const SIGNING_SERVICE: &str = "bedrock";

/// Regional runtime endpoint
pub fn runtime_endpoint(region: &str) -> String {
    format!("https://bedrock-runtime.{}.amazonaws.com", region)
}

/// AWS Bedrock runtime provider
#[derive(Debug, Clone)]
pub struct BedrockProvider {
    name: String,
    base_url: String,
    signer: SigV4Signer,
    sender: HttpSender,
}

impl BedrockProvider {
    pub fn new(credentials: AwsCredentials, region: impl Into<String>, sender: HttpSender) -> Self {
        let region = region.into();
        Self {
            name: "bedrock".to_string(),
            base_url: runtime_endpoint(&region),
            signer: SigV4Signer::new(credentials, region, SIGNING_SERVICE),
            sender,
        }
    }

    /// Create a provider from a configured backend
    pub fn from_config(config: &BackendConfig, sender: HttpSender) -> ProviderResult<Self> {
        let missing = |field: &str| ProviderError::Configuration(format!("{}: {} is required", config.name, field));

        let region = config.region.as_deref().ok_or_else(|| missing("region"))?;
        let access_key_id = config.access_key_id.as_deref().ok_or_else(|| missing("access_key_id"))?;
        let secret_access_key = config
            .secret_access_key
            .as_ref()
            .ok_or_else(|| missing("secret_access_key"))?;

        let mut credentials = AwsCredentials::new(access_key_id, secret_access_key.expose_secret());
        if let Some(token) = config.session_token.as_ref().filter(|token| !token.is_empty()) {
            credentials = credentials.with_session_token(token.expose_secret());
        }

        let mut provider = Self::new(credentials, region, sender).with_name(&config.name);
        if let Some(base_url) = &config.base_url {
            provider = provider.with_base_url(base_url);
        }
        Ok(provider)
    }

    /// Override the regional endpoint (VPC endpoints, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn region(&self) -> &str {
        self.signer.region()
    }

    fn model_url(&self, model: &str, action: &str) -> String {
        format!(
            "{}/model/{}/{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(model),
            action
        )
    }

    fn family(&self, model: &str) -> ProviderResult<ModelFamily> {
        ModelFamily::detect(model).ok_or_else(|| {
            ProviderError::InvalidRequest(format!(
                "{}: unsupported model family for '{}'",
                self.name, model
            ))
        })
    }

    fn post(&self, url: String, body: Vec<u8>) -> OutgoingRequest<'_> {
        OutgoingRequest::post_json(&self.name, url, body).signed_by(&self.signer)
    }
}

#[async_trait]
impl ChatProvider for BedrockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::default()
    }

    async fn complete(
        &self,
        request: CompletionRequest,
        cancel: &CancellationToken,
    ) -> ProviderResult<CompletionResponse> {
        let family = self.family(&request.model)?;
        debug!(backend = %self.name, model = %request.model, family = %family, "invoking model");

        let body = encode_body(&self.name, &family.transform(&request))?;
        let bytes = self
            .sender
            .send_bytes(self.post(self.model_url(&request.model, "invoke"), body), cancel)
            .await?;
        family.normalize(&self.name, &request.model, &bytes)
    }

    async fn stream(
        &self,
        request: CompletionRequest,
        cancel: CancellationToken,
    ) -> ProviderResult<ChatStream> {
        self.family(&request.model)?;

        let body = encode_body(&self.name, &to_converse_request(&request))?;
        let response = self
            .sender
            .send(
                self.post(self.model_url(&request.model, "converse-stream"), body)
                    .streaming(),
                &cancel,
            )
            .await?;

        let decoder = EventDecoder::new(self.name.clone(), request.model, map_stop_reason);
        Ok(ChatStream::new(self.name.clone(), Box::new(response), Box::new(decoder), cancel))
    }
}
