//! Bedrock model families
//!
//! Each family speaks its own invoke body. The family is picked once from the
//! model id and then drives both directions of the conversion.

use super::{anthropic, meta, mistral, titan};
use crate::protocol::{CompletionRequest, CompletionResponse};
use crate::providers::anthropic::AnthropicRequest;
use crate::providers::ProviderResult;
use serde::Serialize;

/// Cross-region inference profile prefixes
const CROSS_REGION_PREFIXES: [&str; 3] = ["us.", "eu.", "apac."];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFamily {
    Anthropic,
    Meta,
    Titan,
    Mistral,
}

/// Invoke body of one family
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum NativeRequest {
    Anthropic(AnthropicRequest),
    Meta(meta::MetaRequest),
    Titan(titan::TitanRequest),
    Mistral(mistral::MistralRequest),
}

impl ModelFamily {
    /// Detect the family from a model id such as `anthropic.claude-3-haiku-20240307-v1:0`
    pub fn detect(model_id: &str) -> Option<Self> {
        match vendor_prefix(model_id) {
            "anthropic" => Some(ModelFamily::Anthropic),
            "meta" => Some(ModelFamily::Meta),
            "amazon" => Some(ModelFamily::Titan),
            "mistral" => Some(ModelFamily::Mistral),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFamily::Anthropic => "anthropic",
            ModelFamily::Meta => "meta",
            ModelFamily::Titan => "titan",
            ModelFamily::Mistral => "mistral",
        }
    }

    /// Build the invoke body
    pub fn transform(&self, request: &CompletionRequest) -> NativeRequest {
        match self {
            ModelFamily::Anthropic => NativeRequest::Anthropic(anthropic::transform(request)),
            ModelFamily::Meta => NativeRequest::Meta(meta::transform(request)),
            ModelFamily::Titan => NativeRequest::Titan(titan::transform(request)),
            ModelFamily::Mistral => NativeRequest::Mistral(mistral::transform(request)),
        }
    }

    /// Decode an invoke response; `model` fills in for bodies that do not echo it
    pub fn normalize(
        &self,
        backend: &str,
        model: &str,
        body: &[u8],
    ) -> ProviderResult<CompletionResponse> {
        match self {
            ModelFamily::Anthropic => anthropic::normalize(backend, model, body),
            ModelFamily::Meta => meta::normalize(backend, model, body),
            ModelFamily::Titan => titan::normalize(backend, model, body),
            ModelFamily::Mistral => mistral::normalize(backend, model, body),
        }
    }
}

impl std::fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text before the first `.`, after dropping a cross-region prefix
pub fn vendor_prefix(model_id: &str) -> &str {
    let id = CROSS_REGION_PREFIXES
        .iter()
        .find_map(|prefix| model_id.strip_prefix(prefix))
        .unwrap_or(model_id);
    id.split('.').next().unwrap_or(id)
}
