//! Anthropic models on Bedrock
//!
//! The Messages body minus `model` and `stream`, pinned to the Bedrock API
//! version. Responses use the Messages response shape unchanged.

use crate::protocol::{CompletionRequest, CompletionResponse};
use crate::providers::anthropic::converter::{normalize as normalize_messages, to_anthropic_request};
use crate::providers::anthropic::AnthropicRequest;
use crate::providers::ProviderResult;

pub const BEDROCK_ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

pub fn transform(request: &CompletionRequest) -> AnthropicRequest {
    let mut body = to_anthropic_request(request);
    body.model = None;
    body.anthropic_version = Some(BEDROCK_ANTHROPIC_VERSION.to_string());
    body
}

pub fn normalize(backend: &str, model: &str, body: &[u8]) -> ProviderResult<CompletionResponse> {
    let mut response = normalize_messages(backend, body)?;
    if response.model.is_empty() {
        response.model = model.to_string();
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Message;

    #[test]
    fn test_body_has_version_and_no_model() {
        let request = CompletionRequest::new("anthropic.claude-3-haiku", vec![Message::user("hi")]);
        let value = serde_json::to_value(transform(&request)).unwrap();

        assert_eq!(value["anthropic_version"], BEDROCK_ANTHROPIC_VERSION);
        assert_eq!(value["max_tokens"], 4096);
        assert!(value.get("model").is_none());
        assert!(value.get("stream").is_none());
    }
}
