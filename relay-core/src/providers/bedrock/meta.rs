//! Meta Llama models on Bedrock
//!
//! Llama takes a single prompt string in the Llama 3 chat template.

use crate::protocol::{
    Choice, CompletionRequest, CompletionResponse, FinishReason, Message, Role, Usage,
};
use crate::providers::{synthetic_id, unix_now, ProviderError, ProviderResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_GEN_LEN: u32 = 512;

#[derive(Debug, Clone, Serialize)]
pub struct MetaRequest {
    pub prompt: String,
    pub max_gen_len: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetaResponse {
    #[serde(default)]
    pub generation: String,

    #[serde(default)]
    pub prompt_token_count: Option<u32>,

    #[serde(default)]
    pub generation_token_count: Option<u32>,

    #[serde(default)]
    pub stop_reason: Option<String>,
}

pub fn transform(request: &CompletionRequest) -> MetaRequest {
    MetaRequest {
        prompt: build_prompt(&request.messages),
        max_gen_len: request.max_tokens.unwrap_or(DEFAULT_MAX_GEN_LEN),
        temperature: request.temperature,
        top_p: request.top_p,
    }
}

/// Render the conversation and open an assistant header for the reply
pub fn build_prompt(messages: &[Message]) -> String {
    let mut prompt = String::from("<|begin_of_text|>");
    for message in messages {
        let role = match message.role {
            Role::Tool => "ipython",
            role => role.as_str(),
        };
        prompt.push_str("<|start_header_id|>");
        prompt.push_str(role);
        prompt.push_str("<|end_header_id|>\n\n");
        prompt.push_str(&message.content.flatten_text());
        prompt.push_str("<|eot_id|>");
    }
    prompt.push_str("<|start_header_id|>assistant<|end_header_id|>\n\n");
    prompt
}

pub fn map_stop_reason(reason: &str) -> FinishReason {
    match reason {
        "length" => FinishReason::Length,
        _ => FinishReason::Stop,
    }
}

pub fn normalize(backend: &str, model: &str, body: &[u8]) -> ProviderResult<CompletionResponse> {
    let response: MetaResponse = serde_json::from_slice(body)
        .map_err(|e| ProviderError::decode(backend, format!("invalid llama response: {}", e)))?;

    Ok(CompletionResponse {
        id: synthetic_id("chatcmpl"),
        created: unix_now(),
        model: model.to_string(),
        choices: vec![Choice {
            index: 0,
            message: Message::assistant(response.generation),
            finish_reason: response
                .stop_reason
                .as_deref()
                .map(map_stop_reason)
                .unwrap_or(FinishReason::Stop),
        }],
        usage: Usage::from_counts(response.prompt_token_count, response.generation_token_count, None),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_template() {
        let prompt = build_prompt(&[Message::system("Be terse."), Message::user("Hi")]);
        assert_eq!(
            prompt,
            "<|begin_of_text|>\
             <|start_header_id|>system<|end_header_id|>\n\nBe terse.<|eot_id|>\
             <|start_header_id|>user<|end_header_id|>\n\nHi<|eot_id|>\
             <|start_header_id|>assistant<|end_header_id|>\n\n"
        );
    }

    #[test]
    fn test_default_gen_len() {
        let request = CompletionRequest::new("meta.llama3-8b-instruct-v1:0", vec![Message::user("hi")]);
        let value = serde_json::to_value(transform(&request)).unwrap();
        assert_eq!(value["max_gen_len"], 512);
        assert!(value.get("temperature").is_none());
    }

    #[test]
    fn test_normalize() {
        let body = br#"{"generation":"Hello","prompt_token_count":10,"generation_token_count":3,"stop_reason":"length"}"#;
        let response = normalize("bedrock", "meta.llama3", body).unwrap();
        assert_eq!(response.text(), "Hello");
        assert_eq!(response.model, "meta.llama3");
        assert_eq!(response.choices[0].finish_reason, FinishReason::Length);
        assert_eq!(response.usage, Some(Usage::new(10, 3)));
    }
}
