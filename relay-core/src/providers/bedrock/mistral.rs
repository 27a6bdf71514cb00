//! Mistral models on Bedrock

use crate::protocol::{Choice, CompletionRequest, CompletionResponse, FinishReason, Message, Role};
use crate::providers::{synthetic_id, unix_now, ProviderError, ProviderResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_TOKENS: u32 = 512;

#[derive(Debug, Clone, Serialize)]
pub struct MistralRequest {
    pub prompt: String,
    pub max_tokens: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MistralResponse {
    #[serde(default)]
    pub outputs: Vec<MistralOutput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MistralOutput {
    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub stop_reason: Option<String>,
}

pub fn transform(request: &CompletionRequest) -> MistralRequest {
    MistralRequest {
        prompt: build_prompt(&request.messages),
        max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        temperature: request.temperature,
        top_p: request.top_p,
        stop: request.stop.clone(),
    }
}

/// `[INST]` template; system text is folded into the next user turn
pub fn build_prompt(messages: &[Message]) -> String {
    let mut prompt = String::from("<s>");
    let mut system = String::new();

    for message in messages {
        let text = message.content.flatten_text();
        match message.role {
            Role::System => {
                if !system.is_empty() {
                    system.push_str("\n\n");
                }
                system.push_str(&text);
            }
            Role::User | Role::Tool => {
                prompt.push_str("[INST] ");
                if !system.is_empty() {
                    prompt.push_str(&system);
                    prompt.push_str("\n\n");
                    system.clear();
                }
                prompt.push_str(&text);
                prompt.push_str(" [/INST]");
            }
            Role::Assistant => {
                prompt.push(' ');
                prompt.push_str(&text);
                prompt.push_str("</s>");
            }
        }
    }

    // A trailing system prompt still has to reach the model
    if !system.is_empty() {
        prompt.push_str("[INST] ");
        prompt.push_str(&system);
        prompt.push_str(" [/INST]");
    }
    prompt
}

pub fn map_stop_reason(reason: &str) -> FinishReason {
    match reason {
        "length" => FinishReason::Length,
        _ => FinishReason::Stop,
    }
}

pub fn normalize(backend: &str, model: &str, body: &[u8]) -> ProviderResult<CompletionResponse> {
    let response: MistralResponse = serde_json::from_slice(body)
        .map_err(|e| ProviderError::decode(backend, format!("invalid mistral response: {}", e)))?;

    let output = response
        .outputs
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::decode(backend, "mistral response has no outputs"))?;

    Ok(CompletionResponse {
        id: synthetic_id("chatcmpl"),
        created: unix_now(),
        model: model.to_string(),
        choices: vec![Choice {
            index: 0,
            message: Message::assistant(output.text),
            finish_reason: output
                .stop_reason
                .as_deref()
                .map(map_stop_reason)
                .unwrap_or(FinishReason::Stop),
        }],
        usage: None,
    })
}
