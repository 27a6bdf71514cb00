//! Amazon Titan text models on Bedrock

use crate::protocol::{
    Choice, CompletionRequest, CompletionResponse, FinishReason, Message, Role, Usage,
};
use crate::providers::{synthetic_id, unix_now, ProviderError, ProviderResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_TOKEN_COUNT: u32 = 512;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TitanRequest {
    pub input_text: String,
    pub text_generation_config: TitanGenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TitanGenerationConfig {
    pub max_token_count: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitanResponse {
    #[serde(default)]
    pub input_text_token_count: Option<u32>,

    #[serde(default)]
    pub results: Vec<TitanResult>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitanResult {
    #[serde(default)]
    pub token_count: Option<u32>,

    #[serde(default)]
    pub output_text: String,

    #[serde(default)]
    pub completion_reason: Option<String>,
}

pub fn transform(request: &CompletionRequest) -> TitanRequest {
    TitanRequest {
        input_text: build_prompt(&request.messages),
        text_generation_config: TitanGenerationConfig {
            max_token_count: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKEN_COUNT),
            temperature: request.temperature,
            top_p: request.top_p,
            stop_sequences: request.stop.clone(),
        },
    }
}

/// `User:`/`Bot:` transcript ending with an open `Bot:` turn
pub fn build_prompt(messages: &[Message]) -> String {
    let mut lines = Vec::with_capacity(messages.len() + 1);
    for message in messages {
        let text = message.content.flatten_text();
        lines.push(match message.role {
            Role::System => text,
            Role::User | Role::Tool => format!("User: {}", text),
            Role::Assistant => format!("Bot: {}", text),
        });
    }
    lines.push("Bot:".to_string());
    lines.join("\n")
}

pub fn map_completion_reason(reason: &str) -> FinishReason {
    match reason {
        "LENGTH" => FinishReason::Length,
        // FINISH, CONTENT_FILTERED
        _ => FinishReason::Stop,
    }
}

pub fn normalize(backend: &str, model: &str, body: &[u8]) -> ProviderResult<CompletionResponse> {
    let response: TitanResponse = serde_json::from_slice(body)
        .map_err(|e| ProviderError::decode(backend, format!("invalid titan response: {}", e)))?;

    let result = response
        .results
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::decode(backend, "titan response has no results"))?;

    Ok(CompletionResponse {
        id: synthetic_id("chatcmpl"),
        created: unix_now(),
        model: model.to_string(),
        choices: vec![Choice {
            index: 0,
            message: Message::assistant(result.output_text),
            finish_reason: result
                .completion_reason
                .as_deref()
                .map(map_completion_reason)
                .unwrap_or(FinishReason::Stop),
        }],
        usage: Usage::from_counts(response.input_text_token_count, result.token_count, None),
    })
}
