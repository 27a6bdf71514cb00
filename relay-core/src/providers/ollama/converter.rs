//! Conversion between the canonical protocol and Ollama format

use super::types::*;
use crate::protocol::{
    Choice, ChunkChoice, CompletionChunk, CompletionRequest, CompletionResponse, ContentPart,
    Delta, EmbeddingRequest, EmbeddingResponse, FinishReason, Message, MessageContent,
    ResponseFormat, Role, ToolCall, ToolCallDelta, ToolDefinition, Usage,
};
use crate::providers::{synthetic_id, unix_now, ProviderError, ProviderResult};
use serde::Deserialize;
use serde_json::{json, Value};

/// Convert a canonical request to an `/api/chat` body
pub fn to_ollama_request(request: &CompletionRequest, stream: bool) -> OllamaChatRequest {
    let options = OllamaOptions {
        num_predict: request.max_tokens,
        temperature: request.temperature,
        top_p: request.top_p,
        stop: request.stop.clone(),
        seed: request.seed,
        frequency_penalty: request.frequency_penalty,
        presence_penalty: request.presence_penalty,
    };

    OllamaChatRequest {
        model: request.model.clone(),
        messages: request.messages.iter().map(to_ollama_message).collect(),
        stream,
        format: request.response_format.as_ref().and_then(to_ollama_format),
        options: if options.is_empty() { None } else { Some(options) },
        tools: request
            .tools
            .as_ref()
            .filter(|tools| !tools.is_empty())
            .map(|tools| tools.iter().map(to_ollama_tool).collect()),
    }
}

/// Convert a canonical message; images must be inline data, remote URLs are dropped
fn to_ollama_message(message: &Message) -> OllamaMessage {
    let images: Vec<String> = match &message.content {
        MessageContent::Text(_) => Vec::new(),
        MessageContent::Parts(parts) => parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::ImageUrl { image_url } => {
                    image_url.as_inline().map(|inline| inline.data.to_string())
                }
                ContentPart::Text { .. } => None,
            })
            .collect(),
    };

    let tool_calls: Vec<OllamaToolCall> = message
        .tool_calls()
        .iter()
        .map(|call| OllamaToolCall {
            function: OllamaFunctionCall {
                name: call.function.name.clone(),
                arguments: serde_json::from_str(&call.function.arguments).unwrap_or_else(|_| json!({})),
            },
        })
        .collect();

    OllamaMessage {
        role: message.role.as_str().to_string(),
        content: message.content.flatten_text(),
        images: if images.is_empty() { None } else { Some(images) },
        tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
    }
}

fn to_ollama_format(format: &ResponseFormat) -> Option<Value> {
    match format {
        ResponseFormat::Text => None,
        ResponseFormat::JsonObject => Some(json!("json")),
        ResponseFormat::JsonSchema { schema, .. } => Some(schema.clone()),
    }
}

fn to_ollama_tool(tool: &ToolDefinition) -> OllamaTool {
    OllamaTool {
        tool_type: "function".to_string(),
        function: OllamaFunction {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.parameters.clone(),
        },
    }
}

/// Map an Ollama `done_reason`
pub fn map_done_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("length") => FinishReason::Length,
        _ => FinishReason::Stop,
    }
}

/// Decode a non-streaming response body
pub fn normalize(backend: &str, body: &[u8]) -> ProviderResult<CompletionResponse> {
    let response: OllamaChatResponse = serde_json::from_slice(body)
        .map_err(|e| ProviderError::decode(backend, format!("invalid chat response: {}", e)))?;
    if let Some(error) = response.error {
        return Err(ProviderError::decode(backend, error));
    }
    Ok(from_ollama_response(response))
}

/// Convert an Ollama response into the canonical response
pub fn from_ollama_response(response: OllamaChatResponse) -> CompletionResponse {
    let message = response.message.unwrap_or_default();
    let tool_calls: Vec<ToolCall> = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(i, call)| ToolCall::new(format!("call_{}", i), call.function.name, call.function.arguments.to_string()))
        .collect();

    CompletionResponse {
        id: synthetic_id("chatcmpl"),
        created: parse_created(response.created_at.as_deref()),
        model: response.model,
        choices: vec![Choice {
            index: 0,
            message: Message {
                role: Role::Assistant,
                content: MessageContent::Text(message.content),
                name: None,
                tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
                tool_call_id: None,
            },
            finish_reason: map_done_reason(response.done_reason.as_deref()),
        }],
        usage: Usage::from_counts(response.prompt_eval_count, response.eval_count, None),
    }
}

/// `created_at` is RFC 3339; fall back to now when absent or unparseable
fn parse_created(created_at: Option<&str>) -> i64 {
    created_at
        .and_then(|ts| chrono::DateTime::parse_from_rfc3339(ts).ok())
        .map(|ts| ts.timestamp())
        .unwrap_or_else(unix_now)
}

/// Map one NDJSON stream line to a chunk
///
/// The terminal line (`done: true`) carries the finish reason and usage.
pub fn from_ollama_stream_line(
    backend: &str,
    id: &str,
    line: &Value,
) -> ProviderResult<CompletionChunk> {
    let response = OllamaChatResponse::deserialize(line)
        .map_err(|e| ProviderError::decode(backend, format!("invalid stream line: {}", e)))?;
    if let Some(error) = response.error {
        return Err(ProviderError::decode(backend, format!("stream error: {}", error)));
    }

    let message = response.message.unwrap_or_default();
    let tool_calls: Vec<ToolCallDelta> = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(i, call)| ToolCallDelta {
            index: i as u32,
            id: Some(format!("call_{}", i)),
            name: Some(call.function.name),
            arguments: Some(call.function.arguments.to_string()),
        })
        .collect();

    let (finish_reason, usage) = if response.done {
        (
            Some(map_done_reason(response.done_reason.as_deref())),
            Usage::from_counts(response.prompt_eval_count, response.eval_count, None),
        )
    } else {
        (None, None)
    };

    Ok(CompletionChunk {
        id: id.to_string(),
        model: response.model,
        choices: vec![ChunkChoice {
            index: 0,
            delta: Delta {
                role: None,
                content: if message.content.is_empty() { None } else { Some(message.content) },
                tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
            },
            finish_reason,
        }],
        usage,
    })
}

pub fn to_ollama_embed_request(request: &EmbeddingRequest) -> OllamaEmbedRequest {
    OllamaEmbedRequest {
        model: request.model.clone(),
        input: request.input.clone(),
    }
}

pub fn from_ollama_embed_response(response: OllamaEmbedResponse) -> EmbeddingResponse {
    EmbeddingResponse {
        model: response.model,
        embeddings: response.embeddings,
        usage: response.prompt_eval_count.map(|prompt| Usage::new(prompt, 0)),
    }
}
