//! Conversion between the canonical protocol and OpenAI format

use super::types::*;
use crate::protocol::{
    Choice, ChunkChoice, CompletionChunk, CompletionRequest, CompletionResponse, ContentPart,
    Delta, EmbeddingRequest, EmbeddingResponse, FinishReason, Message, MessageContent,
    ResponseFormat, Role, ToolCall, ToolCallDelta, ToolChoice, ToolDefinition, Usage,
};
use crate::providers::{ProviderError, ProviderResult};
use serde_json::json;

/// Convert a canonical request to OpenAI format
pub fn to_openai_request(request: &CompletionRequest) -> OpenAIRequest {
    OpenAIRequest {
        model: request.model.clone(),
        messages: request.messages.iter().map(to_openai_message).collect(),
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        top_p: request.top_p,
        n: request.n,
        stop: request.stop.clone(),
        stream: None,
        stream_options: None,
        frequency_penalty: request.frequency_penalty,
        presence_penalty: request.presence_penalty,
        user: request.user.clone(),
        response_format: request.response_format.as_ref().map(to_openai_response_format),
        seed: request.seed,
        tools: request
            .tools
            .as_ref()
            .map(|tools| tools.iter().map(to_openai_tool).collect()),
        tool_choice: request.tool_choice.as_ref().map(to_openai_tool_choice),
    }
}

/// The streaming variant of [`to_openai_request`]
pub fn to_openai_stream_request(request: &CompletionRequest) -> OpenAIRequest {
    let mut openai_request = to_openai_request(request);
    openai_request.stream = Some(true);
    openai_request.stream_options = Some(OpenAIStreamOptions { include_usage: true });
    openai_request
}

/// Convert a canonical message to OpenAI format
fn to_openai_message(message: &Message) -> OpenAIMessage {
    let tool_calls = message.tool_calls.as_ref().filter(|calls| !calls.is_empty());

    // Assistant turns that only carry tool calls send no content
    let content = if tool_calls.is_some() && message.content.is_empty() {
        None
    } else {
        Some(to_openai_content(&message.content))
    };

    OpenAIMessage {
        role: message.role.as_str().to_string(),
        content,
        name: message.name.clone(),
        tool_calls: tool_calls.map(|calls| {
            calls
                .iter()
                .map(|call| OpenAIToolCall {
                    id: call.id.clone(),
                    tool_type: "function".to_string(),
                    function: OpenAIFunctionCall {
                        name: call.function.name.clone(),
                        arguments: call.function.arguments.clone(),
                    },
                })
                .collect()
        }),
        tool_call_id: message.tool_call_id.clone(),
    }
}

/// Convert MessageContent to OpenAI format
fn to_openai_content(content: &MessageContent) -> OpenAIContent {
    match content {
        MessageContent::Text(text) => OpenAIContent::Text(text.clone()),
        MessageContent::Parts(parts) => OpenAIContent::Parts(
            parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text { text } => OpenAIContentPart::Text { text: text.clone() },
                    ContentPart::ImageUrl { image_url } => OpenAIContentPart::ImageUrl {
                        image_url: OpenAIImageUrl {
                            url: image_url.url.clone(),
                            detail: image_url.detail.map(|d| d.as_str().to_string()),
                        },
                    },
                })
                .collect(),
        ),
    }
}

/// Convert ResponseFormat to OpenAI format
fn to_openai_response_format(format: &ResponseFormat) -> serde_json::Value {
    match format {
        ResponseFormat::Text => json!({ "type": "text" }),
        ResponseFormat::JsonObject => json!({ "type": "json_object" }),
        ResponseFormat::JsonSchema { name, schema } => json!({
            "type": "json_schema",
            "json_schema": {
                "name": name.as_deref().unwrap_or("response"),
                "schema": schema,
            }
        }),
    }
}

/// Convert ToolDefinition to OpenAI format
fn to_openai_tool(tool: &ToolDefinition) -> OpenAITool {
    OpenAITool {
        tool_type: "function".to_string(),
        function: OpenAIFunction {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.parameters.clone(),
        },
    }
}

/// Convert ToolChoice to OpenAI format
fn to_openai_tool_choice(choice: &ToolChoice) -> serde_json::Value {
    match choice {
        ToolChoice::Auto => json!("auto"),
        ToolChoice::None => json!("none"),
        ToolChoice::Required => json!("required"),
        ToolChoice::Function { name } => json!({
            "type": "function",
            "function": { "name": name }
        }),
    }
}

/// Map an OpenAI finish reason to the canonical vocabulary
pub fn map_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "length" => FinishReason::Length,
        "tool_calls" | "function_call" => FinishReason::ToolCalls,
        _ => FinishReason::Stop,
    }
}

/// Decode and normalize a response body; `backend` labels decode errors
pub fn normalize(backend: &str, body: &[u8]) -> ProviderResult<CompletionResponse> {
    let response: OpenAIResponse =
        serde_json::from_slice(body).map_err(|e| ProviderError::decode(backend, e))?;
    from_openai_response(backend, response)
}

/// Convert an OpenAI response to canonical format
pub fn from_openai_response(
    backend: &str,
    response: OpenAIResponse,
) -> ProviderResult<CompletionResponse> {
    if response.choices.is_empty() {
        return Err(ProviderError::decode(backend, "response contains no choices"));
    }

    Ok(CompletionResponse {
        id: response.id,
        created: response.created,
        model: response.model,
        choices: response
            .choices
            .into_iter()
            .map(|choice| Choice {
                index: choice.index,
                message: from_openai_message(choice.message),
                finish_reason: choice
                    .finish_reason
                    .as_deref()
                    .map(map_finish_reason)
                    .unwrap_or(FinishReason::Stop),
            })
            .collect(),
        usage: response.usage.and_then(from_openai_usage),
    })
}

fn parse_role(role: &str) -> Role {
    match role {
        "system" | "developer" => Role::System,
        "user" => Role::User,
        "tool" => Role::Tool,
        _ => Role::Assistant,
    }
}

/// Convert an OpenAI message to canonical format
fn from_openai_message(message: OpenAIMessage) -> Message {
    let content = match message.content {
        Some(OpenAIContent::Text(text)) => MessageContent::Text(text),
        Some(OpenAIContent::Parts(parts)) => MessageContent::Parts(
            parts
                .into_iter()
                .map(|part| match part {
                    OpenAIContentPart::Text { text } => ContentPart::Text { text },
                    OpenAIContentPart::ImageUrl { image_url } => {
                        ContentPart::image_url(image_url.url, None)
                    }
                })
                .collect(),
        ),
        None => MessageContent::default(),
    };

    Message {
        role: parse_role(&message.role),
        content,
        name: message.name,
        tool_calls: message.tool_calls.map(|calls| {
            calls
                .into_iter()
                .map(|call| ToolCall::new(call.id, call.function.name, call.function.arguments))
                .collect()
        }),
        tool_call_id: message.tool_call_id,
    }
}

/// Usage is copied only when both counters are present
fn from_openai_usage(usage: OpenAIUsage) -> Option<Usage> {
    Usage::from_counts(usage.prompt_tokens, usage.completion_tokens, usage.total_tokens)
}

/// Convert an OpenAI streaming chunk to canonical format
pub fn from_openai_stream_chunk(chunk: OpenAIStreamChunk) -> CompletionChunk {
    CompletionChunk {
        id: chunk.id,
        model: chunk.model,
        choices: chunk
            .choices
            .into_iter()
            .map(|choice| ChunkChoice {
                index: choice.index,
                delta: from_openai_delta(choice.delta),
                finish_reason: choice.finish_reason.as_deref().map(map_finish_reason),
            })
            .collect(),
        usage: chunk.usage.and_then(from_openai_usage),
    }
}

fn from_openai_delta(delta: OpenAIDelta) -> Delta {
    Delta {
        role: delta.role.as_deref().map(parse_role),
        content: delta.content,
        tool_calls: delta.tool_calls.map(|calls| {
            calls
                .into_iter()
                .map(|call| {
                    let (name, arguments) = match call.function {
                        Some(f) => (f.name, f.arguments),
                        None => (None, None),
                    };
                    ToolCallDelta {
                        index: call.index,
                        id: call.id,
                        name,
                        arguments,
                    }
                })
                .collect()
        }),
    }
}

/// Convert an embedding request to OpenAI format
pub fn to_openai_embedding_request(request: &EmbeddingRequest) -> OpenAIEmbeddingRequest {
    OpenAIEmbeddingRequest {
        model: request.model.clone(),
        input: request.input.clone(),
    }
}

/// Convert an OpenAI embedding response, ordering vectors by input index
pub fn from_openai_embedding_response(response: OpenAIEmbeddingResponse) -> EmbeddingResponse {
    let mut data = response.data;
    data.sort_by_key(|item| item.index);

    EmbeddingResponse {
        model: response.model,
        embeddings: data.into_iter().map(|item| item.embedding).collect(),
        usage: response.usage.and_then(|usage| {
            let prompt = usage.prompt_tokens?;
            Usage::from_counts(Some(prompt), Some(0), usage.total_tokens)
        }),
    }
}
