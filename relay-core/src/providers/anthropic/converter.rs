//! Conversion between the canonical protocol and the Anthropic Messages format

use super::types::*;
use crate::protocol::{
    Choice, CompletionRequest, CompletionResponse, ContentPart, FinishReason, Message,
    MessageContent, Role, ToolCall, ToolChoice, ToolDefinition, Usage,
};
use crate::providers::{synthetic_id, unix_now, ProviderError, ProviderResult};
use serde_json::{json, Value};

/// `max_tokens` is mandatory for Anthropic; used when the caller leaves it unset
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Convert a canonical request to Anthropic format
pub fn to_anthropic_request(request: &CompletionRequest) -> AnthropicRequest {
    let (system, messages) = to_anthropic_messages(&request.messages);

    AnthropicRequest {
        model: Some(request.model.clone()),
        anthropic_version: None,
        messages,
        system,
        max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        temperature: request.temperature,
        top_p: request.top_p,
        stop_sequences: request.stop.clone(),
        stream: None,
        tools: request
            .tools
            .as_ref()
            .filter(|tools| !tools.is_empty())
            .map(|tools| tools.iter().map(to_anthropic_tool).collect()),
        tool_choice: request.tool_choice.as_ref().map(to_anthropic_tool_choice),
    }
}

/// The streaming variant of [`to_anthropic_request`]
pub fn to_anthropic_stream_request(request: &CompletionRequest) -> AnthropicRequest {
    let mut anthropic_request = to_anthropic_request(request);
    anthropic_request.stream = Some(true);
    anthropic_request
}

/// Split out the system prompt and convert the remaining turns
///
/// System messages are joined into the top-level `system` string. Tool
/// results travel as user turns, and adjacent turns of the same role are
/// merged because the API requires strict alternation. Turns without any
/// content are dropped.
pub fn to_anthropic_messages(messages: &[Message]) -> (Option<String>, Vec<AnthropicMessage>) {
    let mut system = Vec::new();
    let mut turns: Vec<AnthropicMessage> = Vec::new();

    for message in messages {
        let (role, blocks) = match message.role {
            Role::System => {
                system.push(message.content.flatten_text());
                continue;
            }
            Role::User => ("user", to_anthropic_blocks(&message.content)),
            Role::Assistant => {
                let mut blocks = to_anthropic_blocks(&message.content);
                blocks.extend(message.tool_calls().iter().map(to_tool_use));
                ("assistant", blocks)
            }
            Role::Tool => (
                "user",
                vec![AnthropicContentBlock::ToolResult {
                    tool_use_id: message.tool_call_id.clone().unwrap_or_default(),
                    content: message.content.flatten_text(),
                }],
            ),
        };

        if blocks.is_empty() {
            continue;
        }
        match turns.last_mut() {
            Some(last) if last.role == role => last.content.extend(blocks),
            _ => turns.push(AnthropicMessage {
                role: role.to_string(),
                content: blocks,
            }),
        }
    }

    let system = if system.is_empty() {
        None
    } else {
        Some(system.join("\n\n"))
    };
    (system, turns)
}

fn to_anthropic_blocks(content: &MessageContent) -> Vec<AnthropicContentBlock> {
    match content {
        MessageContent::Text(text) if text.is_empty() => Vec::new(),
        MessageContent::Text(text) => vec![AnthropicContentBlock::Text { text: text.clone() }],
        MessageContent::Parts(parts) => parts
            .iter()
            .map(|part| match part {
                ContentPart::Text { text } => AnthropicContentBlock::Text { text: text.clone() },
                ContentPart::ImageUrl { image_url } => {
                    let source = match image_url.as_inline() {
                        Some(inline) => AnthropicImageSource::Base64 {
                            media_type: inline.media_type.to_string(),
                            data: inline.data.to_string(),
                        },
                        None => AnthropicImageSource::Url {
                            url: image_url.url.clone(),
                        },
                    };
                    AnthropicContentBlock::Image { source }
                }
            })
            .collect(),
    }
}

fn to_tool_use(call: &ToolCall) -> AnthropicContentBlock {
    // Arguments that are not valid JSON degrade to an empty input object
    let input = serde_json::from_str(&call.function.arguments).unwrap_or_else(|_| json!({}));
    AnthropicContentBlock::ToolUse {
        id: call.id.clone(),
        name: call.function.name.clone(),
        input,
    }
}

fn to_anthropic_tool(tool: &ToolDefinition) -> AnthropicTool {
    AnthropicTool {
        name: tool.name.clone(),
        description: tool.description.clone(),
        input_schema: tool
            .parameters
            .clone()
            .unwrap_or_else(|| json!({"type": "object", "properties": {}})),
    }
}

fn to_anthropic_tool_choice(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::Auto => json!({"type": "auto"}),
        ToolChoice::None => json!({"type": "none"}),
        ToolChoice::Required => json!({"type": "any"}),
        ToolChoice::Function { name } => json!({"type": "tool", "name": name}),
    }
}

/// Map an Anthropic `stop_reason` to the canonical vocabulary
pub fn map_stop_reason(reason: &str) -> FinishReason {
    match reason {
        "max_tokens" => FinishReason::Length,
        "tool_use" => FinishReason::ToolCalls,
        // end_turn, stop_sequence, pause_turn, refusal
        _ => FinishReason::Stop,
    }
}

/// Decode a response body into the canonical response
pub fn normalize(backend: &str, body: &[u8]) -> ProviderResult<CompletionResponse> {
    let response: AnthropicResponse = serde_json::from_slice(body)
        .map_err(|e| ProviderError::decode(backend, format!("invalid messages response: {}", e)))?;
    Ok(from_anthropic_response(response))
}

/// Convert an Anthropic response into the canonical response
pub fn from_anthropic_response(response: AnthropicResponse) -> CompletionResponse {
    let mut text = String::new();
    let mut tool_calls = Vec::new();

    for block in response.content {
        match block {
            AnthropicContentBlock::Text { text: part } => text.push_str(&part),
            AnthropicContentBlock::ToolUse { id, name, input } => {
                tool_calls.push(ToolCall::new(id, name, input.to_string()))
            }
            _ => {}
        }
    }

    let finish_reason = response
        .stop_reason
        .as_deref()
        .map(map_stop_reason)
        .unwrap_or(FinishReason::Stop);

    let id = if response.id.is_empty() {
        synthetic_id("msg")
    } else {
        response.id
    };

    CompletionResponse {
        id,
        created: unix_now(),
        model: response.model,
        choices: vec![Choice {
            index: 0,
            message: Message {
                role: Role::Assistant,
                content: MessageContent::Text(text),
                name: None,
                tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
                tool_call_id: None,
            },
            finish_reason,
        }],
        usage: response
            .usage
            .and_then(|usage| Usage::from_counts(usage.input_tokens, usage.output_tokens, None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ImageDetail;

    #[test]
    fn test_system_prompt_is_lifted() {
        let request = CompletionRequest::new(
            "claude-3-5-sonnet",
            vec![
                Message::system("Be brief."),
                Message::system("Answer in French."),
                Message::user("Hello"),
            ],
        );
        let body = to_anthropic_request(&request);

        assert_eq!(body.system.as_deref(), Some("Be brief.\n\nAnswer in French."));
        assert_eq!(body.messages.len(), 1);
        assert_eq!(body.messages[0].role, "user");
        assert_eq!(body.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_empty_assistant_turn_dropped() {
        let request = CompletionRequest::new(
            "claude",
            vec![Message::user("Hi"), Message::assistant(""), Message::user("Hello?")],
        );
        let body = to_anthropic_request(&request);

        assert_eq!(body.messages.len(), 1);
        assert_eq!(body.messages[0].content.len(), 2);
        assert!(body.messages.iter().all(|turn| !turn.content.is_empty()));
    }

    #[test]
    fn test_optional_fields_omitted() {
        let request = CompletionRequest::new("claude", vec![Message::user("hi")]);
        let value = serde_json::to_value(to_anthropic_request(&request)).unwrap();
        let obj = value.as_object().unwrap();

        assert!(!obj.contains_key("temperature"));
        assert!(!obj.contains_key("system"));
        assert!(!obj.contains_key("tools"));
        assert!(!obj.contains_key("stream"));
        assert_eq!(obj["max_tokens"], 4096);
    }

    #[test]
    fn test_tool_round_trip_shapes() {
        let request = CompletionRequest::new(
            "claude",
            vec![
                Message::user("weather?"),
                Message::assistant_tool_calls(vec![ToolCall::new(
                    "toolu_1",
                    "get_weather",
                    r#"{"city":"Paris"}"#,
                )]),
                Message::tool("toolu_1", "sunny"),
                Message::tool("toolu_2", "warm"),
            ],
        );
        let body = serde_json::to_value(to_anthropic_request(&request)).unwrap();
        let messages = body["messages"].as_array().unwrap();

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1]["content"][0]["type"], "tool_use");
        assert_eq!(messages[1]["content"][0]["input"]["city"], "Paris");
        // Both tool results merge into one user turn
        assert_eq!(messages[2]["role"], "user");
        assert_eq!(messages[2]["content"].as_array().unwrap().len(), 2);
        assert_eq!(messages[2]["content"][0]["tool_use_id"], "toolu_1");
    }

    #[test]
    fn test_image_sources() {
        let message = Message {
            role: Role::User,
            content: MessageContent::Parts(vec![
                ContentPart::text("what is this?"),
                ContentPart::image_url("data:image/png;base64,AAAA", None),
                ContentPart::image_url("https://example.com/cat.jpg", Some(ImageDetail::Low)),
            ]),
            name: None,
            tool_calls: None,
            tool_call_id: None,
        };
        let (_, turns) = to_anthropic_messages(&[message]);
        let blocks = &turns[0].content;

        assert_eq!(
            blocks[1],
            AnthropicContentBlock::Image {
                source: AnthropicImageSource::Base64 {
                    media_type: "image/png".into(),
                    data: "AAAA".into()
                }
            }
        );
        assert!(matches!(
            &blocks[2],
            AnthropicContentBlock::Image { source: AnthropicImageSource::Url { url } } if url.ends_with("cat.jpg")
        ));
    }

    #[test]
    fn test_tool_choice_mapping() {
        assert_eq!(to_anthropic_tool_choice(&ToolChoice::Required), json!({"type": "any"}));
        assert_eq!(
            to_anthropic_tool_choice(&ToolChoice::Function { name: "f".into() }),
            json!({"type": "tool", "name": "f"})
        );
    }

    #[test]
    fn test_normalize_response() {
        let body = br#"{
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "model": "claude-3-5-sonnet",
            "content": [
                {"type": "text", "text": "Let me check."},
                {"type": "tool_use", "id": "toolu_1", "name": "get_weather", "input": {"city": "Paris"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 12, "output_tokens": 7}
        }"#;
        let response = normalize("anthropic", body).unwrap();

        assert_eq!(response.id, "msg_01");
        assert_eq!(response.text(), "Let me check.");
        assert_eq!(response.choices[0].finish_reason, FinishReason::ToolCalls);
        let calls = response.choices[0].message.tool_calls();
        assert_eq!(calls[0].function.name, "get_weather");
        assert_eq!(calls[0].function.arguments, r#"{"city":"Paris"}"#);
        assert_eq!(response.usage, Some(Usage::new(12, 7)));
    }

    #[test]
    fn test_unknown_blocks_ignored() {
        let body = br#"{"id":"m","model":"c","content":[{"type":"thinking","thinking":"hmm"},{"type":"text","text":"ok"}],"stop_reason":"end_turn"}"#;
        let response = normalize("anthropic", body).unwrap();
        assert_eq!(response.text(), "ok");
        assert_eq!(response.usage, None);
    }

    #[test]
    fn test_malformed_body() {
        let err = normalize("anthropic", b"not json").unwrap_err();
        assert!(matches!(err, ProviderError::Decode { .. }));
    }
}
