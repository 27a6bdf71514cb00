//! Converse request body, used for streaming regardless of model family

use crate::protocol::{CompletionRequest, Message, Role, ToolCall, ToolChoice, ToolDefinition};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseRequest {
    pub messages: Vec<ConverseMessage>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub system: Vec<SystemBlock>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub inference_config: Option<InferenceConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_config: Option<ToolConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConverseMessage {
    pub role: String,
    pub content: Vec<ContentBlock>,
}

/// Single-key content union, e.g. `{"text": "..."}`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentBlock {
    Text(String),
    ToolUse(ToolUseBlock),
    ToolResult(ToolResultBlock),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUseBlock {
    pub tool_use_id: String,
    pub name: String,
    pub input: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultBlock {
    pub tool_use_id: String,
    pub content: Vec<ToolResultContent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolResultContent {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemBlock {
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolConfig {
    pub tools: Vec<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,
}

/// Build a Converse body; images are dropped and text parts concatenated
pub fn to_converse_request(request: &CompletionRequest) -> ConverseRequest {
    let mut system = Vec::new();
    let mut messages: Vec<ConverseMessage> = Vec::new();

    for message in &request.messages {
        let (role, blocks) = match message.role {
            Role::System => {
                system.push(SystemBlock {
                    text: message.content.flatten_text(),
                });
                continue;
            }
            Role::User => ("user", text_blocks(message)),
            Role::Assistant => {
                let mut blocks = text_blocks(message);
                blocks.extend(message.tool_calls().iter().map(tool_use));
                ("assistant", blocks)
            }
            Role::Tool => (
                "user",
                vec![ContentBlock::ToolResult(ToolResultBlock {
                    tool_use_id: message.tool_call_id.clone().unwrap_or_default(),
                    content: vec![ToolResultContent {
                        text: message.content.flatten_text(),
                    }],
                })],
            ),
        };

        // Roles must alternate and no turn may be empty
        if blocks.is_empty() {
            continue;
        }
        match messages.last_mut() {
            Some(last) if last.role == role => last.content.extend(blocks),
            _ => messages.push(ConverseMessage {
                role: role.to_string(),
                content: blocks,
            }),
        }
    }

    let inference = InferenceConfig {
        max_tokens: request.max_tokens,
        temperature: request.temperature,
        top_p: request.top_p,
        stop_sequences: request.stop.clone(),
    };

    ConverseRequest {
        messages,
        system,
        inference_config: if inference == InferenceConfig::default() {
            None
        } else {
            Some(inference)
        },
        tool_config: request
            .tools
            .as_ref()
            .filter(|tools| !tools.is_empty())
            .map(|tools| ToolConfig {
                tools: tools.iter().map(tool_spec).collect(),
                tool_choice: request.tool_choice.as_ref().and_then(tool_choice),
            }),
    }
}

fn text_blocks(message: &Message) -> Vec<ContentBlock> {
    let text = message.content.flatten_text();
    if text.is_empty() {
        Vec::new()
    } else {
        vec![ContentBlock::Text(text)]
    }
}

fn tool_use(call: &ToolCall) -> ContentBlock {
    ContentBlock::ToolUse(ToolUseBlock {
        tool_use_id: call.id.clone(),
        name: call.function.name.clone(),
        input: serde_json::from_str(&call.function.arguments).unwrap_or_else(|_| json!({})),
    })
}

fn tool_spec(tool: &ToolDefinition) -> Value {
    let mut spec = json!({
        "name": tool.name,
        "inputSchema": {
            "json": tool.parameters.clone().unwrap_or_else(|| json!({"type": "object", "properties": {}}))
        }
    });
    if let Some(description) = &tool.description {
        spec["description"] = json!(description);
    }
    json!({ "toolSpec": spec })
}

/// Converse has no "none" choice; leaving it out lets the model decide
fn tool_choice(choice: &ToolChoice) -> Option<Value> {
    match choice {
        ToolChoice::Auto => Some(json!({"auto": {}})),
        ToolChoice::Required => Some(json!({"any": {}})),
        ToolChoice::Function { name } => Some(json!({"tool": {"name": name}})),
        ToolChoice::None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converse_shape() {
        let request = CompletionRequest::new(
            "meta.llama3-8b-instruct-v1:0",
            vec![Message::system("Be terse."), Message::user("Hi")],
        )
        .with_max_tokens(100);
        let value = serde_json::to_value(to_converse_request(&request)).unwrap();

        assert_eq!(value["system"][0]["text"], "Be terse.");
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"][0]["text"], "Hi");
        assert_eq!(value["inferenceConfig"]["maxTokens"], 100);
        assert!(value["inferenceConfig"].get("temperature").is_none());
        assert!(value.get("toolConfig").is_none());
    }

    #[test]
    fn test_empty_assistant_turn_dropped() {
        let request = CompletionRequest::new(
            "meta.llama3-8b-instruct-v1:0",
            vec![Message::user("Hi"), Message::assistant(""), Message::user("Still there?")],
        );
        let body = to_converse_request(&request);

        assert_eq!(body.messages.len(), 1);
        assert_eq!(body.messages[0].role, "user");
        assert_eq!(body.messages[0].content.len(), 2);
    }

    #[test]
    fn test_tool_blocks() {
        let request = CompletionRequest::new(
            "anthropic.claude-3-haiku",
            vec![
                Message::user("weather?"),
                Message::assistant_tool_calls(vec![ToolCall::new("t1", "weather", r#"{"city":"Oslo"}"#)]),
                Message::tool("t1", "cold"),
            ],
        )
        .with_tools(vec![ToolDefinition {
            name: "weather".into(),
            description: Some("Look up weather".into()),
            parameters: None,
        }])
        .with_tool_choice(ToolChoice::Required);
        let value = serde_json::to_value(to_converse_request(&request)).unwrap();

        assert_eq!(value["messages"][1]["content"][0]["toolUse"]["toolUseId"], "t1");
        assert_eq!(value["messages"][1]["content"][0]["toolUse"]["input"]["city"], "Oslo");
        assert_eq!(value["messages"][2]["content"][0]["toolResult"]["content"][0]["text"], "cold");
        assert_eq!(value["toolConfig"]["tools"][0]["toolSpec"]["name"], "weather");
        assert_eq!(value["toolConfig"]["toolChoice"], json!({"any": {}}));
        assert!(value.get("inferenceConfig").is_none());
    }
}
