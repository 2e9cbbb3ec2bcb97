use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        is_error: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderMessage {
    pub role: MessageRole,
    pub content: Vec<ContentBlock>,
}

/// A tool call proposed by the model: name, arguments and a call id that is
/// unique within the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub text: String,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub model: Option<String>,
    pub content_blocks: Vec<ContentBlock>,
    pub stop_reason: Option<StopReason>,
}

impl ProviderResponse {
    pub fn text_only(text: String) -> Self {
        Self {
            text,
            input_tokens: None,
            output_tokens: None,
            model: None,
            content_blocks: vec![],
            stop_reason: None,
        }
    }

    pub fn with_tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            text: String::new(),
            input_tokens: None,
            output_tokens: None,
            model: None,
            content_blocks: calls
                .into_iter()
                .map(|call| ContentBlock::ToolUse {
                    id: call.id,
                    name: call.name,
                    input: call.input,
                })
                .collect(),
            stop_reason: Some(StopReason::ToolUse),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn has_tool_use(&self) -> bool {
        self.content_blocks
            .iter()
            .any(|block| matches!(block, ContentBlock::ToolUse { .. }))
    }

    pub fn to_assistant_message(&self) -> ProviderMessage {
        if self.content_blocks.is_empty() {
            ProviderMessage::assistant(self.text.clone())
        } else {
            ProviderMessage {
                role: MessageRole::Assistant,
                content: self.content_blocks.clone(),
            }
        }
    }
}

impl ProviderMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    pub fn tool_result(
        tool_use_id: impl Into<String>,
        content: impl Into<String>,
        is_error: bool,
    ) -> Self {
        Self {
            role: MessageRole::Tool,
            content: vec![ContentBlock::ToolResult {
                tool_use_id: tool_use_id.into(),
                content: content.into(),
                is_error,
            }],
        }
    }

    /// Concatenated text blocks, ignoring tool traffic.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::ToolUse { .. } | ContentBlock::ToolResult { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, input } => Some(ToolCall {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                }),
                ContentBlock::Text { .. } | ContentBlock::ToolResult { .. } => None,
            })
            .collect()
    }

    /// Swap the arguments of the tool call `call_id`, keeping its id.
    /// Returns `false` when no such call exists in this message.
    pub fn replace_tool_input(&mut self, call_id: &str, new_input: serde_json::Value) -> bool {
        for block in &mut self.content {
            if let ContentBlock::ToolUse { id, input, .. } = block
                && id == call_id
            {
                *input = new_input;
                return true;
            }
        }
        false
    }

    pub fn tool_result_for(&self, call_id: &str) -> Option<&str> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                ..
            } if tool_use_id == call_id => Some(content.as_str()),
            _ => None,
        })
    }
}

pub fn messages_to_text(messages: &[ProviderMessage]) -> String {
    messages
        .iter()
        .filter_map(|msg| {
            let role_label = match msg.role {
                MessageRole::User => "User:",
                MessageRole::Assistant => "Assistant:",
                MessageRole::System => "System:",
                MessageRole::Tool => "Tool:",
            };
            let text = msg.text();
            if text.is_empty() {
                None
            } else {
                Some(format!("{role_label} {text}"))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::{ContentBlock, MessageRole, ProviderMessage, ProviderResponse, ToolCall};
    use serde_json::json;

    #[test]
    fn content_block_serde_round_trip() {
        let value = json!({
            "type": "tool_use",
            "id": "call_1",
            "name": "write_email",
            "input": {"to": "alice@company.com"}
        });
        let block: ContentBlock = serde_json::from_value(value.clone()).unwrap();
        let serialized = serde_json::to_value(&block).unwrap();
        assert_eq!(serialized, value);
    }

    #[test]
    fn tool_result_uses_tool_role() {
        let message = ProviderMessage::tool_result("call_1", "sent", false);
        assert_eq!(message.role, MessageRole::Tool);
        assert_eq!(message.tool_result_for("call_1"), Some("sent"));
        assert_eq!(message.tool_result_for("call_2"), None);
    }

    #[test]
    fn replace_tool_input_keeps_call_id() {
        let response = ProviderResponse::with_tool_calls(vec![ToolCall {
            id: "call_1".into(),
            name: "write_email".into(),
            input: json!({"content": "draft"}),
        }]);
        let mut message = response.to_assistant_message();

        assert!(message.replace_tool_input("call_1", json!({"content": "edited"})));
        assert!(!message.replace_tool_input("missing", json!({})));

        let calls = message.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].input, json!({"content": "edited"}));
    }

    #[test]
    fn text_only_response_becomes_plain_assistant_message() {
        let response = ProviderResponse::text_only("hello".into());
        assert!(!response.has_tool_use());
        let message = response.to_assistant_message();
        assert_eq!(message.role, MessageRole::Assistant);
        assert_eq!(message.text(), "hello");
        assert!(message.tool_calls().is_empty());
    }

    #[test]
    fn messages_to_text_skips_tool_only_messages() {
        let messages = vec![
            ProviderMessage::user("hi"),
            ProviderMessage::tool_result("call_1", "ok", false),
            ProviderMessage::assistant("there"),
        ];
        assert_eq!(super::messages_to_text(&messages), "User: hi\nAssistant: there");
    }
}
