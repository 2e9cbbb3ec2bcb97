use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub(in crate::llm) struct ChatRequest {
    pub(in crate::llm) model: String,
    pub(in crate::llm) messages: Vec<Message>,
    pub(in crate::llm) temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(in crate::llm) tools: Option<Vec<OpenAiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(in crate::llm) tool_choice: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(in crate::llm) parallel_tool_calls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(in crate::llm) response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
pub(in crate::llm) struct ResponseFormat {
    pub(in crate::llm) r#type: &'static str,
    pub(in crate::llm) json_schema: JsonSchemaFormat,
}

#[derive(Debug, Serialize)]
pub(in crate::llm) struct JsonSchemaFormat {
    pub(in crate::llm) name: &'static str,
    pub(in crate::llm) strict: bool,
    pub(in crate::llm) schema: Value,
}

#[derive(Debug, Serialize)]
pub(in crate::llm) struct Message {
    pub(in crate::llm) role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(in crate::llm) content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(in crate::llm) tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(in crate::llm) tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Debug, Clone, Serialize)]
pub(in crate::llm) struct OpenAiTool {
    pub(in crate::llm) r#type: &'static str,
    pub(in crate::llm) function: OpenAiToolDefinition,
}

#[derive(Debug, Clone, Serialize)]
pub(in crate::llm) struct OpenAiToolDefinition {
    pub(in crate::llm) name: String,
    pub(in crate::llm) description: String,
    pub(in crate::llm) parameters: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(in crate::llm) struct OpenAiToolCall {
    pub(in crate::llm) id: String,
    pub(in crate::llm) r#type: String,
    pub(in crate::llm) function: OpenAiToolCallFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(in crate::llm) struct OpenAiToolCallFunction {
    pub(in crate::llm) name: String,
    pub(in crate::llm) arguments: String,
}

#[derive(Debug, Deserialize)]
pub(in crate::llm) struct ChatResponse {
    pub(in crate::llm) choices: Vec<Choice>,
    pub(in crate::llm) usage: Option<Usage>,
    pub(in crate::llm) model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(in crate::llm) struct Usage {
    pub(in crate::llm) prompt_tokens: u64,
    pub(in crate::llm) completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
pub(in crate::llm) struct Choice {
    pub(in crate::llm) message: ResponseMessage,
    pub(in crate::llm) finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(in crate::llm) struct ResponseMessage {
    pub(in crate::llm) content: Option<String>,
    pub(in crate::llm) tool_calls: Option<Vec<OpenAiToolCall>>,
}

/// Structured output of the preference merge call.
#[derive(Debug, Deserialize)]
pub(in crate::llm) struct UserPreferences {
    #[serde(default)]
    pub(in crate::llm) chain_of_thought: String,
    pub(in crate::llm) user_preferences: String,
}
