use super::types::{
    ChatRequest, ChatResponse, JsonSchemaFormat, Message, OpenAiTool, OpenAiToolCall,
    OpenAiToolCallFunction, OpenAiToolDefinition, ResponseFormat,
};
use crate::llm::scrub::scrub_secret_patterns;
use crate::llm::types::{ContentBlock, MessageRole, ProviderMessage, ProviderResponse, StopReason};
use crate::tools::ToolSpec;
use anyhow::Context;
use serde_json::{Value, json};

pub(in crate::llm) fn build_text_message(role: &'static str, content: String) -> Message {
    Message {
        role,
        content: Some(content),
        tool_call_id: None,
        tool_calls: None,
    }
}

pub(in crate::llm) fn map_provider_message(provider_message: &ProviderMessage) -> Vec<Message> {
    let mut text_parts = Vec::new();
    let mut assistant_tool_calls = Vec::new();
    let mut tool_messages = Vec::new();

    for block in &provider_message.content {
        match block {
            ContentBlock::Text { text } => {
                text_parts.push(scrub_secret_patterns(text).into_owned());
            }
            ContentBlock::ToolUse { id, name, input } => {
                assistant_tool_calls.push(OpenAiToolCall {
                    id: id.clone(),
                    r#type: "function".to_string(),
                    function: OpenAiToolCallFunction {
                        name: name.clone(),
                        arguments: input.to_string(),
                    },
                });
            }
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error: _,
            } => {
                tool_messages.push(Message {
                    role: "tool",
                    content: Some(scrub_secret_patterns(content).into_owned()),
                    tool_call_id: Some(tool_use_id.clone()),
                    tool_calls: None,
                });
            }
        }
    }

    let text_content = if text_parts.is_empty() {
        None
    } else {
        Some(text_parts.join("\n"))
    };

    let mut messages = Vec::new();
    match provider_message.role {
        MessageRole::Assistant => {
            if text_content.is_some() || !assistant_tool_calls.is_empty() {
                messages.push(Message {
                    role: "assistant",
                    content: text_content,
                    tool_call_id: None,
                    tool_calls: if assistant_tool_calls.is_empty() {
                        None
                    } else {
                        Some(assistant_tool_calls)
                    },
                });
            }
        }
        MessageRole::User => {
            if let Some(content) = text_content {
                messages.push(build_text_message("user", content));
            }
        }
        MessageRole::System => {
            if let Some(content) = text_content {
                messages.push(build_text_message("system", content));
            }
        }
        MessageRole::Tool => {}
    }

    messages.extend(tool_messages);
    messages
}

pub(in crate::llm) fn build_openai_tools(tools: &[ToolSpec]) -> Option<Vec<OpenAiTool>> {
    if tools.is_empty() {
        return None;
    }
    Some(
        tools
            .iter()
            .map(|tool| OpenAiTool {
                r#type: "function",
                function: OpenAiToolDefinition {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: tool.parameters.clone(),
                },
            })
            .collect(),
    )
}

pub(in crate::llm) fn build_messages(
    system_prompt: &str,
    messages: &[ProviderMessage],
) -> Vec<Message> {
    let mut openai_messages = vec![build_text_message(
        "system",
        scrub_secret_patterns(system_prompt).into_owned(),
    )];
    for provider_message in messages {
        openai_messages.extend(map_provider_message(provider_message));
    }
    openai_messages
}

pub(in crate::llm) fn router_response_format() -> ResponseFormat {
    ResponseFormat {
        r#type: "json_schema",
        json_schema: JsonSchemaFormat {
            name: "router_schema",
            strict: true,
            schema: json!({
                "type": "object",
                "properties": {
                    "reasoning": {
                        "type": "string",
                        "description": "Step-by-step reasoning behind the classification."
                    },
                    "classification": {
                        "type": "string",
                        "enum": ["ignore", "respond", "notify"],
                        "description": "The classification of an email: 'ignore' for irrelevant emails, 'notify' for important information that doesn't need a response, 'respond' for emails that need a reply"
                    }
                },
                "required": ["reasoning", "classification"],
                "additionalProperties": false
            }),
        },
    }
}

pub(in crate::llm) fn preferences_response_format() -> ResponseFormat {
    ResponseFormat {
        r#type: "json_schema",
        json_schema: JsonSchemaFormat {
            name: "user_preferences",
            strict: true,
            schema: json!({
                "type": "object",
                "properties": {
                    "chain_of_thought": {
                        "type": "string",
                        "description": "Reasoning about which user preferences need to add/update if required"
                    },
                    "user_preferences": {
                        "type": "string",
                        "description": "Updated user preferences"
                    }
                },
                "required": ["chain_of_thought", "user_preferences"],
                "additionalProperties": false
            }),
        },
    }
}

pub(in crate::llm) fn map_finish_reason(finish_reason: Option<&str>) -> StopReason {
    match finish_reason {
        Some("stop") => StopReason::EndTurn,
        Some("tool_calls") => StopReason::ToolUse,
        Some("length") => StopReason::MaxTokens,
        Some(_) | None => StopReason::Error,
    }
}

pub(in crate::llm) fn parse_tool_calls(
    tool_calls: Option<Vec<OpenAiToolCall>>,
    provider_name: &str,
) -> anyhow::Result<Vec<ContentBlock>> {
    tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tool_call| {
            let input: Value =
                serde_json::from_str(&tool_call.function.arguments).with_context(|| {
                    format!(
                        "{provider_name} tool call arguments were not valid JSON for {}",
                        tool_call.function.name
                    )
                })?;
            Ok(ContentBlock::ToolUse {
                id: tool_call.id,
                name: tool_call.function.name,
                input,
            })
        })
        .collect()
}

pub(in crate::llm) fn extract_text(
    chat_response: &ChatResponse,
    provider_name: &str,
) -> anyhow::Result<String> {
    chat_response
        .choices
        .first()
        .and_then(|c| c.message.content.clone())
        .ok_or_else(|| anyhow::anyhow!("No response from {provider_name}"))
}

pub(in crate::llm) fn build_tool_provider_response(
    chat_response: ChatResponse,
    provider_name: &str,
) -> anyhow::Result<ProviderResponse> {
    let choice = chat_response
        .choices
        .first()
        .ok_or_else(|| anyhow::anyhow!("No response from {provider_name}"))?;

    let text = choice.message.content.clone().unwrap_or_default();
    let scrubbed_text = scrub_secret_patterns(&text).into_owned();
    let mut content_blocks = parse_tool_calls(choice.message.tool_calls.clone(), provider_name)?;

    if !scrubbed_text.is_empty() {
        content_blocks.insert(
            0,
            ContentBlock::Text {
                text: scrubbed_text.clone(),
            },
        );
    }

    let mut provider_response = ProviderResponse::text_only(scrubbed_text);
    if let Some(usage) = chat_response.usage.as_ref() {
        provider_response.input_tokens = Some(usage.prompt_tokens);
        provider_response.output_tokens = Some(usage.completion_tokens);
    }
    provider_response.content_blocks = content_blocks;
    provider_response.stop_reason = Some(map_finish_reason(choice.finish_reason.as_deref()));

    if let Some(api_model) = chat_response.model {
        provider_response = provider_response.with_model(api_model);
    }

    Ok(provider_response)
}

pub(in crate::llm) fn build_chat_request(
    model: &str,
    temperature: f64,
    messages: Vec<Message>,
) -> ChatRequest {
    ChatRequest {
        model: model.to_string(),
        messages,
        temperature,
        tools: None,
        tool_choice: None,
        parallel_tool_calls: None,
        response_format: None,
    }
}
