use super::context::AssistantContext;
use super::error::{WorkflowError, WorkflowResult};
use super::state::{ConversationState, GateCursor, Stage, StateUpdate, Transition};
use crate::llm::ToolChoice;
use crate::preferences::Namespace;
use crate::prompt::{
    AgentPromptInputs, DEFAULT_CALENDAR_PREFERENCES, DEFAULT_RESPONSE_PREFERENCES,
    agent_system_prompt,
};
use chrono::Local;
use tracing::debug;

/// One model turn: propose the next batch of tool calls.
pub(crate) async fn propose(
    ctx: &AssistantContext,
    state: &ConversationState,
) -> WorkflowResult<Transition> {
    let limit = ctx.profile.max_agent_steps;
    if state.agent_steps >= limit {
        return Err(WorkflowError::StepLimitExceeded(limit));
    }

    let response_preferences = ctx
        .preferences
        .get_or_default(Namespace::Response, DEFAULT_RESPONSE_PREFERENCES)
        .await
        .map_err(WorkflowError::Storage)?;
    let cal_preferences = ctx
        .preferences
        .get_or_default(Namespace::Calendar, DEFAULT_CALENDAR_PREFERENCES)
        .await
        .map_err(WorkflowError::Storage)?;

    let tools_prompt = ctx.tools.tools_prompt();
    let today = Local::now().format("%Y-%m-%d").to_string();
    let system_prompt = agent_system_prompt(&AgentPromptInputs {
        tools_prompt: &tools_prompt,
        background: &ctx.profile.background,
        response_preferences: &response_preferences,
        cal_preferences: &cal_preferences,
        today: &today,
    })
    .map_err(WorkflowError::Model)?;

    let specs = ctx.tools.specs();
    let response = ctx
        .model
        .generate_with_tools(&system_prompt, &state.messages, &specs, ToolChoice::Required)
        .await
        .map_err(WorkflowError::Model)?;

    let message = response.to_assistant_message();
    let calls = message.tool_calls();
    if calls.is_empty() {
        return Err(WorkflowError::EmptyToolCalls);
    }
    let mut only_terminal = true;
    for call in &calls {
        let tool = ctx
            .tools
            .get(&call.name)
            .ok_or_else(|| WorkflowError::UnknownToolName(call.name.clone()))?;
        only_terminal &= tool.is_terminal();
    }
    debug!(
        thread_id = %state.thread_id,
        step = state.agent_steps + 1,
        tools = ?calls.iter().map(|call| call.name.as_str()).collect::<Vec<_>>(),
        "agent proposed tool calls"
    );

    let goto = if only_terminal {
        Stage::MarkHandled
    } else {
        Stage::ReviewGate
    };
    Ok(Transition::to(
        goto,
        StateUpdate {
            messages: vec![message],
            cursor: Some(GateCursor::at(state.messages.len())),
            agent_step: true,
            ..StateUpdate::default()
        },
    ))
}
