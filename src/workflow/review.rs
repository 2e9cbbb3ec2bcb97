//! Review requests, reviewer decisions and the gate that applies them.
//!
//! The gate walks the proposals of the latest agent batch in order. Plain
//! tools run straight away, reviewable ones suspend the thread until a
//! decision arrives, and the terminal marker only gets a stub result.

use super::error::{WorkflowError, WorkflowResult};
use super::state::{ConversationState, GateCursor, PreferenceMerge, Stage, StateUpdate, Transition};
use crate::email::{format_email_markdown, format_for_display};
use crate::llm::{ProviderMessage, ToolCall};
use crate::preferences::Namespace;
use crate::prompt::MEMORY_UPDATE_REINFORCEMENT;
use crate::tools::{ReviewConfig, ReviewKind, ToolRegistry};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const NOTIFY_ACTION: &str = "Email Assistant: notify";

pub(crate) const OUTCOME_UNKNOWN: &str =
    "Execution was interrupted before a result was recorded; the outcome is unknown. Do not retry this action.";
pub(crate) const SKIPPED: &str = "Skipped: the user ended the workflow before this action ran.";

/// What a human is asked to decide on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub action: String,
    pub args: serde_json::Value,
    pub config: ReviewConfig,
    pub description: String,
}

/// A reviewer's answer to one request.
///
/// Wire shape is `{"type": "accept"}`, `{"type": "edit", "args": {"args": {..}}}`,
/// `{"type": "respond", "args": "feedback"}` or `{"type": "ignore"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "args", rename_all = "snake_case")]
pub enum ReviewDecision {
    Accept,
    Edit {
        args: serde_json::Value,
    },
    #[serde(alias = "response")]
    Respond(String),
    Ignore,
}

impl ReviewDecision {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Edit { .. } => "edit",
            Self::Respond(_) => "respond",
            Self::Ignore => "ignore",
        }
    }

    pub fn permitted_by(&self, config: ReviewConfig) -> bool {
        match self {
            Self::Accept => config.allow_accept,
            Self::Edit { .. } => config.allow_edit,
            Self::Respond(_) => config.allow_respond,
            Self::Ignore => config.allow_ignore,
        }
    }
}

fn ensure_permitted(decision: &ReviewDecision, request: &ReviewRequest) -> WorkflowResult<()> {
    if decision.permitted_by(request.config) {
        Ok(())
    } else {
        Err(WorkflowError::InvalidReviewDecision(format!(
            "'{}' is not allowed for {}",
            decision.kind(),
            request.action
        )))
    }
}

/// A proposal cleared to run.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Execution {
    /// The call with the arguments it must run with.
    pub call: ToolCall,
    /// Set when a reviewer replaced the arguments.
    pub edited: bool,
    pub merges: Vec<PreferenceMerge>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum GateStep {
    Settle(Transition),
    Execute(Execution),
    Suspend(ReviewRequest),
}

pub(crate) fn notify_request(state: &ConversationState) -> ReviewRequest {
    ReviewRequest {
        action: NOTIFY_ACTION.to_string(),
        args: json!({}),
        config: ReviewConfig::RESPOND_OR_IGNORE,
        description: format_email_markdown(&state.envelope),
    }
}

/// Apply the reviewer's answer to a notify-classified email.
pub(crate) fn resolve_notify(
    state: &ConversationState,
    decision: &ReviewDecision,
) -> WorkflowResult<Transition> {
    let request = state
        .pending
        .first()
        .ok_or_else(|| WorkflowError::NoPendingReview(state.thread_id.clone()))?;
    ensure_permitted(decision, request)?;

    let notice = ProviderMessage::user(format!(
        "Email to notify user about: {}",
        format_email_markdown(&state.envelope)
    ));
    match decision {
        ReviewDecision::Respond(feedback) => {
            let messages = vec![
                notice,
                ProviderMessage::user(format!(
                    "User wants to reply to the email. Use this feedback to respond: {feedback}"
                )),
            ];
            let mut rationale = vec![ProviderMessage::user(
                "The user decided to respond to the email, so update the triage preferences to capture this.",
            )];
            rationale.extend(messages.iter().cloned());
            Ok(Transition::to(
                Stage::Agent,
                StateUpdate {
                    messages,
                    pending: Some(Vec::new()),
                    ..StateUpdate::default()
                },
            )
            .with_merge(Namespace::Triage, rationale))
        }
        ReviewDecision::Ignore => {
            let messages = vec![
                notice,
                ProviderMessage::user(
                    "The user decided to ignore the email even though it was classified as notify. Update triage preferences to capture this.",
                ),
            ];
            Ok(Transition::to(
                Stage::Terminal,
                StateUpdate {
                    messages: messages.clone(),
                    pending: Some(Vec::new()),
                    ..StateUpdate::default()
                },
            )
            .with_merge(Namespace::Triage, messages))
        }
        ReviewDecision::Accept | ReviewDecision::Edit { .. } => Err(
            WorkflowError::InvalidReviewDecision(format!("'{}' on notify", decision.kind())),
        ),
    }
}

/// Decide what happens to the next proposal of the current batch.
pub(crate) fn next_step(state: &ConversationState, tools: &ToolRegistry) -> WorkflowResult<GateStep> {
    if let Some(call_id) = &state.cursor.in_flight {
        tracing::warn!(
            thread_id = %state.thread_id,
            call_id = %call_id,
            "found interrupted tool call; reporting unknown outcome"
        );
        let messages = if state.has_result_for(call_id) {
            Vec::new()
        } else {
            vec![ProviderMessage::tool_result(call_id.clone(), OUTCOME_UNKNOWN, true)]
        };
        return Ok(GateStep::Settle(Transition::to(
            Stage::ReviewGate,
            StateUpdate {
                messages,
                cursor: Some(state.cursor.advanced()),
                ..StateUpdate::default()
            },
        )));
    }

    let calls = state.gate_calls();
    let Some(call) = calls.get(state.cursor.next_call) else {
        return Ok(GateStep::Settle(route_after_batch(state, &calls, tools)));
    };
    let tool = tools
        .get(&call.name)
        .ok_or_else(|| WorkflowError::UnknownToolName(call.name.clone()))?;

    if tool.is_terminal() {
        return Ok(GateStep::Settle(Transition::to(
            Stage::ReviewGate,
            StateUpdate {
                messages: vec![ProviderMessage::tool_result(call.id.clone(), "Done", false)],
                cursor: Some(state.cursor.advanced()),
                ..StateUpdate::default()
            },
        )));
    }

    Ok(match tool.review_kind() {
        None => GateStep::Execute(Execution {
            call: call.clone(),
            edited: false,
            merges: Vec::new(),
        }),
        Some(kind) => GateStep::Suspend(ReviewRequest {
            action: call.name.clone(),
            args: call.input.clone(),
            config: kind.allowed(),
            description: format!(
                "{}{}",
                format_email_markdown(&state.envelope),
                format_for_display(call)
            ),
        }),
    })
}

fn route_after_batch(state: &ConversationState, calls: &[ToolCall], tools: &ToolRegistry) -> Transition {
    let finished = calls
        .iter()
        .any(|call| tools.get(&call.name).is_some_and(|tool| tool.is_terminal()));
    let goto = if !state.cursor.feedback_given && finished {
        Stage::MarkHandled
    } else {
        Stage::Agent
    };
    Transition::to(goto, StateUpdate::default())
}

/// Apply a reviewer's decision to the suspended proposal.
pub(crate) fn resolve(
    state: &ConversationState,
    tools: &ToolRegistry,
    decision: ReviewDecision,
) -> WorkflowResult<GateStep> {
    let request = state
        .pending
        .first()
        .ok_or_else(|| WorkflowError::NoPendingReview(state.thread_id.clone()))?;
    let calls = state.gate_calls();
    let call = calls.get(state.cursor.next_call).ok_or_else(|| {
        WorkflowError::StateTransition(format!(
            "thread {} has a pending review but no proposal under review",
            state.thread_id
        ))
    })?;
    let kind = tools
        .get(&call.name)
        .ok_or_else(|| WorkflowError::UnknownToolName(call.name.clone()))?
        .review_kind()
        .ok_or_else(|| {
            WorkflowError::StateTransition(format!("{} does not take review decisions", call.name))
        })?;
    ensure_permitted(&decision, request)?;

    match decision {
        ReviewDecision::Accept => Ok(GateStep::Execute(Execution {
            call: call.clone(),
            edited: false,
            merges: Vec::new(),
        })),
        ReviewDecision::Edit { args } => {
            if !args.is_object() {
                return Err(WorkflowError::InvalidReviewDecision(
                    "edited arguments must be a JSON object".to_string(),
                ));
            }
            let merges = kind
                .namespace()
                .map(|namespace| PreferenceMerge {
                    namespace,
                    rationale: vec![ProviderMessage::user(edit_rationale(kind, &call.input, &args))],
                })
                .into_iter()
                .collect();
            Ok(GateStep::Execute(Execution {
                call: ToolCall {
                    input: args,
                    ..call.clone()
                },
                edited: true,
                merges,
            }))
        }
        ReviewDecision::Respond(feedback) => {
            let result = ProviderMessage::tool_result(call.id.clone(), feedback_result(kind, &feedback), false);
            let cursor = GateCursor {
                feedback_given: true,
                ..state.cursor.advanced()
            };
            let mut transition = Transition::to(
                Stage::ReviewGate,
                StateUpdate {
                    messages: vec![result.clone()],
                    cursor: Some(cursor),
                    pending: Some(Vec::new()),
                    ..StateUpdate::default()
                },
            );
            if let Some(namespace) = kind.namespace() {
                let mut rationale = state.messages.clone();
                rationale.push(result);
                rationale.push(ProviderMessage::user(format!(
                    "User gave feedback, which we can use to update the {}. Follow all instructions above, and remember: {MEMORY_UPDATE_REINFORCEMENT}.",
                    namespace_phrase(namespace)
                )));
                transition = transition.with_merge(namespace, rationale);
            }
            Ok(GateStep::Settle(transition))
        }
        ReviewDecision::Ignore => {
            let result = ProviderMessage::tool_result(call.id.clone(), ignore_result(kind), false);
            let mut messages = vec![result.clone()];
            messages.extend(
                calls
                    .iter()
                    .skip(state.cursor.next_call + 1)
                    .map(|skipped| ProviderMessage::tool_result(skipped.id.clone(), SKIPPED, false)),
            );
            let mut rationale = state.messages.clone();
            rationale.push(result);
            rationale.push(ProviderMessage::user(ignore_triage_rationale(kind)));
            Ok(GateStep::Settle(
                Transition::to(
                    Stage::Terminal,
                    StateUpdate {
                        messages,
                        cursor: Some(GateCursor {
                            next_call: calls.len(),
                            ..state.cursor.advanced()
                        }),
                        pending: Some(Vec::new()),
                        ..StateUpdate::default()
                    },
                )
                .with_merge(Namespace::Triage, rationale),
            ))
        }
    }
}

fn namespace_phrase(namespace: Namespace) -> &'static str {
    match namespace {
        Namespace::Triage => "triage preferences",
        Namespace::Response => "response preferences",
        Namespace::Calendar => "calendar preferences",
    }
}

fn edit_rationale(kind: ReviewKind, initial: &serde_json::Value, edited: &serde_json::Value) -> String {
    let (what, item) = match kind {
        ReviewKind::ScheduleMeeting => ("the calendar invitation", "calendar invitation"),
        ReviewKind::SendEmail | ReviewKind::Question => ("the email response", "email"),
    };
    format!(
        "User edited {what}. Here is the initial {item} generated by the assistant: {initial}. Here is the edited {item}: {edited}. Follow all instructions above, and remember: {MEMORY_UPDATE_REINFORCEMENT}."
    )
}

fn feedback_result(kind: ReviewKind, feedback: &str) -> String {
    match kind {
        ReviewKind::SendEmail => {
            format!("User gave feedback, which we can incorporate into the email. Feedback: {feedback}")
        }
        ReviewKind::ScheduleMeeting => format!(
            "User gave feedback, which we can incorporate into the meeting request. Feedback: {feedback}"
        ),
        ReviewKind::Question => format!(
            "User answered the question, which we can use for any follow up actions. Feedback: {feedback}"
        ),
    }
}

fn ignore_result(kind: ReviewKind) -> &'static str {
    match kind {
        ReviewKind::SendEmail => "User ignored this email draft. Ignore this email and end the workflow.",
        ReviewKind::ScheduleMeeting => {
            "User ignored this calendar meeting draft. Ignore this email and end the workflow."
        }
        ReviewKind::Question => "User ignored this question. Ignore this email and end the workflow.",
    }
}

fn ignore_triage_rationale(kind: ReviewKind) -> String {
    let lead = match kind {
        ReviewKind::SendEmail => {
            "The user ignored the email draft. That means they did not want to respond to the email."
        }
        ReviewKind::ScheduleMeeting => {
            "The user ignored the calendar meeting draft. That means they did not want to schedule a meeting for this email."
        }
        ReviewKind::Question => {
            "The user ignored the Question. That means they did not want to answer the question or deal with this email."
        }
    };
    format!(
        "{lead} Update the triage preferences to ensure emails of this type are not classified as respond. Follow all instructions above, and remember: {MEMORY_UPDATE_REINFORCEMENT}."
    )
}
