use super::error::{WorkflowError, WorkflowResult};
use super::review::ReviewRequest;
use crate::email::Envelope;
use crate::llm::{ProviderMessage, ToolCall};
use crate::preferences::Namespace;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Triage verdict for an incoming email.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Classification {
    Respond,
    Notify,
    Ignore,
}

impl Classification {
    /// Parse the model's raw label. Surrounding whitespace and case are
    /// tolerated; anything outside the three labels is rejected.
    pub fn parse(raw: &str) -> WorkflowResult<Self> {
        Self::from_str(&raw.trim().to_ascii_lowercase())
            .map_err(|_| WorkflowError::InvalidClassification(raw.to_string()))
    }
}

/// Where a workflow instance currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    Triage,
    TriageReview,
    Agent,
    ReviewGate,
    MarkHandled,
    Terminal,
}

/// Lifecycle status recorded with every checkpoint.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    Running,
    Suspended,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Position of the review gate inside the latest proposal batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateCursor {
    /// Index of the assistant message whose proposals are being processed.
    pub message_index: usize,
    /// Next proposal in that message to handle.
    pub next_call: usize,
    /// Call recorded right before execution; cleared with its result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_flight: Option<String>,
    /// A reviewer answered with feedback somewhere in this batch.
    #[serde(default)]
    pub feedback_given: bool,
}

impl GateCursor {
    pub fn at(message_index: usize) -> Self {
        Self {
            message_index,
            ..Self::default()
        }
    }

    pub fn advanced(&self) -> Self {
        Self {
            message_index: self.message_index,
            next_call: self.next_call + 1,
            in_flight: None,
            feedback_given: self.feedback_given,
        }
    }
}

/// Everything the orchestrator knows about one email thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub thread_id: String,
    pub envelope: Envelope,
    #[serde(default)]
    pub messages: Vec<ProviderMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    pub stage: Stage,
    #[serde(default)]
    pub cursor: GateCursor,
    #[serde(default)]
    pub pending: Vec<ReviewRequest>,
    #[serde(default)]
    pub agent_steps: u32,
    /// Call id → arguments it was executed with.
    #[serde(default)]
    pub executed: BTreeMap<String, serde_json::Value>,
    /// Merges dispatched but not yet known to have finished. Replayed when
    /// the thread is picked up again.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending_merges: Vec<PreferenceMerge>,
}

impl ConversationState {
    pub fn new(thread_id: impl Into<String>, envelope: Envelope) -> Self {
        Self {
            thread_id: thread_id.into(),
            envelope,
            messages: Vec::new(),
            classification: None,
            stage: Stage::Triage,
            cursor: GateCursor::default(),
            pending: Vec::new(),
            agent_steps: 0,
            executed: BTreeMap::new(),
            pending_merges: Vec::new(),
        }
    }

    /// Proposals of the batch the gate is working through.
    pub fn gate_calls(&self) -> Vec<ToolCall> {
        self.messages
            .get(self.cursor.message_index)
            .map(ProviderMessage::tool_calls)
            .unwrap_or_default()
    }

    pub fn has_result_for(&self, call_id: &str) -> bool {
        self.messages
            .iter()
            .any(|message| message.tool_result_for(call_id).is_some())
    }

    /// Apply a component's update. Fails without side effects when the
    /// update is inconsistent with the current state.
    pub fn apply(&mut self, update: StateUpdate) -> WorkflowResult<()> {
        if update.classification.is_some() && self.classification.is_some() {
            return Err(WorkflowError::StateTransition(format!(
                "thread {} is already classified",
                self.thread_id
            )));
        }
        if let Some((call_id, _)) = &update.edited_call {
            let index = self.cursor.message_index;
            let has_call = self
                .messages
                .get(index)
                .is_some_and(|message| message.tool_calls().iter().any(|call| &call.id == call_id));
            if !has_call {
                return Err(WorkflowError::StateTransition(format!(
                    "edited call {call_id} is not part of the current batch"
                )));
            }
        }
        if let Some((call_id, _)) = &update.executed
            && self.executed.contains_key(call_id)
        {
            return Err(WorkflowError::StateTransition(format!(
                "call {call_id} was already executed"
            )));
        }

        if let Some(classification) = update.classification {
            self.classification = Some(classification);
        }
        if let Some((call_id, args)) = update.edited_call {
            let index = self.cursor.message_index;
            if let Some(message) = self.messages.get_mut(index) {
                message.replace_tool_input(&call_id, args);
            }
        }
        self.messages.extend(update.messages);
        if let Some((call_id, args)) = update.executed {
            self.executed.insert(call_id, args);
        }
        if let Some(cursor) = update.cursor {
            self.cursor = cursor;
        }
        if let Some(pending) = update.pending {
            self.pending = pending;
        }
        if update.agent_step {
            self.agent_steps += 1;
        }
        Ok(())
    }
}

/// Partial update a component hands back to the orchestrator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub classification: Option<Classification>,
    pub messages: Vec<ProviderMessage>,
    /// Replace the arguments of a call in the current batch.
    pub edited_call: Option<(String, serde_json::Value)>,
    pub executed: Option<(String, serde_json::Value)>,
    pub cursor: Option<GateCursor>,
    pub pending: Option<Vec<ReviewRequest>>,
    pub agent_step: bool,
}

/// Background refinement of one preference profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceMerge {
    pub namespace: Namespace,
    pub rationale: Vec<ProviderMessage>,
}

/// Next stage plus the update and side requests produced on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub goto: Stage,
    pub update: StateUpdate,
    pub merges: Vec<PreferenceMerge>,
}

impl Transition {
    pub fn to(goto: Stage, update: StateUpdate) -> Self {
        Self {
            goto,
            update,
            merges: Vec::new(),
        }
    }

    pub fn with_merge(mut self, namespace: Namespace, rationale: Vec<ProviderMessage>) -> Self {
        self.merges.push(PreferenceMerge {
            namespace,
            rationale,
        });
        self
    }
}
