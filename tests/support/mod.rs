#![allow(dead_code)]

use mailsteward::email::Envelope;
use mailsteward::llm::{
    ContentBlock, ModelCapability, ProviderMessage, ProviderResponse, RouterDecision, ToolCall, ToolChoice,
};
use mailsteward::preferences::{InMemoryPreferenceStore, PreferenceStore};
use mailsteward::providers::{Collaborators, SimulatedCalendar, SimulatedMail, WorkingHours};
use mailsteward::tools::ToolSpec;
use mailsteward::workflow::{
    AssistantContext, AssistantProfile, CheckpointStore, InMemoryCheckpointStore, WorkflowEngine,
};
use serde_json::Value;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

pub const USER_ADDRESS: &str = "lance@company.com";
pub const SOURCE_ID: &str = "msg-1001";

/// Model stand-in that replays a fixed classification and a queue of
/// tool-call batches, recording what it was shown.
pub struct ScriptedModel {
    classification: String,
    batches: Mutex<VecDeque<Vec<ToolCall>>>,
    seen: Mutex<Vec<Vec<ProviderMessage>>>,
    merge_prompts: Mutex<Vec<String>>,
    repeat_last: bool,
    fail_on_turn: Option<usize>,
}

impl ScriptedModel {
    pub fn new(classification: &str, batches: Vec<Vec<ToolCall>>) -> Self {
        Self {
            classification: classification.to_string(),
            batches: Mutex::new(batches.into()),
            seen: Mutex::new(Vec::new()),
            merge_prompts: Mutex::new(Vec::new()),
            repeat_last: false,
            fail_on_turn: None,
        }
    }

    /// Keep proposing the last batch forever instead of running dry.
    pub fn repeating(mut self) -> Self {
        self.repeat_last = true;
        self
    }

    /// Fail the given agent turn (1-based) as an overloaded API would,
    /// without consuming a batch.
    pub fn failing_on_turn(mut self, turn: usize) -> Self {
        self.fail_on_turn = Some(turn);
        self
    }

    /// Conversation passed to each agent turn, in call order.
    pub fn seen(&self) -> Vec<Vec<ProviderMessage>> {
        self.seen.lock().unwrap().clone()
    }

    pub fn merge_prompts(&self) -> Vec<String> {
        self.merge_prompts.lock().unwrap().clone()
    }
}

impl ModelCapability for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    fn classify_structured<'a>(
        &'a self,
        _system_prompt: &'a str,
        _user_prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<RouterDecision>> + Send + 'a>> {
        Box::pin(async move {
            Ok(RouterDecision {
                reasoning: "scripted".into(),
                classification: self.classification.clone(),
            })
        })
    }

    fn generate_with_tools<'a>(
        &'a self,
        _system_prompt: &'a str,
        messages: &'a [ProviderMessage],
        _tools: &'a [ToolSpec],
        _tool_choice: ToolChoice,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ProviderResponse>> + Send + 'a>> {
        Box::pin(async move {
            let turn = {
                let mut seen = self.seen.lock().unwrap();
                seen.push(messages.to_vec());
                seen.len()
            };
            if self.fail_on_turn == Some(turn) {
                anyhow::bail!("OpenAI API error (503 Service Unavailable): overloaded");
            }
            let mut batches = self.batches.lock().unwrap();
            let batch = if self.repeat_last && batches.len() == 1 {
                // Fresh ids per turn, as a real model would issue.
                batches.front().map(|calls| {
                    calls
                        .iter()
                        .map(|c| call(&format!("{}-{turn}", c.id), &c.name, c.input.clone()))
                        .collect()
                })
            } else {
                batches.pop_front()
            };
            let Some(batch) = batch else {
                anyhow::bail!("script exhausted");
            };
            Ok(ProviderResponse::with_tool_calls(batch))
        })
    }

    fn merge_profile<'a>(
        &'a self,
        system_prompt: &'a str,
        _messages: &'a [ProviderMessage],
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
        Box::pin(async move {
            let mut prompts = self.merge_prompts.lock().unwrap();
            prompts.push(system_prompt.to_string());
            Ok(format!("learned profile #{}", prompts.len()))
        })
    }
}

pub fn call(id: &str, name: &str, input: Value) -> ToolCall {
    ToolCall {
        id: id.into(),
        name: name.into(),
        input,
    }
}

pub fn done(id: &str) -> ToolCall {
    call(id, "Done", serde_json::json!({"done": true}))
}

pub fn api_doc_email() -> Envelope {
    Envelope::new(
        "Alice Smith <alice.smith@company.com>",
        "Lance Martin <lance@company.com>",
        "Quick question about API documentation",
        "Hi Lance,\n\nI was reviewing the API documentation for the new authentication service and noticed a few endpoints seem to be missing from the specs. Could you help clarify if this was intentional or if we should update the docs?\n\nSpecifically, I'm looking at:\n- /auth/refresh\n- /auth/validate\n\nThanks!\nAlice",
    )
    .with_source_id(SOURCE_ID)
}

pub fn tax_meeting_email() -> Envelope {
    Envelope::new(
        "Project Manager <pm@client.com>",
        "Lance Martin <lance@company.com>",
        "Tax season let's schedule call",
        "Lance,\n\nIt's tax season again, and I wanted to schedule a call to discuss your tax planning strategies for this year. I have some suggestions that could potentially save you money.\n\nAre you available sometime next week? Tuesday or Thursday afternoon would work best for me, for about 45 minutes.\n\nRegards,\nProject Manager",
    )
    .with_source_id(SOURCE_ID)
}

/// Scheduled-maintenance broadcast from the evaluation dataset.
pub fn maintenance_notice_email() -> Envelope {
    Envelope::new(
        "System Admin <sysadmin@company.com>",
        "Development Team <dev@company.com>",
        "Scheduled maintenance - database downtime",
        "Hi team,\n\nThis is a reminder that we'll be performing scheduled maintenance on the production database tonight from 2AM to 4AM EST. During this time, all database services will be unavailable.\n\nPlease plan your work accordingly and ensure no critical deployments are scheduled during this window.\n\nThanks,\nSystem Admin Team",
    )
    .with_source_id(SOURCE_ID)
}

/// Engine wired to scripted and simulated collaborators, with handles to
/// everything a test wants to inspect.
pub struct Harness {
    pub engine: WorkflowEngine,
    pub model: Arc<ScriptedModel>,
    pub mail: Arc<SimulatedMail>,
    pub calendar: Arc<SimulatedCalendar>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub checkpoints: Arc<dyn CheckpointStore>,
}

pub struct HarnessBuilder {
    model: ScriptedModel,
    max_agent_steps: u32,
    preferences: Arc<dyn PreferenceStore>,
    checkpoints: Arc<dyn CheckpointStore>,
}

impl HarnessBuilder {
    pub fn new(model: ScriptedModel) -> Self {
        Self {
            model,
            max_agent_steps: 12,
            preferences: Arc::new(InMemoryPreferenceStore::new()),
            checkpoints: Arc::new(InMemoryCheckpointStore::new()),
        }
    }

    pub fn max_agent_steps(mut self, steps: u32) -> Self {
        self.max_agent_steps = steps;
        self
    }

    pub fn stores(
        mut self,
        preferences: Arc<dyn PreferenceStore>,
        checkpoints: Arc<dyn CheckpointStore>,
    ) -> Self {
        self.preferences = preferences;
        self.checkpoints = checkpoints;
        self
    }

    pub fn build(self) -> Harness {
        let model = Arc::new(self.model);
        let mail = Arc::new(SimulatedMail::new());
        let calendar = Arc::new(SimulatedCalendar::new());
        let collaborators = Collaborators {
            mail: mail.clone(),
            calendar: calendar.clone(),
            working_hours: WorkingHours::from_hours(9, 17),
        };
        let profile = AssistantProfile {
            user_address: USER_ADDRESS.into(),
            max_agent_steps: self.max_agent_steps,
            ..AssistantProfile::default()
        };
        let ctx = AssistantContext::new(
            model.clone(),
            &collaborators,
            Arc::clone(&self.preferences),
            profile,
        );
        Harness {
            engine: WorkflowEngine::new(ctx, Arc::clone(&self.checkpoints)),
            model,
            mail,
            calendar,
            preferences: self.preferences,
            checkpoints: self.checkpoints,
        }
    }
}

pub fn harness(model: ScriptedModel) -> Harness {
    HarnessBuilder::new(model).build()
}

/// Text of the tool result answering `call_id`, searched across messages.
pub fn result_for(messages: &[ProviderMessage], call_id: &str) -> Option<String> {
    messages
        .iter()
        .find_map(|message| message.tool_result_for(call_id).map(str::to_string))
}

/// Whether the tool result answering `call_id` was flagged as an error.
pub fn result_is_error(messages: &[ProviderMessage], call_id: &str) -> Option<bool> {
    messages.iter().flat_map(|message| &message.content).find_map(|block| match block {
        ContentBlock::ToolResult {
            tool_use_id,
            is_error,
            ..
        } if tool_use_id == call_id => Some(*is_error),
        _ => None,
    })
}
