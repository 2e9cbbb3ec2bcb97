use super::agent;
use super::checkpoint::{Checkpoint, CheckpointStore};
use super::context::AssistantContext;
use super::error::{WorkflowError, WorkflowResult};
use super::review::{self, Execution, GateStep, ReviewDecision, ReviewRequest};
use super::state::{
    Classification, ConversationState, GateCursor, PreferenceMerge, RunStatus, Stage, StateUpdate,
    Transition,
};
use super::triage;
use crate::email::Envelope;
use crate::llm::ProviderMessage;
use crate::tools::ToolResult;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Where a run stopped.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Suspended {
        thread_id: String,
        requests: Vec<ReviewRequest>,
    },
    Completed {
        thread_id: String,
        classification: Classification,
    },
}

impl RunOutcome {
    pub fn thread_id(&self) -> &str {
        match self {
            Self::Suspended { thread_id, .. } | Self::Completed { thread_id, .. } => thread_id,
        }
    }
}

/// Drives email threads through triage, the agent loop and review,
/// checkpointing after every transition.
pub struct WorkflowEngine {
    ctx: AssistantContext,
    checkpoints: Arc<dyn CheckpointStore>,
    running: Mutex<HashSet<String>>,
}

/// Exclusive claim on a thread for the duration of one run.
struct RunGuard<'a> {
    running: &'a Mutex<HashSet<String>>,
    thread_id: String,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.thread_id);
    }
}

impl WorkflowEngine {
    pub fn new(ctx: AssistantContext, checkpoints: Arc<dyn CheckpointStore>) -> Self {
        Self {
            ctx,
            checkpoints,
            running: Mutex::new(HashSet::new()),
        }
    }

    pub fn context(&self) -> &AssistantContext {
        &self.ctx
    }

    fn claim(&self, thread_id: &str) -> WorkflowResult<RunGuard<'_>> {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if !running.insert(thread_id.to_string()) {
            return Err(WorkflowError::ThreadAlreadyRunning(thread_id.to_string()));
        }
        Ok(RunGuard {
            running: &self.running,
            thread_id: thread_id.to_string(),
        })
    }

    /// Start a new workflow for `envelope`. An existing thread is only
    /// replaced when `rerun` is set.
    pub async fn start(
        &self,
        thread_id: &str,
        envelope: Envelope,
        rerun: bool,
    ) -> WorkflowResult<RunOutcome> {
        let _guard = self.claim(thread_id)?;
        if !rerun && self.load(thread_id).await?.is_some() {
            return Err(WorkflowError::ThreadExists(thread_id.to_string()));
        }
        info!(thread_id, subject = %envelope.subject, rerun, "starting workflow");
        self.drive(ConversationState::new(thread_id, envelope), None)
            .await
    }

    /// Resume a suspended thread with one decision per pending request.
    pub async fn resume(
        &self,
        thread_id: &str,
        decisions: Vec<ReviewDecision>,
    ) -> WorkflowResult<RunOutcome> {
        let _guard = self.claim(thread_id)?;
        let checkpoint = self
            .load(thread_id)
            .await?
            .ok_or_else(|| WorkflowError::ThreadNotFound(thread_id.to_string()))?;
        let state = match (checkpoint.status, checkpoint.state) {
            (RunStatus::Suspended, Some(state)) if !state.pending.is_empty() => state,
            _ => return Err(WorkflowError::NoPendingReview(thread_id.to_string())),
        };
        self.drive(state, Some(decisions)).await
    }

    /// Continue threads whose last checkpoint says `running`: threads a
    /// previous process stopped in the middle of, or whose last attempt hit
    /// a model or storage failure. Threads claimed by a live run are left
    /// alone. Per-thread failures are logged and skipped.
    pub async fn recover_interrupted(&self) -> WorkflowResult<Vec<RunOutcome>> {
        let interrupted = self
            .checkpoints
            .list(RunStatus::Running)
            .await
            .map_err(WorkflowError::Storage)?;
        let mut outcomes = Vec::new();
        self.replay_suspended_merges().await?;
        for checkpoint in interrupted {
            let Some(state) = checkpoint.state else {
                continue;
            };
            let thread_id = checkpoint.thread_id;
            let Ok(_guard) = self.claim(&thread_id) else {
                continue;
            };
            warn!(thread_id = %thread_id, stage = %state.stage, "recovering interrupted workflow");
            match self.drive(state, None).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!(thread_id = %thread_id, "recovery failed: {e}"),
            }
        }
        Ok(outcomes)
    }

    /// Suspended threads whose merges never finished: run the merges and
    /// keep the thread suspended.
    async fn replay_suspended_merges(&self) -> WorkflowResult<()> {
        let suspended = self.suspended().await?;
        for checkpoint in suspended {
            let Some(mut state) = checkpoint.state else {
                continue;
            };
            if state.pending_merges.is_empty() {
                continue;
            }
            let Ok(_guard) = self.claim(&state.thread_id) else {
                continue;
            };
            warn!(thread_id = %state.thread_id, count = state.pending_merges.len(), "replaying unfinished preference merges");
            let mut merges = JoinSet::new();
            for merge in state.pending_merges.clone() {
                self.spawn_merge(&state.thread_id, merge, &mut merges);
            }
            self.drain_merges(&mut state, &mut merges).await;
            self.save(Checkpoint::live(&state, RunStatus::Suspended)).await?;
        }
        Ok(())
    }

    pub async fn checkpoint(&self, thread_id: &str) -> WorkflowResult<Option<Checkpoint>> {
        self.load(thread_id).await
    }

    /// Threads waiting for a human, oldest first.
    pub async fn suspended(&self) -> WorkflowResult<Vec<Checkpoint>> {
        self.checkpoints
            .list(RunStatus::Suspended)
            .await
            .map_err(WorkflowError::Storage)
    }

    async fn load(&self, thread_id: &str) -> WorkflowResult<Option<Checkpoint>> {
        self.checkpoints
            .load(thread_id)
            .await
            .map_err(WorkflowError::Storage)
    }

    async fn save(&self, checkpoint: Checkpoint) -> WorkflowResult<()> {
        self.checkpoints
            .save(&checkpoint)
            .await
            .map_err(WorkflowError::Storage)
    }

    async fn drive(
        &self,
        mut state: ConversationState,
        decisions: Option<Vec<ReviewDecision>>,
    ) -> WorkflowResult<RunOutcome> {
        let mut merges = JoinSet::new();
        if !state.pending_merges.is_empty() {
            warn!(thread_id = %state.thread_id, count = state.pending_merges.len(), "replaying unfinished preference merges");
            for merge in state.pending_merges.clone() {
                self.spawn_merge(&state.thread_id, merge, &mut merges);
            }
        }
        let result = self.run(&mut state, decisions, &mut merges).await;
        let had_merges = !state.pending_merges.is_empty();
        self.drain_merges(&mut state, &mut merges).await;

        match &result {
            Ok(RunOutcome::Completed { classification, .. }) => {
                self.save(Checkpoint::completed(&state.thread_id, Some(*classification)))
                    .await?;
                info!(thread_id = %state.thread_id, %classification, "workflow completed");
            }
            Ok(RunOutcome::Suspended { .. }) => {
                if had_merges {
                    self.save(Checkpoint::live(&state, RunStatus::Suspended)).await?;
                }
            }
            Err(e @ WorkflowError::Model(_)) => {
                // Model calls happen before their transition is committed, so
                // `state` still matches what was last saved.
                warn!(thread_id = %state.thread_id, stage = %state.stage, "workflow interrupted: {e}");
                let interrupted = Checkpoint::interrupted(&state, e.to_string());
                if let Err(save_err) = self.save(interrupted).await {
                    error!(thread_id = %state.thread_id, "could not record interruption: {save_err}");
                }
            }
            Err(e) if e.is_transient() => {
                warn!(thread_id = %state.thread_id, stage = %state.stage, "workflow interrupted: {e}");
            }
            Err(e) => {
                error!(thread_id = %state.thread_id, stage = %state.stage, "workflow failed: {e}");
                let failed =
                    Checkpoint::failed(&state.thread_id, state.classification, e.to_string());
                if let Err(save_err) = self.save(failed).await {
                    error!(thread_id = %state.thread_id, "could not record failure: {save_err}");
                }
            }
        }
        result
    }

    /// Wait for every dispatched merge. Once drained they are no longer
    /// pending, whatever their individual outcome.
    async fn drain_merges(&self, state: &mut ConversationState, merges: &mut JoinSet<()>) {
        while let Some(joined) = merges.join_next().await {
            if let Err(e) = joined {
                warn!(thread_id = %state.thread_id, "preference merge task aborted: {e}");
            }
        }
        state.pending_merges.clear();
    }

    async fn run(
        &self,
        state: &mut ConversationState,
        decisions: Option<Vec<ReviewDecision>>,
        merges: &mut JoinSet<()>,
    ) -> WorkflowResult<RunOutcome> {
        if let Some(decisions) = decisions {
            self.apply_decisions(state, decisions, merges).await?;
        }

        loop {
            match state.stage {
                Stage::Triage => {
                    let transition = triage::classify(&self.ctx, state).await?;
                    self.commit(state, transition, merges).await?;
                }
                Stage::TriageReview => {
                    if state.pending.is_empty() {
                        return Err(WorkflowError::StateTransition(
                            "notify review has no request".to_string(),
                        ));
                    }
                    return self.suspend(state).await;
                }
                Stage::Agent => {
                    let transition = agent::propose(&self.ctx, state).await?;
                    self.commit(state, transition, merges).await?;
                }
                Stage::ReviewGate => match review::next_step(state, &self.ctx.tools)? {
                    GateStep::Settle(transition) => self.commit(state, transition, merges).await?,
                    GateStep::Execute(execution) => self.execute(state, execution, merges).await?,
                    GateStep::Suspend(request) => {
                        state.apply(StateUpdate {
                            pending: Some(vec![request]),
                            ..StateUpdate::default()
                        })?;
                        return self.suspend(state).await;
                    }
                },
                Stage::MarkHandled => {
                    self.mark_handled(state).await;
                    let transition = Transition::to(Stage::Terminal, StateUpdate::default());
                    self.commit(state, transition, merges).await?;
                }
                Stage::Terminal => return Self::complete(state),
            }
        }
    }

    async fn apply_decisions(
        &self,
        state: &mut ConversationState,
        decisions: Vec<ReviewDecision>,
        merges: &mut JoinSet<()>,
    ) -> WorkflowResult<()> {
        if decisions.len() != state.pending.len() {
            return Err(WorkflowError::InvalidReviewDecision(format!(
                "expected {} decision(s), got {}",
                state.pending.len(),
                decisions.len()
            )));
        }
        let Some(decision) = decisions.into_iter().next() else {
            return Err(WorkflowError::NoPendingReview(state.thread_id.clone()));
        };
        info!(thread_id = %state.thread_id, decision = decision.kind(), stage = %state.stage, "applying review decision");

        match state.stage {
            Stage::TriageReview => {
                let transition = review::resolve_notify(state, &decision)?;
                self.commit(state, transition, merges).await
            }
            Stage::ReviewGate => match review::resolve(state, &self.ctx.tools, decision)? {
                GateStep::Settle(transition) => self.commit(state, transition, merges).await,
                GateStep::Execute(execution) => self.execute(state, execution, merges).await,
                GateStep::Suspend(_) => Err(WorkflowError::StateTransition(
                    "a decision cannot open another review".to_string(),
                )),
            },
            other => Err(WorkflowError::StateTransition(format!(
                "stage {other} does not accept review decisions"
            ))),
        }
    }

    async fn commit(
        &self,
        state: &mut ConversationState,
        transition: Transition,
        merges: &mut JoinSet<()>,
    ) -> WorkflowResult<()> {
        state.apply(transition.update)?;
        debug!(thread_id = %state.thread_id, from = %state.stage, to = %transition.goto, "transition");
        state.stage = transition.goto;
        state.pending_merges.extend(transition.merges.iter().cloned());
        self.save(Checkpoint::live(state, RunStatus::Running)).await?;
        for merge in transition.merges {
            self.spawn_merge(&state.thread_id, merge, merges);
        }
        Ok(())
    }

    fn spawn_merge(&self, thread_id: &str, merge: PreferenceMerge, merges: &mut JoinSet<()>) {
        let preferences = self.ctx.preferences.clone();
        let thread_id = thread_id.to_string();
        merges.spawn(async move {
            let namespace = merge.namespace;
            if let Err(e) = preferences.merge_update(namespace, &merge.rationale).await {
                warn!(thread_id = %thread_id, %namespace, "preference merge failed: {e:#}");
            }
        });
    }

    /// Run an approved or unreviewed proposal exactly once. The call is
    /// checkpointed as in flight before the side effect happens.
    async fn execute(
        &self,
        state: &mut ConversationState,
        execution: Execution,
        merges: &mut JoinSet<()>,
    ) -> WorkflowResult<()> {
        let Execution {
            call,
            edited,
            merges: edit_merges,
        } = execution;
        if state.executed.contains_key(&call.id) {
            return Err(WorkflowError::StateTransition(format!(
                "call {} was already executed",
                call.id
            )));
        }
        let tool = self
            .ctx
            .tools
            .get(&call.name)
            .cloned()
            .ok_or_else(|| WorkflowError::UnknownToolName(call.name.clone()))?;

        state.apply(StateUpdate {
            edited_call: edited.then(|| (call.id.clone(), call.input.clone())),
            cursor: Some(GateCursor {
                in_flight: Some(call.id.clone()),
                ..state.cursor.clone()
            }),
            pending: Some(Vec::new()),
            ..StateUpdate::default()
        })?;
        // An edit's merge is recorded with the in-flight marker so that it
        // survives a crash during execution.
        state.pending_merges.extend(edit_merges.iter().cloned());
        self.save(Checkpoint::live(state, RunStatus::Running)).await?;
        for merge in edit_merges {
            self.spawn_merge(&state.thread_id, merge, merges);
        }

        info!(thread_id = %state.thread_id, tool = %call.name, call_id = %call.id, edited, "executing tool");
        let result = match tool.execute(call.input.clone()).await {
            Ok(result) => result,
            Err(e) => {
                warn!(thread_id = %state.thread_id, tool = %call.name, "tool failed: {e:#}");
                ToolResult::failed(e.to_string())
            }
        };

        let transition = Transition {
            goto: Stage::ReviewGate,
            update: StateUpdate {
                messages: vec![ProviderMessage::tool_result(
                    call.id.clone(),
                    result.to_content(),
                    !result.success,
                )],
                executed: Some((call.id, call.input)),
                cursor: Some(state.cursor.advanced()),
                ..StateUpdate::default()
            },
            merges: Vec::new(),
        };
        self.commit(state, transition, merges).await
    }

    async fn mark_handled(&self, state: &ConversationState) {
        let Some(source_id) = state.envelope.source_id.as_deref() else {
            debug!(thread_id = %state.thread_id, "no source message to mark handled");
            return;
        };
        match self.ctx.mail.mark_handled(source_id).await {
            Ok(()) => info!(thread_id = %state.thread_id, source_id, "source message marked handled"),
            Err(e) => warn!(thread_id = %state.thread_id, source_id, "mark handled failed: {e}"),
        }
    }

    async fn suspend(&self, state: &ConversationState) -> WorkflowResult<RunOutcome> {
        self.save(Checkpoint::live(state, RunStatus::Suspended)).await?;
        info!(
            thread_id = %state.thread_id,
            actions = ?state.pending.iter().map(|request| request.action.as_str()).collect::<Vec<_>>(),
            "awaiting human review"
        );
        Ok(RunOutcome::Suspended {
            thread_id: state.thread_id.clone(),
            requests: state.pending.clone(),
        })
    }

    fn complete(state: &ConversationState) -> WorkflowResult<RunOutcome> {
        let classification = state.classification.ok_or_else(|| {
            WorkflowError::StateTransition("reached the end without a classification".to_string())
        })?;
        Ok(RunOutcome::Completed {
            thread_id: state.thread_id.clone(),
            classification,
        })
    }
}
