use crate::support::{HarnessBuilder, ScriptedModel, api_doc_email, call, done};
use mailsteward::preferences::{Namespace, PreferenceStore, SqlitePreferenceStore};
use mailsteward::storage::open_pool;
use mailsteward::llm::ProviderMessage;
use mailsteward::workflow::state::PreferenceMerge;
use mailsteward::workflow::{
    CheckpointStore, ReviewDecision, RunOutcome, RunStatus, SqliteCheckpointStore,
};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

async fn sqlite_stores(path: &Path) -> (Arc<dyn PreferenceStore>, Arc<dyn CheckpointStore>) {
    let pool = open_pool(path).await.unwrap();
    (
        Arc::new(SqlitePreferenceStore::new(pool.clone()).await.unwrap()),
        Arc::new(SqliteCheckpointStore::new(pool).await.unwrap()),
    )
}

fn reply() -> serde_json::Value {
    json!({
        "to": "alice.smith@company.com",
        "subject": "Re: Quick question about API documentation",
        "content": "Looking into it."
    })
}

#[tokio::test]
async fn suspended_thread_resumes_in_a_new_process() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("state.db");

    {
        let (preferences, checkpoints) = sqlite_stores(&db).await;
        let h = HarnessBuilder::new(ScriptedModel::new(
            "respond",
            vec![vec![call("c1", "write_email", reply())]],
        ))
        .stores(preferences, checkpoints)
        .build();
        let outcome = h.engine.start("t-durable", api_doc_email(), false).await.unwrap();
        assert!(matches!(outcome, RunOutcome::Suspended { .. }));
    }

    let (preferences, checkpoints) = sqlite_stores(&db).await;
    let h = HarnessBuilder::new(ScriptedModel::new("respond", vec![vec![done("c2")]]))
        .stores(preferences, checkpoints)
        .build();

    let pending = h.engine.suspended().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].pending()[0].action, "write_email");

    let mut edited = reply();
    edited["content"] = json!("Both endpoints are internal only.");
    let outcome = h
        .engine
        .resume("t-durable", vec![ReviewDecision::Edit { args: edited }])
        .await
        .unwrap();
    assert!(matches!(outcome, RunOutcome::Completed { .. }));
    assert_eq!(h.mail.sent()[0].body, "Both endpoints are internal only.");
    assert_eq!(
        h.preferences.get(Namespace::Response).await.unwrap().as_deref(),
        Some("learned profile #1")
    );
    let checkpoint = h.checkpoints.load("t-durable").await.unwrap().unwrap();
    assert_eq!(checkpoint.status, RunStatus::Completed);
}

#[tokio::test]
async fn interrupted_execution_is_never_repeated() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("state.db");
    let (preferences, checkpoints) = sqlite_stores(&db).await;

    let h = HarnessBuilder::new(ScriptedModel::new(
        "respond",
        vec![vec![call("c1", "write_email", reply())]],
    ))
    .stores(Arc::clone(&preferences), Arc::clone(&checkpoints))
    .build();
    h.engine.start("t-crash", api_doc_email(), false).await.unwrap();

    // Simulate a crash right after the in-flight marker was written.
    let mut checkpoint = checkpoints.load("t-crash").await.unwrap().unwrap();
    let state = checkpoint.state.as_mut().unwrap();
    state.cursor.in_flight = Some("c1".into());
    state.pending.clear();
    checkpoint.status = RunStatus::Running;
    checkpoints.save(&checkpoint).await.unwrap();

    let recovered = HarnessBuilder::new(ScriptedModel::new("respond", vec![vec![done("c2")]]))
        .stores(preferences, checkpoints)
        .build();
    let outcomes = recovered.engine.recover_interrupted().await.unwrap();
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(outcomes[0], RunOutcome::Completed { .. }));
    assert!(recovered.mail.sent().is_empty());

    let seen = recovered.model.seen();
    let result = crate::support::result_for(&seen[0], "c1").unwrap();
    assert!(result.contains("outcome is unknown"));
}

#[tokio::test]
async fn model_outage_after_a_send_leaves_the_thread_recoverable() {
    let h = HarnessBuilder::new(
        ScriptedModel::new(
            "respond",
            vec![vec![call("c1", "write_email", reply())], vec![done("c2")]],
        )
        .failing_on_turn(2),
    )
    .build();
    h.engine.start("t-outage", api_doc_email(), false).await.unwrap();

    let err = h
        .engine
        .resume("t-outage", vec![ReviewDecision::Accept])
        .await
        .unwrap_err();
    assert!(err.is_transient());
    assert_eq!(h.mail.sent().len(), 1);
    assert!(h.mail.handled().is_empty());

    let checkpoint = h.checkpoints.load("t-outage").await.unwrap().unwrap();
    assert_eq!(checkpoint.status, RunStatus::Running);
    assert!(checkpoint.error.unwrap().contains("503"));
    let state = checkpoint.state.unwrap();
    assert!(state.executed.contains_key("c1"));

    let outcomes = h.engine.recover_interrupted().await.unwrap();
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(outcomes[0], RunOutcome::Completed { .. }));
    assert_eq!(h.mail.sent().len(), 1);
    assert_eq!(h.mail.handled(), vec![crate::support::SOURCE_ID.to_string()]);
}

fn response_merge() -> PreferenceMerge {
    PreferenceMerge {
        namespace: Namespace::Response,
        rationale: vec![ProviderMessage::user("User edited the email response.")],
    }
}

#[tokio::test]
async fn edit_merge_survives_a_crash_during_execution() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("state.db");
    let (preferences, checkpoints) = sqlite_stores(&db).await;

    let h = HarnessBuilder::new(ScriptedModel::new(
        "respond",
        vec![vec![call("c1", "write_email", reply())]],
    ))
    .stores(Arc::clone(&preferences), Arc::clone(&checkpoints))
    .build();
    h.engine.start("t-merge", api_doc_email(), false).await.unwrap();

    // State as written right before the edited draft went out.
    let mut checkpoint = checkpoints.load("t-merge").await.unwrap().unwrap();
    let state = checkpoint.state.as_mut().unwrap();
    state.cursor.in_flight = Some("c1".into());
    state.pending.clear();
    state.pending_merges.push(response_merge());
    checkpoint.status = RunStatus::Running;
    checkpoints.save(&checkpoint).await.unwrap();

    let recovered = HarnessBuilder::new(ScriptedModel::new("respond", vec![vec![done("c2")]]))
        .stores(preferences, checkpoints)
        .build();
    let outcomes = recovered.engine.recover_interrupted().await.unwrap();
    assert!(matches!(outcomes[0], RunOutcome::Completed { .. }));

    assert_eq!(recovered.model.merge_prompts().len(), 1);
    assert_eq!(
        recovered.preferences.get(Namespace::Response).await.unwrap().as_deref(),
        Some("learned profile #1")
    );
}

#[tokio::test]
async fn suspended_thread_with_unfinished_merges_replays_them_once() {
    let h = HarnessBuilder::new(ScriptedModel::new(
        "respond",
        vec![vec![call("c1", "write_email", reply())], vec![call("c2", "write_email", reply())]],
    ))
    .build();
    h.engine.start("t-replay", api_doc_email(), false).await.unwrap();

    // Feedback merges finish before the run returns, so nothing is left over.
    h.engine
        .resume("t-replay", vec![ReviewDecision::Respond("Shorter".into())])
        .await
        .unwrap();
    let mut checkpoint = h.checkpoints.load("t-replay").await.unwrap().unwrap();
    assert_eq!(checkpoint.status, RunStatus::Suspended);
    assert!(checkpoint.state.as_ref().unwrap().pending_merges.is_empty());
    assert_eq!(h.model.merge_prompts().len(), 1);

    checkpoint.state.as_mut().unwrap().pending_merges.push(response_merge());
    h.checkpoints.save(&checkpoint).await.unwrap();

    assert!(h.engine.recover_interrupted().await.unwrap().is_empty());
    assert_eq!(h.model.merge_prompts().len(), 2);
    let checkpoint = h.checkpoints.load("t-replay").await.unwrap().unwrap();
    assert_eq!(checkpoint.status, RunStatus::Suspended);
    assert!(checkpoint.state.unwrap().pending_merges.is_empty());

    h.engine.recover_interrupted().await.unwrap();
    assert_eq!(h.model.merge_prompts().len(), 2);
}
