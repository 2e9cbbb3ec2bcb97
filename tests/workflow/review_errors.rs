use crate::support::{HarnessBuilder, ScriptedModel, api_doc_email, call, harness};
use mailsteward::workflow::{ReviewDecision, RunStatus, WorkflowError};
use serde_json::json;

#[tokio::test]
async fn resume_of_unknown_thread_is_rejected() {
    let h = harness(ScriptedModel::new("ignore", Vec::new()));
    let err = h
        .engine
        .resume("missing", vec![ReviewDecision::Accept])
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::ThreadNotFound(_)));
    assert!(err.is_rejection());
}

#[tokio::test]
async fn resume_of_completed_thread_has_no_pending_review() {
    let h = harness(ScriptedModel::new("ignore", Vec::new()));
    h.engine.start("t-done", api_doc_email(), false).await.unwrap();

    let err = h
        .engine
        .resume("t-done", vec![ReviewDecision::Ignore])
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NoPendingReview(_)));
    let checkpoint = h.engine.checkpoint("t-done").await.unwrap().unwrap();
    assert_eq!(checkpoint.status, RunStatus::Completed);
}

#[tokio::test]
async fn starting_an_existing_thread_requires_rerun() {
    let h = harness(ScriptedModel::new("ignore", Vec::new()));
    h.engine.start("t-dup", api_doc_email(), false).await.unwrap();

    let err = h
        .engine
        .start("t-dup", api_doc_email(), false)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::ThreadExists(_)));
    assert!(h.engine.start("t-dup", api_doc_email(), true).await.is_ok());
}

#[tokio::test]
async fn decision_outside_capability_mask_fails_the_thread() {
    let h = harness(ScriptedModel::new(
        "respond",
        vec![vec![call("q1", "Question", json!({"content": "Which endpoints?"}))]],
    ));
    h.engine.start("t-mask", api_doc_email(), false).await.unwrap();

    let err = h
        .engine
        .resume("t-mask", vec![ReviewDecision::Accept])
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidReviewDecision(_)));

    let checkpoint = h.engine.checkpoint("t-mask").await.unwrap().unwrap();
    assert_eq!(checkpoint.status, RunStatus::Failed);
    assert!(checkpoint.error.unwrap().contains("invalid review decision"));
    assert!(h.model.merge_prompts().is_empty());
}

#[tokio::test]
async fn decision_count_must_match_pending_requests() {
    let h = harness(ScriptedModel::new("notify", Vec::new()));
    h.engine.start("t-count", api_doc_email(), false).await.unwrap();

    let err = h
        .engine
        .resume(
            "t-count",
            vec![ReviewDecision::Ignore, ReviewDecision::Ignore],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidReviewDecision(_)));
}

#[tokio::test]
async fn unknown_tool_name_aborts_the_run() {
    let h = harness(ScriptedModel::new(
        "respond",
        vec![vec![call("x1", "delete_mailbox", json!({}))]],
    ));
    let err = h
        .engine
        .start("t-unknown", api_doc_email(), false)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::UnknownToolName(name) if name == "delete_mailbox"));
    let checkpoint = h.engine.checkpoint("t-unknown").await.unwrap().unwrap();
    assert_eq!(checkpoint.status, RunStatus::Failed);
}

#[tokio::test]
async fn agent_loop_is_bounded() {
    let model = ScriptedModel::new(
        "respond",
        vec![vec![call(
            "loop",
            "check_calendar_availability",
            json!({"dates": ["22-05-2025"]}),
        )]],
    )
    .repeating();
    let h = HarnessBuilder::new(model).max_agent_steps(3).build();

    let err = h
        .engine
        .start("t-loop", api_doc_email(), false)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::StepLimitExceeded(3)));
    assert_eq!(h.model.seen().len(), 3);
    assert!(h.mail.handled().is_empty());
    let checkpoint = h.engine.checkpoint("t-loop").await.unwrap().unwrap();
    assert_eq!(checkpoint.status, RunStatus::Failed);
}

#[tokio::test]
async fn unknown_classification_fails_the_thread_before_any_action() {
    let h = harness(ScriptedModel::new(
        "maybe",
        vec![vec![call("c1", "write_email", json!({"to": "a@b.com"}))]],
    ));
    let err = h
        .engine
        .start("t-label", api_doc_email(), false)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidClassification(ref label) if label == "maybe"));
    assert!(!err.is_transient());

    let checkpoint = h.engine.checkpoint("t-label").await.unwrap().unwrap();
    assert_eq!(checkpoint.status, RunStatus::Failed);
    assert!(checkpoint.state.is_none());
    assert!(h.model.seen().is_empty());
    assert!(h.mail.sent().is_empty());
    assert!(h.mail.handled().is_empty());
    assert!(h.model.merge_prompts().is_empty());
}

#[tokio::test]
async fn turn_without_tool_calls_fails_the_thread() {
    let h = harness(ScriptedModel::new("respond", vec![Vec::new()]));
    let err = h
        .engine
        .start("t-empty", api_doc_email(), false)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::EmptyToolCalls));

    let checkpoint = h.engine.checkpoint("t-empty").await.unwrap().unwrap();
    assert_eq!(checkpoint.status, RunStatus::Failed);
    assert!(checkpoint.error.unwrap().contains("no tool calls"));
    assert_eq!(h.model.seen().len(), 1);
    assert!(h.mail.handled().is_empty());
}
