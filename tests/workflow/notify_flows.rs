use crate::support::{ScriptedModel, api_doc_email, call, done, harness, maintenance_notice_email};
use mailsteward::preferences::Namespace;
use mailsteward::workflow::{
    Classification, NOTIFY_ACTION, ReviewDecision, RunOutcome, RunStatus,
};
use serde_json::json;

#[tokio::test]
async fn ignore_classification_completes_without_touching_mail() {
    let h = harness(ScriptedModel::new("ignore", Vec::new()));

    let outcome = h.engine.start("t-news", api_doc_email(), false).await.unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Completed {
            thread_id: "t-news".into(),
            classification: Classification::Ignore,
        }
    );
    assert!(h.model.seen().is_empty());
    assert!(h.mail.handled().is_empty());
    assert!(h.mail.sent().is_empty());
    for namespace in [Namespace::Triage, Namespace::Response, Namespace::Calendar] {
        assert!(h.preferences.history(namespace, 5).await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn notify_suspends_with_respond_or_ignore_only() {
    let h = harness(ScriptedModel::new("notify", Vec::new()));

    let outcome = h.engine.start("t-notify", api_doc_email(), false).await.unwrap();
    let RunOutcome::Suspended { requests, .. } = outcome else {
        panic!("notify must wait for the user");
    };
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].action, NOTIFY_ACTION);
    assert!(!requests[0].config.allow_accept);
    assert!(!requests[0].config.allow_edit);
    assert!(requests[0].config.allow_respond);
    assert!(requests[0].config.allow_ignore);
    assert!(requests[0].description.contains("Quick question about API documentation"));

    let checkpoint = h.engine.checkpoint("t-notify").await.unwrap().unwrap();
    assert_eq!(checkpoint.status, RunStatus::Suspended);
    assert_eq!(checkpoint.classification, Some(Classification::Notify));
}

#[tokio::test]
async fn notify_then_ignore_learns_triage_preferences() {
    let h = harness(ScriptedModel::new("notify", Vec::new()));
    let outcome = h
        .engine
        .start("t-ni", maintenance_notice_email(), false)
        .await
        .unwrap();
    let RunOutcome::Suspended { requests, .. } = outcome else {
        panic!("notify must wait for the user");
    };
    assert!(requests[0].description.contains("Scheduled maintenance - database downtime"));

    let outcome = h
        .engine
        .resume("t-ni", vec![ReviewDecision::Ignore])
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        RunOutcome::Completed {
            classification: Classification::Notify,
            ..
        }
    ));

    let prompts = h.model.merge_prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("triage_preferences"));
    assert_eq!(
        h.preferences.get(Namespace::Triage).await.unwrap().as_deref(),
        Some("learned profile #1")
    );
    let history = h.preferences.history(Namespace::Triage, 5).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].rationale.contains("classified as notify"));
    assert!(h.model.seen().is_empty());
    assert!(h.mail.sent().is_empty());
    assert!(h.calendar.created().is_empty());
}

#[tokio::test]
async fn notify_then_respond_hands_feedback_to_agent() {
    let reply = json!({
        "to": "alice.smith@company.com",
        "subject": "Re: Quick question about API documentation",
        "content": "Thanks Alice, I'll take a look."
    });
    let h = harness(ScriptedModel::new(
        "notify",
        vec![vec![call("r1", "write_email", reply)], vec![done("r2")]],
    ));
    h.engine.start("t-nr", api_doc_email(), false).await.unwrap();

    let outcome = h
        .engine
        .resume("t-nr", vec![ReviewDecision::Respond("Tell her thanks".into())])
        .await
        .unwrap();
    let RunOutcome::Suspended { requests, .. } = outcome else {
        panic!("the drafted reply needs review");
    };
    assert_eq!(requests[0].action, "write_email");

    let seen = h.model.seen();
    let conversation: Vec<String> = seen[0].iter().map(|message| message.text()).collect();
    assert!(conversation[0].starts_with("Email to notify user about:"));
    assert!(conversation[1].ends_with("Use this feedback to respond: Tell her thanks"));

    let history = h.preferences.history(Namespace::Triage, 5).await.unwrap();
    assert_eq!(history.len(), 1);

    h.engine
        .resume("t-nr", vec![ReviewDecision::Accept])
        .await
        .unwrap();
    assert_eq!(h.mail.sent().len(), 1);
}
