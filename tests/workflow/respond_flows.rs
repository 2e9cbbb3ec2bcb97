use crate::support::{
    SOURCE_ID, ScriptedModel, api_doc_email, call, done, harness, result_for, result_is_error,
    tax_meeting_email,
};
use mailsteward::preferences::Namespace;
use mailsteward::workflow::{Classification, ReviewDecision, RunOutcome, RunStatus};
use serde_json::json;

fn api_reply() -> serde_json::Value {
    json!({
        "to": "alice.smith@company.com",
        "subject": "Re: Quick question about API documentation",
        "content": "Hi Alice, thanks for flagging this. I'll check the /auth/refresh and /auth/validate endpoints and update the docs.",
        "reply_to_id": SOURCE_ID
    })
}

fn expect_suspended(outcome: RunOutcome) -> Vec<mailsteward::workflow::ReviewRequest> {
    match outcome {
        RunOutcome::Suspended { requests, .. } => requests,
        other => panic!("expected suspension, got {other:?}"),
    }
}

#[tokio::test]
async fn accepted_reply_is_sent_once_and_thread_marked_handled() {
    let h = harness(ScriptedModel::new(
        "respond",
        vec![vec![call("c1", "write_email", api_reply())], vec![done("c2")]],
    ));

    let outcome = h.engine.start("t-api", api_doc_email(), false).await.unwrap();
    let requests = expect_suspended(outcome);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].action, "write_email");
    assert!(requests[0].config.allow_edit);
    assert!(requests[0].description.contains("# Email Draft"));
    assert!(h.mail.sent().is_empty());

    let outcome = h
        .engine
        .resume("t-api", vec![ReviewDecision::Accept])
        .await
        .unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Completed {
            thread_id: "t-api".into(),
            classification: Classification::Respond,
        }
    );

    let sent = h.mail.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "alice.smith@company.com");
    assert_eq!(sent[0].reply_to_id.as_deref(), Some(SOURCE_ID));
    assert_eq!(h.mail.handled(), vec![SOURCE_ID.to_string()]);

    let seen = h.model.seen();
    assert_eq!(seen.len(), 2);
    assert!(seen[0][0].text().starts_with("Respond to the email:"));
    let result = result_for(&seen[1], "c1").unwrap();
    assert!(result.contains("Email reply sent successfully"));

    // Accepting teaches nothing.
    assert!(h.model.merge_prompts().is_empty());
    let checkpoint = h.engine.checkpoint("t-api").await.unwrap().unwrap();
    assert_eq!(checkpoint.status, RunStatus::Completed);
    assert!(checkpoint.state.is_none());
}

#[tokio::test]
async fn meeting_flow_checks_calendar_then_reviews_invite_and_reply() {
    let invite = json!({
        "attendees": ["pm@client.com", "lance@company.com"],
        "title": "Tax Planning Strategies Discussion",
        "start_time": "2025-05-22T14:00:00",
        "end_time": "2025-05-22T14:45:00"
    });
    let reply = json!({
        "to": "pm@client.com",
        "subject": "Re: Tax season let's schedule call",
        "content": "Thursday at 2pm works, I've sent an invite for 45 minutes."
    });
    let h = harness(ScriptedModel::new(
        "respond",
        vec![
            vec![call("a1", "check_calendar_availability", json!({"dates": ["20-05-2025", "22-05-2025"]}))],
            vec![call("a2", "schedule_meeting", invite)],
            vec![call("a3", "write_email", reply)],
            vec![done("a4")],
        ],
    ));

    let requests = expect_suspended(h.engine.start("t-tax", tax_meeting_email(), false).await.unwrap());
    assert_eq!(requests[0].action, "schedule_meeting");
    assert!(requests[0].description.contains("# Calendar Invite"));

    let seen = h.model.seen();
    let availability = result_for(&seen[1], "a1").unwrap();
    assert!(!availability.is_empty());

    let requests = expect_suspended(
        h.engine
            .resume("t-tax", vec![ReviewDecision::Accept])
            .await
            .unwrap(),
    );
    assert_eq!(requests[0].action, "write_email");
    let created = h.calendar.created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].title, "Tax Planning Strategies Discussion");
    assert_eq!(created[0].organizer_email, "lance@company.com");

    let outcome = h
        .engine
        .resume("t-tax", vec![ReviewDecision::Accept])
        .await
        .unwrap();
    assert!(matches!(outcome, RunOutcome::Completed { .. }));
    assert_eq!(h.mail.sent().len(), 1);
    assert_eq!(h.mail.handled().len(), 1);
}

#[tokio::test]
async fn edited_reply_sends_edited_args_and_learns_response_preferences() {
    let h = harness(ScriptedModel::new(
        "respond",
        vec![vec![call("c1", "write_email", api_reply())], vec![done("c2")]],
    ));
    h.engine.start("t-edit", api_doc_email(), false).await.unwrap();

    let mut edited = api_reply();
    edited["content"] = json!("Hi Alice, both endpoints are intentionally undocumented for now. Lance");
    h.engine
        .resume(
            "t-edit",
            vec![ReviewDecision::Edit {
                args: edited.clone(),
            }],
        )
        .await
        .unwrap();

    let sent = h.mail.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].body, edited["content"].as_str().unwrap());

    let prompts = h.model.merge_prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("response_preferences"));
    assert_eq!(
        h.preferences.get(Namespace::Response).await.unwrap().as_deref(),
        Some("learned profile #1")
    );
    let history = h.preferences.history(Namespace::Response, 5).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].rationale.contains("User edited the email response."));
    assert!(history[0].rationale.contains("intentionally undocumented"));
}

#[tokio::test]
async fn feedback_returns_to_agent_without_sending() {
    let h = harness(ScriptedModel::new(
        "respond",
        vec![
            vec![call("c1", "write_email", api_reply())],
            vec![call("c2", "write_email", api_reply())],
            vec![done("c3")],
        ],
    ));
    h.engine.start("t-fb", api_doc_email(), false).await.unwrap();

    let requests = expect_suspended(
        h.engine
            .resume(
                "t-fb",
                vec![ReviewDecision::Respond("Keep it shorter and sign as Lance".into())],
            )
            .await
            .unwrap(),
    );
    assert_eq!(requests[0].action, "write_email");
    assert!(h.mail.sent().is_empty());

    let seen = h.model.seen();
    let feedback = result_for(&seen[1], "c1").unwrap();
    assert!(feedback.ends_with("Feedback: Keep it shorter and sign as Lance"));
    assert_eq!(h.model.merge_prompts().len(), 1);

    h.engine
        .resume("t-fb", vec![ReviewDecision::Accept])
        .await
        .unwrap();
    assert_eq!(h.mail.sent().len(), 1);
}

#[tokio::test]
async fn ignoring_a_draft_ends_the_thread_and_skips_the_rest_of_the_batch() {
    let h = harness(ScriptedModel::new(
        "respond",
        vec![vec![call("c1", "write_email", api_reply()), done("c2")]],
    ));
    h.engine.start("t-ign", api_doc_email(), false).await.unwrap();

    let outcome = h
        .engine
        .resume("t-ign", vec![ReviewDecision::Ignore])
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        RunOutcome::Completed {
            classification: Classification::Respond,
            ..
        }
    ));
    assert!(h.mail.sent().is_empty());
    assert!(h.mail.handled().is_empty());

    let history = h.preferences.history(Namespace::Triage, 5).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].rationale.contains("The user ignored the email draft."));
}

#[tokio::test]
async fn question_answer_is_passed_back_without_side_effects() {
    let h = harness(ScriptedModel::new(
        "respond",
        vec![
            vec![call("q1", "Question", json!({"content": "Should I mention the release date?"}))],
            vec![done("q2")],
        ],
    ));
    let requests = expect_suspended(h.engine.start("t-q", api_doc_email(), false).await.unwrap());
    assert_eq!(requests[0].action, "Question");
    assert!(!requests[0].config.allow_accept);
    assert!(!requests[0].config.allow_edit);

    let outcome = h
        .engine
        .resume("t-q", vec![ReviewDecision::Respond("No, skip it".into())])
        .await
        .unwrap();
    assert!(matches!(outcome, RunOutcome::Completed { .. }));

    let seen = h.model.seen();
    let answer = result_for(&seen[1], "q1").unwrap();
    assert!(answer.starts_with("User answered the question"));
    // Answers to questions are not preferences.
    assert!(h.model.merge_prompts().is_empty());
}

#[tokio::test]
async fn failed_send_is_reported_to_the_agent_and_the_loop_continues() {
    let h = harness(ScriptedModel::new(
        "respond",
        vec![
            vec![call("c1", "write_email", api_reply())],
            vec![call("c2", "write_email", api_reply())],
            vec![done("c3")],
        ],
    ));
    h.engine.start("t-outage", api_doc_email(), false).await.unwrap();

    h.mail.set_outage(Some(503));
    let requests = expect_suspended(
        h.engine
            .resume("t-outage", vec![ReviewDecision::Accept])
            .await
            .unwrap(),
    );
    assert_eq!(requests[0].action, "write_email");
    assert!(h.mail.sent().is_empty());

    let seen = h.model.seen();
    assert_eq!(seen.len(), 2);
    assert_eq!(result_is_error(&seen[1], "c1"), Some(true));
    let failure = result_for(&seen[1], "c1").unwrap();
    assert!(failure.contains("Failed to send email"));
    assert!(failure.contains("503"));

    h.mail.set_outage(None);
    let outcome = h
        .engine
        .resume("t-outage", vec![ReviewDecision::Accept])
        .await
        .unwrap();
    assert!(matches!(outcome, RunOutcome::Completed { .. }));
    assert_eq!(h.mail.sent().len(), 1);
    assert_eq!(result_is_error(&h.model.seen()[2], "c2"), Some(false));
    assert_eq!(h.mail.handled(), vec![SOURCE_ID.to_string()]);
}

#[tokio::test]
async fn edited_invite_is_scheduled_as_edited_and_learns_calendar_preferences() {
    let invite = json!({
        "attendees": ["pm@client.com", "lance@company.com"],
        "title": "Tax Planning Strategies Discussion",
        "start_time": "2025-05-22T14:00:00",
        "end_time": "2025-05-22T15:00:00"
    });
    let h = harness(ScriptedModel::new(
        "respond",
        vec![vec![call("m1", "schedule_meeting", invite.clone())], vec![done("m2")]],
    ));
    expect_suspended(h.engine.start("t-invite", tax_meeting_email(), false).await.unwrap());

    let mut edited = invite;
    edited["end_time"] = json!("2025-05-22T14:45:00");
    let outcome = h
        .engine
        .resume("t-invite", vec![ReviewDecision::Edit { args: edited }])
        .await
        .unwrap();
    assert!(matches!(outcome, RunOutcome::Completed { .. }));

    let created = h.calendar.created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].end_time, "2025-05-22T14:45:00");

    let prompts = h.model.merge_prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("cal_preferences"));
    assert_eq!(
        h.preferences.get(Namespace::Calendar).await.unwrap().as_deref(),
        Some("learned profile #1")
    );
    assert!(h.preferences.get(Namespace::Response).await.unwrap().is_none());
    let history = h.preferences.history(Namespace::Calendar, 5).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].rationale.contains("User edited the calendar invitation."));
}
