use super::context::AssistantContext;
use super::error::{WorkflowError, WorkflowResult};
use super::review::notify_request;
use super::state::{Classification, ConversationState, Stage, StateUpdate, Transition};
use crate::email::{format_email_markdown, thread_to_plain_text};
use crate::llm::ProviderMessage;
use crate::preferences::Namespace;
use crate::prompt::{DEFAULT_TRIAGE_INSTRUCTIONS, triage_system_prompt, triage_user_prompt};
use tracing::info;

/// Classify the email and pick the first route.
pub(crate) async fn classify(
    ctx: &AssistantContext,
    state: &ConversationState,
) -> WorkflowResult<Transition> {
    let instructions = ctx
        .preferences
        .get_or_default(Namespace::Triage, DEFAULT_TRIAGE_INSTRUCTIONS)
        .await
        .map_err(WorkflowError::Storage)?;

    let envelope = &state.envelope;
    let system_prompt =
        triage_system_prompt(&ctx.profile.background, &instructions).map_err(WorkflowError::Model)?;
    let user_prompt = triage_user_prompt(
        &envelope.author,
        &envelope.recipient,
        &envelope.subject,
        &thread_to_plain_text(&envelope.thread_text),
    )
    .map_err(WorkflowError::Model)?;

    let decision = ctx
        .model
        .classify_structured(&system_prompt, &user_prompt)
        .await
        .map_err(WorkflowError::Model)?;
    let classification = Classification::parse(&decision.classification)?;
    info!(
        thread_id = %state.thread_id,
        %classification,
        reasoning = %decision.reasoning,
        "email triaged"
    );

    let update = StateUpdate {
        classification: Some(classification),
        ..StateUpdate::default()
    };
    Ok(match classification {
        Classification::Respond => Transition::to(
            Stage::Agent,
            StateUpdate {
                messages: vec![ProviderMessage::user(format!(
                    "Respond to the email: {}",
                    format_email_markdown(envelope)
                ))],
                ..update
            },
        ),
        Classification::Notify => Transition::to(
            Stage::TriageReview,
            StateUpdate {
                pending: Some(vec![notify_request(state)]),
                ..update
            },
        ),
        Classification::Ignore => Transition::to(Stage::Terminal, update),
    })
}
