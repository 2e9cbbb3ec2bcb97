use super::engine::{RunOutcome, WorkflowEngine};
use super::review::{ReviewDecision, ReviewRequest};
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Input, Select};
use std::future::Future;
use std::pin::Pin;

/// Turns a review request into a decision, however the human is reached.
pub trait ReviewBroker: Send + Sync {
    fn decide<'a>(
        &'a self,
        request: &'a ReviewRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ReviewDecision>> + Send + 'a>>;
}

/// Interactive broker on the terminal. Prompts go to stderr.
pub struct CliReviewBroker;

impl ReviewBroker for CliReviewBroker {
    fn decide<'a>(
        &'a self,
        request: &'a ReviewRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ReviewDecision>> + Send + 'a>> {
        Box::pin(async move {
            let request = request.clone();
            tokio::task::spawn_blocking(move || prompt_decision(&request))
                .await
                .context("review prompt task failed")?
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Accept,
    Edit,
    Respond,
    Ignore,
}

impl Choice {
    fn label(self) -> &'static str {
        match self {
            Self::Accept => "Accept",
            Self::Edit => "Edit arguments",
            Self::Respond => "Respond with feedback",
            Self::Ignore => "Ignore",
        }
    }
}

fn choices_for(request: &ReviewRequest) -> Vec<Choice> {
    let config = request.config;
    [
        (config.allow_accept, Choice::Accept),
        (config.allow_edit, Choice::Edit),
        (config.allow_respond, Choice::Respond),
        (config.allow_ignore, Choice::Ignore),
    ]
    .into_iter()
    .filter_map(|(allowed, choice)| allowed.then_some(choice))
    .collect()
}

fn prompt_decision(request: &ReviewRequest) -> Result<ReviewDecision> {
    eprintln!();
    eprintln!("{}", style(format!("Review: {}", request.action)).bold().cyan());
    eprintln!("{}", request.description.trim());
    eprintln!();

    let choices = choices_for(request);
    let labels: Vec<&str> = choices.iter().map(|choice| choice.label()).collect();
    let picked = Select::new()
        .with_prompt("Decision")
        .items(&labels)
        .default(0)
        .interact()
        .context("failed to read review decision")?;
    let choice = choices
        .get(picked)
        .copied()
        .context("decision out of range")?;

    match choice {
        Choice::Accept => Ok(ReviewDecision::Accept),
        Choice::Ignore => Ok(ReviewDecision::Ignore),
        Choice::Respond => {
            let feedback: String = Input::new()
                .with_prompt("Feedback")
                .interact_text()
                .context("failed to read feedback")?;
            Ok(ReviewDecision::Respond(feedback))
        }
        Choice::Edit => {
            let current = serde_json::to_string(&request.args)?;
            let edited: String = Input::new()
                .with_prompt("Arguments (JSON)")
                .with_initial_text(current)
                .validate_with(|text: &String| -> Result<(), String> {
                    match serde_json::from_str::<serde_json::Value>(text) {
                        Ok(value) if value.is_object() => Ok(()),
                        Ok(_) => Err("arguments must be a JSON object".to_string()),
                        Err(e) => Err(format!("invalid JSON: {e}")),
                    }
                })
                .interact_text()
                .context("failed to read edited arguments")?;
            Ok(ReviewDecision::Edit {
                args: serde_json::from_str(&edited)?,
            })
        }
    }
}

/// Keep resolving suspensions through `broker` until the thread completes.
pub async fn settle_with(
    engine: &WorkflowEngine,
    mut outcome: RunOutcome,
    broker: &dyn ReviewBroker,
) -> Result<RunOutcome> {
    while let RunOutcome::Suspended {
        thread_id,
        requests,
    } = &outcome
    {
        let mut decisions = Vec::with_capacity(requests.len());
        for request in requests {
            decisions.push(broker.decide(request).await?);
        }
        let thread_id = thread_id.clone();
        outcome = engine
            .resume(&thread_id, decisions)
            .await
            .with_context(|| format!("resume of thread {thread_id} failed"))?;
    }
    Ok(outcome)
}
