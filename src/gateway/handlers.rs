use axum::{
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use super::{AppState, GRAPH_NAMES, ResumeRequest, RunRequest};
use crate::email::parse_envelope;
use crate::workflow::{Checkpoint, ReviewDecision, RunOutcome, RunStatus, WorkflowError};

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({"error": message.into()}))).into_response()
}

fn workflow_error_response(err: &WorkflowError) -> Response {
    let status = match err {
        WorkflowError::ThreadNotFound(_) => StatusCode::NOT_FOUND,
        WorkflowError::NoPendingReview(_)
        | WorkflowError::ThreadExists(_)
        | WorkflowError::ThreadAlreadyRunning(_) => StatusCode::CONFLICT,
        WorkflowError::InvalidReviewDecision(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}

fn outcome_response(outcome: RunOutcome) -> Response {
    (StatusCode::OK, Json(outcome)).into_response()
}

fn accepted(thread_id: &str) -> Response {
    (
        StatusCode::ACCEPTED,
        Json(json!({"thread_id": thread_id, "status": "accepted"})),
    )
        .into_response()
}

pub(super) fn thread_view(checkpoint: &Checkpoint) -> serde_json::Value {
    json!({
        "thread_id": checkpoint.thread_id,
        "status": checkpoint.status,
        "classification": checkpoint.classification,
        "error": checkpoint.error,
        "pending": checkpoint.pending(),
        "updated_at": checkpoint.updated_at,
    })
}

/// GET /health
pub(super) async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok", "graphs": GRAPH_NAMES}))
}

/// GET /threads/{thread_id}
pub(super) async fn handle_get_thread(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> Response {
    match state.engine.checkpoint(&thread_id).await {
        Ok(Some(checkpoint)) => Json(thread_view(&checkpoint)).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("thread {thread_id} not found")),
        Err(e) => workflow_error_response(&e),
    }
}

/// GET /reviews: every suspended thread with its pending requests
pub(super) async fn handle_list_reviews(State(state): State<AppState>) -> Response {
    match state.engine.suspended().await {
        Ok(checkpoints) => {
            let threads: Vec<_> = checkpoints.iter().map(thread_view).collect();
            Json(json!({"threads": threads})).into_response()
        }
        Err(e) => workflow_error_response(&e),
    }
}

/// POST /threads/{thread_id}/runs: start (or with `rerun`, restart) a workflow
pub(super) async fn handle_create_run(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
    body: Result<Json<RunRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Invalid JSON: {e}. Expected: {{\"graph_name\": \"...\", \"email_input\": {{...}}}}"),
            );
        }
    };
    if !GRAPH_NAMES.contains(&request.graph_name.as_str()) {
        return error_response(
            StatusCode::NOT_FOUND,
            format!("unknown graph '{}'", request.graph_name),
        );
    }
    let envelope = match parse_envelope(&request.email_input) {
        Ok(envelope) => envelope,
        Err(e) => return error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
    };
    if !request.rerun {
        match state.engine.checkpoint(&thread_id).await {
            Ok(Some(_)) => {
                return workflow_error_response(&WorkflowError::ThreadExists(thread_id));
            }
            Ok(None) => {}
            Err(e) => return workflow_error_response(&e),
        }
    }

    tracing::info!(thread_id = %thread_id, subject = %envelope.subject, "run requested");
    if request.wait {
        return match state.engine.start(&thread_id, envelope, request.rerun).await {
            Ok(outcome) => outcome_response(outcome),
            Err(e) => workflow_error_response(&e),
        };
    }

    let engine = state.engine.clone();
    let rerun = request.rerun;
    let background_id = thread_id.clone();
    tokio::spawn(async move {
        if let Err(e) = engine.start(&background_id, envelope, rerun).await {
            tracing::warn!(thread_id = %background_id, "background run ended with error: {e}");
        }
    });
    accepted(&thread_id)
}

/// POST /threads/{thread_id}/resume: answer the pending review requests
pub(super) async fn handle_resume(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
    body: Result<Json<ResumeRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Invalid JSON: {e}. Expected: {{\"decisions\": [...]}}"),
            );
        }
    };

    let mut decisions = Vec::with_capacity(request.decisions.len());
    for raw in request.decisions {
        match serde_json::from_value::<ReviewDecision>(raw) {
            Ok(decision) => decisions.push(decision),
            Err(e) => {
                return workflow_error_response(&WorkflowError::InvalidReviewDecision(
                    e.to_string(),
                ));
            }
        }
    }

    let checkpoint = match state.engine.checkpoint(&thread_id).await {
        Ok(Some(checkpoint)) => checkpoint,
        Ok(None) => return workflow_error_response(&WorkflowError::ThreadNotFound(thread_id)),
        Err(e) => return workflow_error_response(&e),
    };
    let pending = checkpoint.pending();
    if checkpoint.status != RunStatus::Suspended || pending.is_empty() {
        return workflow_error_response(&WorkflowError::NoPendingReview(thread_id));
    }
    if pending.len() != decisions.len() {
        return workflow_error_response(&WorkflowError::InvalidReviewDecision(format!(
            "expected {} decision(s), got {}",
            pending.len(),
            decisions.len()
        )));
    }
    if let Some((request, decision)) = pending
        .iter()
        .zip(&decisions)
        .find(|(request, decision)| !decision.permitted_by(request.config))
    {
        return workflow_error_response(&WorkflowError::InvalidReviewDecision(format!(
            "'{}' is not allowed for {}",
            decision.kind(),
            request.action
        )));
    }

    if request.wait {
        return match state.engine.resume(&thread_id, decisions).await {
            Ok(outcome) => outcome_response(outcome),
            Err(e) => workflow_error_response(&e),
        };
    }

    let engine = state.engine.clone();
    let background_id = thread_id.clone();
    tokio::spawn(async move {
        if let Err(e) = engine.resume(&background_id, decisions).await {
            tracing::warn!(thread_id = %background_id, "background resume ended with error: {e}");
        }
    });
    accepted(&thread_id)
}
