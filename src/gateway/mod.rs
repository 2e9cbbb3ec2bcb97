//! Axum-based HTTP gateway hosting the email workflow.
//!
//! - Request body size limits (64KB max)
//! - Request timeouts (30s)
//! - Runs are started in the background unless the caller asks to wait

mod handlers;

use handlers::{handle_create_run, handle_get_thread, handle_health, handle_list_reviews, handle_resume};

use crate::config::DEFAULT_GRAPH_NAME;
use crate::workflow::WorkflowEngine;
use anyhow::Result;
use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Maximum request body size (64KB)
pub const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout (30s)
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Workflow graphs this gateway can run.
pub const GRAPH_NAMES: &[&str] = &[DEFAULT_GRAPH_NAME];

/// Shared state for all axum handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<WorkflowEngine>,
}

/// POST /threads/{thread_id}/runs body
#[derive(Debug, serde::Deserialize)]
pub struct RunRequest {
    #[serde(default = "default_graph_name")]
    pub graph_name: String,
    pub email_input: serde_json::Value,
    #[serde(default)]
    pub rerun: bool,
    /// Block until the run suspends or completes.
    #[serde(default)]
    pub wait: bool,
}

fn default_graph_name() -> String {
    DEFAULT_GRAPH_NAME.to_string()
}

/// POST /threads/{thread_id}/resume body
#[derive(Debug, serde::Deserialize)]
pub struct ResumeRequest {
    pub decisions: Vec<serde_json::Value>,
    #[serde(default)]
    pub wait: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/threads/{thread_id}", get(handle_get_thread))
        .route("/threads/{thread_id}/runs", post(handle_create_run))
        .route("/threads/{thread_id}/resume", post(handle_resume))
        .route("/reviews", get(handle_list_reviews))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ))
}

/// Bind `host:port` and serve until `shutdown` fires.
pub async fn run_gateway(
    host: &str,
    port: u16,
    engine: Arc<WorkflowEngine>,
    shutdown: CancellationToken,
) -> Result<()> {
    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    run_gateway_with_listener(listener, engine, shutdown).await
}

/// Serve from a pre-bound listener.
pub async fn run_gateway_with_listener(
    listener: tokio::net::TcpListener,
    engine: Arc<WorkflowEngine>,
    shutdown: CancellationToken,
) -> Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "gateway listening");
    println!("◆ Gateway listening on http://{addr}");
    println!("  POST /threads/{{id}}/runs   → start a workflow");
    println!("  POST /threads/{{id}}/resume → answer a review");
    println!("  GET  /threads/{{id}}        → thread status");
    println!("  GET  /reviews             → pending reviews");
    println!("  GET  /health              → health check\n");

    let app = router(AppState { engine });
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{MAX_BODY_SIZE, REQUEST_TIMEOUT_SECS, ResumeRequest, RunRequest};
    use crate::config::DEFAULT_GRAPH_NAME;

    #[test]
    fn security_body_limit_is_64kb() {
        assert_eq!(MAX_BODY_SIZE, 65_536);
    }

    #[test]
    fn security_timeout_is_30_seconds() {
        assert_eq!(REQUEST_TIMEOUT_SECS, 30);
    }

    #[test]
    fn run_request_defaults_graph_and_flags() {
        let parsed: RunRequest =
            serde_json::from_str(r#"{"email_input": {"from": "a@b.com", "to": "c@d.com"}}"#)
                .unwrap();
        assert_eq!(parsed.graph_name, DEFAULT_GRAPH_NAME);
        assert!(!parsed.rerun);
        assert!(!parsed.wait);

        let missing: Result<RunRequest, _> = serde_json::from_str(r#"{"graph_name": "x"}"#);
        assert!(missing.is_err());
    }

    #[test]
    fn resume_request_requires_decisions() {
        let parsed: ResumeRequest =
            serde_json::from_str(r#"{"decisions": [{"type": "accept"}]}"#).unwrap();
        assert_eq!(parsed.decisions.len(), 1);
        assert!(serde_json::from_str::<ResumeRequest>("{}").is_err());
    }
}
