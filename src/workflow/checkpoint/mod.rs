pub mod memory;
pub mod sqlite;

pub use memory::InMemoryCheckpointStore;
pub use sqlite::SqliteCheckpointStore;

use super::review::ReviewRequest;
use super::state::{Classification, ConversationState, RunStatus};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// Persisted snapshot of one thread.
///
/// Live threads (`running`, `suspended`) carry their full state. Terminal
/// ones keep only the outcome: status, classification and error text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub thread_id: String,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ConversationState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub updated_at: String,
}

impl Checkpoint {
    pub fn live(state: &ConversationState, status: RunStatus) -> Self {
        Self {
            thread_id: state.thread_id.clone(),
            status,
            classification: state.classification,
            state: Some(state.clone()),
            error: None,
            updated_at: Utc::now().to_rfc3339(),
        }
    }

    /// Running snapshot of a thread whose last attempt hit a collaborator
    /// failure. Recovery continues from `state`.
    pub fn interrupted(state: &ConversationState, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::live(state, RunStatus::Running)
        }
    }

    pub fn completed(thread_id: &str, classification: Option<Classification>) -> Self {
        Self {
            thread_id: thread_id.to_string(),
            status: RunStatus::Completed,
            state: None,
            classification,
            error: None,
            updated_at: Utc::now().to_rfc3339(),
        }
    }

    pub fn failed(thread_id: &str, classification: Option<Classification>, error: String) -> Self {
        Self {
            thread_id: thread_id.to_string(),
            status: RunStatus::Failed,
            state: None,
            classification,
            error: Some(error),
            updated_at: Utc::now().to_rfc3339(),
        }
    }

    pub fn pending(&self) -> &[ReviewRequest] {
        self.state
            .as_ref()
            .map(|state| state.pending.as_slice())
            .unwrap_or_default()
    }
}

/// Durable storage of workflow checkpoints, keyed by thread id.
pub trait CheckpointStore: Send + Sync {
    fn name(&self) -> &str;

    /// Insert or overwrite the checkpoint for `checkpoint.thread_id`.
    fn save<'a>(
        &'a self,
        checkpoint: &'a Checkpoint,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

    fn load<'a>(
        &'a self,
        thread_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<Checkpoint>>> + Send + 'a>>;

    /// Checkpoints in `status`, oldest update first.
    fn list<'a>(
        &'a self,
        status: RunStatus,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<Checkpoint>>> + Send + 'a>>;
}
