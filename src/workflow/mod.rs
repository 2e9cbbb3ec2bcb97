//! Per-thread orchestration: triage, the tool-calling agent loop, the
//! human review gate and durable checkpoints.

mod agent;
pub mod broker;
pub mod checkpoint;
pub mod context;
pub mod engine;
pub mod error;
pub mod review;
pub mod state;
mod triage;

pub use broker::{CliReviewBroker, ReviewBroker, settle_with};
pub use checkpoint::{Checkpoint, CheckpointStore, InMemoryCheckpointStore, SqliteCheckpointStore};
pub use context::{AssistantContext, AssistantProfile};
pub use engine::{RunOutcome, WorkflowEngine};
pub use error::{WorkflowError, WorkflowResult};
pub use review::{NOTIFY_ACTION, ReviewDecision, ReviewRequest};
pub use state::{Classification, ConversationState, RunStatus, Stage};
