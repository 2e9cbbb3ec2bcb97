use thiserror::Error;

/// Contract violations and collaborator failures that abort a workflow run.
///
/// A thread whose run ends with one of these is checkpointed as `failed`.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("model returned unknown classification '{0}'")]
    InvalidClassification(String),

    #[error("invalid review decision: {0}")]
    InvalidReviewDecision(String),

    #[error("model proposed unknown tool '{0}'")]
    UnknownToolName(String),

    #[error("model returned no tool calls")]
    EmptyToolCalls,

    #[error("invalid state transition: {0}")]
    StateTransition(String),

    #[error("thread {0} has no pending review")]
    NoPendingReview(String),

    #[error("thread {0} not found")]
    ThreadNotFound(String),

    #[error("thread {0} already exists; rerun to start it again")]
    ThreadExists(String),

    #[error("thread {0} is already running")]
    ThreadAlreadyRunning(String),

    #[error("agent exceeded the limit of {0} steps")]
    StepLimitExceeded(u32),

    #[error("model call failed: {0:#}")]
    Model(anyhow::Error),

    #[error("storage failure: {0:#}")]
    Storage(anyhow::Error),
}

impl WorkflowError {
    /// Errors raised before any state was touched; the thread keeps its
    /// previous checkpoint instead of being marked failed.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::NoPendingReview(_)
                | Self::ThreadNotFound(_)
                | Self::ThreadExists(_)
                | Self::ThreadAlreadyRunning(_)
        )
    }
}

impl WorkflowError {
    /// Collaborator failures that say nothing about the thread itself. The
    /// thread stays `running` so that recovery can pick it up again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Model(_) | Self::Storage(_))
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::WorkflowError;

    #[test]
    fn messages_name_the_offending_value() {
        assert_eq!(
            WorkflowError::InvalidClassification("maybe".into()).to_string(),
            "model returned unknown classification 'maybe'"
        );
        assert_eq!(
            WorkflowError::UnknownToolName("rm_rf".into()).to_string(),
            "model proposed unknown tool 'rm_rf'"
        );
    }

    #[test]
    fn wrapped_errors_keep_their_context_chain() {
        let inner = anyhow::anyhow!("connection reset").context("openai request failed");
        let err = WorkflowError::Model(inner);
        assert_eq!(
            err.to_string(),
            "model call failed: openai request failed: connection reset"
        );
    }

    #[test]
    fn lookup_failures_are_rejections() {
        assert!(WorkflowError::ThreadNotFound("t".into()).is_rejection());
        assert!(!WorkflowError::EmptyToolCalls.is_rejection());
    }

    #[test]
    fn collaborator_failures_are_transient() {
        assert!(WorkflowError::Model(anyhow::anyhow!("503")).is_transient());
        assert!(WorkflowError::Storage(anyhow::anyhow!("locked")).is_transient());
        assert!(!WorkflowError::InvalidClassification("maybe".into()).is_transient());
        assert!(!WorkflowError::StepLimitExceeded(3).is_transient());
    }
}
