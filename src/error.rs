//! Error taxonomy shared by the synchronizer, restore orchestrator and
//! workflow engine.

use thiserror::Error;

/// Failures raised while talking to a sandbox or to GitHub.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Malformed event or request payload. Never retried.
    #[error("invalid payload: {0}")]
    Validation(String),

    /// A command inside the sandbox failed (non-zero exit, missing tool,
    /// every fallback exhausted).
    #[error("{step} failed: {reason}")]
    Tooling { step: String, reason: String },

    /// GitHub answered with a status the caller cannot branch on.
    #[error("GitHub returned {status} during {operation}: {message}")]
    RemoteState {
        operation: String,
        status: u16,
        message: String,
    },

    /// A command or request exceeded its budget.
    #[error("{step} timed out after {timeout_ms}ms")]
    Timeout { step: String, timeout_ms: u64 },

    /// Transport-level failure before any status was received.
    #[error("HTTP request failed during {operation}: {source}")]
    Http {
        operation: String,
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SyncError {
    pub fn tooling(step: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Tooling {
            step: step.into(),
            reason: reason.into(),
        }
    }

    pub fn http(operation: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Http {
            operation: operation.into(),
            source,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Failures of the restore orchestrator.
#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("fragment {0} not found")]
    NotFound(String),

    /// The fragment exists but has never been backed up.
    #[error("fragment {fragment_id} cannot be restored: {reason}")]
    PreconditionFailed { fragment_id: String, reason: String },

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("store error: {0}")]
    Store(#[source] anyhow::Error),
}

/// Failures of the workflow engine itself (not of the functions it runs).
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("no workflow function is registered for event '{0}'")]
    UnknownEvent(String),

    #[error("invalid event payload: {0}")]
    Validation(String),

    #[error("event {0} not found")]
    EventNotFound(String),

    #[error("workflow queue is closed")]
    QueueClosed,

    #[error("event store error: {0}")]
    Store(#[source] anyhow::Error),
}

impl WorkflowError {
    /// Payload and routing errors fail the event at once; the rest retry.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Validation(_) | Self::UnknownEvent(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tooling_error_names_step() {
        let err = SyncError::tooling("git push", "exit code 128");
        assert_eq!(err.to_string(), "git push failed: exit code 128");
        assert!(!err.is_validation());
    }

    #[test]
    fn validation_is_flagged() {
        assert!(SyncError::Validation("projectId is empty".into()).is_validation());
    }

    #[test]
    fn restore_precondition_message() {
        let err = RestoreError::PreconditionFailed {
            fragment_id: "frag-1".into(),
            reason: "commitSha is not set".into(),
        };
        assert!(err.to_string().contains("frag-1"));
        assert!(err.to_string().contains("commitSha"));
    }

    #[test]
    fn only_store_failures_retry() {
        assert!(WorkflowError::Store(anyhow::anyhow!("locked")).is_retryable());
        assert!(!WorkflowError::Validation("missing fragmentId".into()).is_retryable());
        assert!(!WorkflowError::UnknownEvent("x".into()).is_retryable());
    }
}
