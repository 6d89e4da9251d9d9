//! Durable, in-process workflow engine.
//!
//! Events are persisted before they are dispatched, each function step's
//! output is memoized per event, and failed runs are retried with
//! exponential backoff. Delivery is at-least-once: events still queued or
//! running when the process stopped are dispatched again on start.

pub mod engine;
pub mod functions;
pub mod step;

pub use engine::WorkflowEngine;
pub use functions::{GithubSyncFunction, RestoreCommitFunction};
pub use step::StepContext;

use crate::error::WorkflowError;
use crate::store::events::EventRecord;
use async_trait::async_trait;

pub const GITHUB_SYNC_EVENT: &str = "github-sync/project";
pub const RESTORE_COMMIT_EVENT: &str = "restore-commit/project";

/// A durable function triggered by one event name.
#[async_trait]
pub trait WorkflowFunction: Send + Sync {
    fn id(&self) -> &'static str;

    /// Event name this function is triggered by.
    fn event(&self) -> &'static str;

    /// Reject a payload before it is persisted.
    fn validate(&self, _payload: &serde_json::Value) -> Result<(), WorkflowError> {
        Ok(())
    }

    async fn run(
        &self,
        event: &EventRecord,
        step: &StepContext,
    ) -> Result<serde_json::Value, WorkflowError>;
}
