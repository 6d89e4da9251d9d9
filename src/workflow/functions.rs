//! The two durable functions: back up a project and restore a fragment.

use super::{StepContext, WorkflowFunction, GITHUB_SYNC_EVENT, RESTORE_COMMIT_EVENT};
use crate::error::WorkflowError;
use crate::github::repository_name;
use crate::observability::Metrics;
use crate::restore::{RestoreOrchestrator, RestoreReport, RestoreRequest};
use crate::store::events::EventRecord;
use crate::store::fragments::bind_commit_sha;
use crate::store::Store;
use crate::sync::{SyncReport, SyncRequest, Synchronizer};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

fn parse<T: DeserializeOwned>(payload: &Value) -> Result<T, WorkflowError> {
    serde_json::from_value(payload.clone()).map_err(|e| WorkflowError::Validation(e.to_string()))
}

fn to_output<T: serde::Serialize>(value: &T) -> Result<Value, WorkflowError> {
    serde_json::to_value(value).map_err(|e| WorkflowError::Store(e.into()))
}

pub struct GithubSyncFunction {
    synchronizer: Arc<dyn Synchronizer>,
    store: Store,
    metrics: Arc<Metrics>,
}

impl GithubSyncFunction {
    pub fn new(synchronizer: Arc<dyn Synchronizer>, store: Store, metrics: Arc<Metrics>) -> Self {
        Self {
            synchronizer,
            store,
            metrics,
        }
    }
}

#[async_trait]
impl WorkflowFunction for GithubSyncFunction {
    fn id(&self) -> &'static str {
        "github-sync"
    }

    fn event(&self) -> &'static str {
        GITHUB_SYNC_EVENT
    }

    fn validate(&self, payload: &Value) -> Result<(), WorkflowError> {
        parse::<SyncRequest>(payload)?
            .validate()
            .map_err(|e| WorkflowError::Validation(e.to_string()))
    }

    async fn run(&self, event: &EventRecord, step: &StepContext) -> Result<Value, WorkflowError> {
        let request: SyncRequest = parse(&event.payload)?;

        let report: SyncReport = step
            .run("sync-to-github", || async {
                let report = self.synchronizer.sync(&request).await;
                self.metrics
                    .record_sync(report.action.map(|a| a.as_str()).unwrap_or("failed"));
                Ok(report)
            })
            .await?;

        if let (true, Some(sha)) = (report.success, report.commit_sha.as_deref()) {
            match request.fragment_id.as_deref() {
                Some(fragment_id) => {
                    let repo = repository_name(&request.project_id);
                    let bound: bool = step
                        .run("bind-commit-sha", || async {
                            self.store
                                .with_conn(|conn| bind_commit_sha(conn, fragment_id, &repo, sha))
                                .map_err(WorkflowError::Store)
                        })
                        .await?;
                    if !bound {
                        tracing::info!(
                            event_id = %step.event_id(),
                            fragment_id,
                            "fragment already has a commit sha or does not exist"
                        );
                    }
                }
                None => tracing::warn!(
                    event_id = %step.event_id(),
                    project_id = %request.project_id,
                    "sync event carries no fragmentId, commit sha not recorded"
                ),
            }
        }

        to_output(&report)
    }
}

pub struct RestoreCommitFunction {
    orchestrator: Arc<RestoreOrchestrator>,
    metrics: Arc<Metrics>,
}

impl RestoreCommitFunction {
    pub fn new(orchestrator: Arc<RestoreOrchestrator>, metrics: Arc<Metrics>) -> Self {
        Self {
            orchestrator,
            metrics,
        }
    }
}

#[async_trait]
impl WorkflowFunction for RestoreCommitFunction {
    fn id(&self) -> &'static str {
        "restore-commit"
    }

    fn event(&self) -> &'static str {
        RESTORE_COMMIT_EVENT
    }

    fn validate(&self, payload: &Value) -> Result<(), WorkflowError> {
        parse::<RestoreRequest>(payload)?
            .validate()
            .map_err(|e| WorkflowError::Validation(e.to_string()))
    }

    async fn run(&self, event: &EventRecord, step: &StepContext) -> Result<Value, WorkflowError> {
        let request: RestoreRequest = parse(&event.payload)?;
        let report: RestoreReport = step
            .run("restore-commit-to-sandbox", || async {
                let report = self.orchestrator.restore(&request).await;
                self.metrics.record_restore(report.success);
                Ok(report)
            })
            .await?;
        to_output(&report)
    }
}
