//! Repository synchronization: back up a project's files to its GitHub
//! repository as one new commit.
//!
//! Two strategies implement [`Synchronizer`]:
//!
//! - [`api::ApiSynchronizer`] builds blobs, a tree and a commit through the
//!   GitHub REST API. No git is needed inside the sandbox.
//! - [`shell::ShellSynchronizer`] drives git inside the sandbox and pushes.
//!
//! Either way the caller gets a [`SyncReport`]; errors never escape
//! [`Synchronizer::sync`].

pub mod api;
pub mod attempt;
pub mod readme;
pub mod shell;

use crate::config::{Config, SyncStrategy};
use crate::error::SyncError;
use crate::github::GitHubClient;
use crate::sandbox::SandboxClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Payload of a `github-sync/project` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    pub project_id: String,
    pub files: BTreeMap<String, String>,
    pub sandbox_url: String,
    pub title: String,
    /// Fragment whose `commitSha` should record the resulting commit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fragment_id: Option<String>,
}

impl SyncRequest {
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.project_id.trim().is_empty() {
            return Err(SyncError::Validation("projectId must not be empty".into()));
        }
        if self.sandbox_url.trim().is_empty() {
            return Err(SyncError::Validation("sandboxUrl must not be empty".into()));
        }
        if let Some(fragment_id) = &self.fragment_id {
            if fragment_id.trim().is_empty() {
                return Err(SyncError::Validation("fragmentId must not be empty".into()));
            }
        }
        for path in self.files.keys() {
            validate_path(path)?;
        }
        Ok(())
    }

    pub fn files_count(&self) -> usize {
        self.files.len()
    }
}

pub(crate) fn validate_path(path: &str) -> Result<(), SyncError> {
    let invalid = |why: &str| SyncError::Validation(format!("file path '{path}' {why}"));

    if path.trim().is_empty() {
        return Err(invalid("is empty"));
    }
    if path.starts_with('/') || path.contains('\\') {
        return Err(invalid("must be relative"));
    }
    if path.split('/').any(|seg| seg == ".." || seg.is_empty()) {
        return Err(invalid("contains an empty or '..' segment"));
    }
    if path == ".git" || path.starts_with(".git/") {
        return Err(invalid("points inside .git"));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncAction {
    Created,
    Updated,
    NoChanges,
    Synced,
}

impl SyncAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncAction::Created => "created",
            SyncAction::Updated => "updated",
            SyncAction::NoChanges => "no-changes",
            SyncAction::Synced => "synced",
        }
    }
}

/// Result of a successful synchronization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub repo_url: String,
    pub action: SyncAction,
    pub commit_sha: Option<String>,
}

/// What a sync step reports, success or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<SyncAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub project_id: String,
    pub files_count: usize,
}

impl SyncReport {
    pub fn succeeded(request: &SyncRequest, outcome: SyncOutcome) -> Self {
        Self {
            success: true,
            repo_url: Some(outcome.repo_url),
            action: Some(outcome.action),
            commit_sha: outcome.commit_sha,
            error: None,
            project_id: request.project_id.clone(),
            files_count: request.files_count(),
        }
    }

    pub fn failed(request: &SyncRequest, error: &SyncError) -> Self {
        Self {
            success: false,
            repo_url: None,
            action: None,
            commit_sha: None,
            error: Some(error.to_string()),
            project_id: request.project_id.clone(),
            files_count: request.files_count(),
        }
    }
}

#[async_trait]
pub trait Synchronizer: Send + Sync {
    fn strategy(&self) -> SyncStrategy;

    /// Produce one commit for the request's file set.
    async fn synchronize(&self, request: &SyncRequest) -> Result<SyncOutcome, SyncError>;

    /// Validate, synchronize and fold any failure into the report.
    async fn sync(&self, request: &SyncRequest) -> SyncReport {
        let result = match request.validate() {
            Ok(()) => self.synchronize(request).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(outcome) => {
                tracing::info!(
                    project_id = %request.project_id,
                    strategy = ?self.strategy(),
                    action = outcome.action.as_str(),
                    commit_sha = outcome.commit_sha.as_deref().unwrap_or("-"),
                    "sync finished"
                );
                SyncReport::succeeded(request, outcome)
            }
            Err(e) if e.is_validation() => {
                tracing::warn!(project_id = %request.project_id, error = %e, "sync rejected");
                SyncReport::failed(request, &e)
            }
            Err(e) => {
                tracing::error!(
                    project_id = %request.project_id,
                    strategy = ?self.strategy(),
                    error = %e,
                    "sync failed"
                );
                SyncReport::failed(request, &e)
            }
        }
    }
}

/// Commit message for a backup.
pub fn commit_message(title: &str) -> String {
    let source = if title.trim().is_empty() {
        "sandbox"
    } else {
        title.trim()
    };
    format!("Auto-sync from {source} - {}", chrono::Utc::now().to_rfc3339())
}

/// Build the synchronizer selected by `sync.strategy`.
pub fn build_synchronizer(
    config: &Config,
    github: Arc<GitHubClient>,
    sandboxes: Arc<dyn SandboxClient>,
) -> Arc<dyn Synchronizer> {
    match config.sync.strategy {
        SyncStrategy::Api => Arc::new(api::ApiSynchronizer::new(
            github,
            config.github.default_branch.clone(),
            config.sync.clone(),
        )),
        SyncStrategy::Shell => Arc::new(shell::ShellSynchronizer::new(
            github, sandboxes, config,
        )),
    }
}
