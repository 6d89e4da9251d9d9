//! API strategy: push a snapshot directly with the GitHub git data
//! endpoints (blob → tree → commit → ref). No git inside the sandbox.

use super::{commit_message, readme, SyncAction, SyncOutcome, SyncRequest, Synchronizer};
use crate::config::{SyncConfig, SyncStrategy};
use crate::error::SyncError;
use crate::github::{repository_name, GitHubClient, TreeEntry};
use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

pub struct ApiSynchronizer {
    github: Arc<GitHubClient>,
    branch: String,
    config: SyncConfig,
}

impl ApiSynchronizer {
    pub fn new(github: Arc<GitHubClient>, branch: impl Into<String>, config: SyncConfig) -> Self {
        Self {
            github,
            branch: branch.into(),
            config,
        }
    }

    /// Ensure the repository exists. Returns `true` when it was created now.
    async fn ensure_repository(&self, repo: &str) -> Result<bool, SyncError> {
        if self.github.get_repo(repo).await?.is_some() {
            return Ok(false);
        }
        tracing::info!(repo, "repository missing, creating");
        self.github.create_repo(repo).await?;
        Ok(true)
    }

    /// Poll the default branch of a just-created repository until GitHub
    /// has finished initializing it.
    async fn wait_for_branch(&self, repo: &str) -> Result<String, SyncError> {
        let attempts = self.config.provisioning_attempts.max(1);
        for attempt in 1..=attempts {
            tokio::time::sleep(Duration::from_millis(self.config.provisioning_delay_ms)).await;
            if let Some(sha) = self.github.branch_tip(repo, &self.branch).await? {
                return Ok(sha);
            }
            tracing::debug!(repo, attempt, "default branch not ready yet");
        }
        Err(SyncError::RemoteState {
            operation: "repository provisioning".into(),
            status: 404,
            message: format!(
                "branch '{}' did not appear after {attempts} checks",
                self.branch
            ),
        })
    }

    async fn upload_blobs(
        &self,
        repo: &str,
        files: BTreeMap<String, String>,
    ) -> Result<Vec<TreeEntry>, SyncError> {
        let github = self.github.as_ref();
        let mut entries: Vec<TreeEntry> = futures_util::stream::iter(files)
            .map(|(path, content)| async move {
                let sha = github.create_blob(repo, &content).await?;
                Ok::<_, SyncError>(TreeEntry::blob(path, sha))
            })
            .buffer_unordered(self.config.blob_concurrency.max(1))
            .try_collect()
            .await?;
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }
}

#[async_trait]
impl Synchronizer for ApiSynchronizer {
    fn strategy(&self) -> SyncStrategy {
        SyncStrategy::Api
    }

    async fn synchronize(&self, request: &SyncRequest) -> Result<SyncOutcome, SyncError> {
        let repo = repository_name(&request.project_id);
        let created = self.ensure_repository(&repo).await?;

        let tip = if created {
            Some(self.wait_for_branch(&repo).await?)
        } else {
            self.github.branch_tip(&repo, &self.branch).await?
        };

        let base_tree = match &tip {
            Some(sha) => Some(self.github.get_commit(&repo, sha).await?.tree.sha),
            None => None,
        };

        let entries = self
            .upload_blobs(&repo, readme::files_with_readme(request))
            .await?;
        tracing::debug!(repo = %repo, blobs = entries.len(), "blobs uploaded");

        let layered_on = if self.config.preserve_unlisted_files {
            base_tree.as_deref()
        } else {
            None
        };
        let tree = self.github.create_tree(&repo, &entries, layered_on).await?;
        let repo_url = self.github.html_url(&repo);

        if let (Some(tip), Some(base)) = (&tip, &base_tree) {
            if *base == tree {
                return Ok(SyncOutcome {
                    repo_url,
                    action: SyncAction::NoChanges,
                    commit_sha: Some(tip.clone()),
                });
            }
        }

        let parents: Vec<String> = tip.into_iter().collect();
        let commit = self
            .github
            .create_commit(&repo, &commit_message(&request.title), &tree, &parents)
            .await?;
        self.github
            .force_update_branch(&repo, &self.branch, &commit)
            .await?;

        Ok(SyncOutcome {
            repo_url,
            action: if created {
                SyncAction::Created
            } else {
                SyncAction::Updated
            },
            commit_sha: Some(commit),
        })
    }
}
