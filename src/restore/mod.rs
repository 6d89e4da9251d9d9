//! Restore a backed-up fragment into a brand new sandbox: clone its backup
//! repository, check out the recorded commit and start the dev server.

pub mod dev_server;

use crate::config::{Config, RestoreConfig};
use crate::error::{RestoreError, SyncError};
use crate::github::GitHubClient;
use crate::sandbox::git::{ensure_git, shell_quote};
use crate::sandbox::{Sandbox, SandboxClient};
use crate::store::fragments::{load_fragment, Fragment};
use crate::store::Store;
use dev_server::{DevServer, RunningDevServer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Payload of a `restore-commit/project` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreRequest {
    pub project_id: String,
    pub fragment_id: String,
}

impl RestoreRequest {
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.project_id.trim().is_empty() || self.fragment_id.trim().is_empty() {
            return Err(SyncError::Validation(
                "projectId and fragmentId are required".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginalFragment {
    pub id: String,
    pub title: String,
    pub commit_sha: String,
    pub repository_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreReport {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_sandbox_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_sandbox_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_fragment: Option<OriginalFragment>,
    /// Whether the dev server answered its post-start probe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_ready: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fragment_id: Option<String>,
}

impl RestoreReport {
    pub fn failed(request: &RestoreRequest, error: &RestoreError) -> Self {
        Self {
            success: false,
            new_sandbox_url: None,
            new_sandbox_id: None,
            original_fragment: None,
            server_ready: None,
            error: Some(error.to_string()),
            project_id: request.project_id.clone(),
            fragment_id: Some(request.fragment_id.clone()),
        }
    }
}

pub struct RestoreOrchestrator {
    store: Store,
    github: Arc<GitHubClient>,
    sandboxes: Arc<dyn SandboxClient>,
    workdir: String,
    grace_ms: u64,
    install_git_timeout_ms: u64,
    config: RestoreConfig,
}

impl RestoreOrchestrator {
    pub fn new(
        store: Store,
        github: Arc<GitHubClient>,
        sandboxes: Arc<dyn SandboxClient>,
        config: &Config,
    ) -> Self {
        Self {
            store,
            github,
            sandboxes,
            workdir: config.sandbox.workdir.clone(),
            grace_ms: config.sandbox.request_grace_ms,
            install_git_timeout_ms: config.sync.install_timeout_ms,
            config: config.restore.clone(),
        }
    }

    /// Run a restore, folding any failure into the report.
    pub async fn restore(&self, request: &RestoreRequest) -> RestoreReport {
        match self.try_restore(request).await {
            Ok(report) => {
                tracing::info!(
                    project_id = %request.project_id,
                    fragment_id = %request.fragment_id,
                    sandbox_id = report.new_sandbox_id.as_deref().unwrap_or("-"),
                    "restore finished"
                );
                report
            }
            Err(e) => {
                tracing::error!(
                    project_id = %request.project_id,
                    fragment_id = %request.fragment_id,
                    error = %e,
                    "restore failed"
                );
                RestoreReport::failed(request, &e)
            }
        }
    }

    pub async fn try_restore(&self, request: &RestoreRequest) -> Result<RestoreReport, RestoreError> {
        request.validate()?;
        let (fragment, target) = self.restorable(&request.fragment_id)?;

        let sandbox = Sandbox::provision(
            self.sandboxes.clone(),
            &self.config.template,
            self.config.sandbox_timeout_ms,
            self.workdir.clone(),
        )
        .await?
        .with_grace_ms(self.grace_ms)
        .with_secret(self.github.token());

        let server_ready = match self.prepare(&sandbox, &target).await {
            Ok(ready) => ready,
            Err(e) => {
                if self.config.kill_on_failure {
                    if let Err(kill_err) = sandbox.kill().await {
                        tracing::warn!(sandbox_id = %sandbox.id(), error = %kill_err, "could not kill sandbox");
                    }
                }
                return Err(e.into());
            }
        };

        Ok(RestoreReport {
            success: true,
            new_sandbox_url: Some(sandbox.preview_url(self.config.dev_port)),
            new_sandbox_id: Some(sandbox.id().to_string()),
            original_fragment: Some(OriginalFragment {
                id: fragment.id,
                title: fragment.title,
                commit_sha: target.commit_sha,
                repository_name: target.repository_name,
            }),
            server_ready: Some(server_ready),
            error: None,
            project_id: request.project_id.clone(),
            fragment_id: None,
        })
    }

    /// Load the fragment and check it has been backed up.
    fn restorable(&self, fragment_id: &str) -> Result<(Fragment, BackupTarget), RestoreError> {
        let fragment = self
            .store
            .with_conn(|conn| load_fragment(conn, fragment_id))
            .map_err(RestoreError::Store)?
            .ok_or_else(|| RestoreError::NotFound(fragment_id.to_string()))?;

        let precondition = |reason: &str| RestoreError::PreconditionFailed {
            fragment_id: fragment_id.to_string(),
            reason: reason.to_string(),
        };
        let commit_sha = fragment
            .commit_sha
            .clone()
            .ok_or_else(|| precondition("no commitSha recorded"))?;
        let repository_name = fragment
            .repository_name
            .clone()
            .ok_or_else(|| precondition("no repositoryName recorded"))?;

        Ok((
            fragment,
            BackupTarget {
                commit_sha,
                repository_name,
            },
        ))
    }

    /// Everything after provisioning. Returns whether the dev server answered.
    async fn prepare(&self, sandbox: &Sandbox, target: &BackupTarget) -> Result<bool, SyncError> {
        sandbox.set_timeout(self.config.sandbox_timeout_ms).await?;
        ensure_git(sandbox, self.install_git_timeout_ms).await?;

        let url = self.github.authenticated_clone_url(&target.repository_name);
        sandbox
            .run_checked(
                "git clone",
                &format!("git clone {} .", shell_quote(&url)),
                self.config.clone_timeout_ms,
            )
            .await?;
        sandbox
            .run_checked(
                "git checkout",
                &format!("git checkout {}", shell_quote(&target.commit_sha)),
                self.config.checkout_timeout_ms,
            )
            .await?;

        let install = sandbox
            .run("npm install", "npm install", self.config.install_timeout_ms)
            .await;
        match install {
            Ok(out) if out.success() => {}
            Ok(out) => tracing::warn!(reason = %out.failure_reason(), "npm install failed, continuing"),
            Err(e) => tracing::warn!(error = %e, "npm install failed, continuing"),
        }

        let launcher = DevServer::new(&self.config.dev_command, self.config.dev_port);
        let mut server = launcher.start(sandbox).await?;
        let mut ready = self.wait_and_check(sandbox, &server).await;
        for attempt in 1..=self.config.dev_restarts {
            if ready {
                break;
            }
            tracing::warn!(sandbox_id = %sandbox.id(), attempt, "dev server not answering, restarting");
            if let Err(e) = server.stop(sandbox).await {
                tracing::warn!(sandbox_id = %sandbox.id(), error = %e, "could not stop dev server");
            }
            server = launcher.start(sandbox).await?;
            ready = self.wait_and_check(sandbox, &server).await;
        }
        if !ready {
            tracing::warn!(sandbox_id = %sandbox.id(), "dev server not answering yet");
        }
        Ok(ready)
    }

    async fn wait_and_check(&self, sandbox: &Sandbox, server: &RunningDevServer) -> bool {
        tokio::time::sleep(Duration::from_millis(self.config.startup_delay_ms)).await;
        server.health_check(sandbox).await
    }
}

struct BackupTarget {
    commit_sha: String,
    repository_name: String,
}
