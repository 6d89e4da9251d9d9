//! GitHub REST client used as the backup target.
//!
//! Covers repository lookup/creation and the git data endpoints (blobs,
//! trees, commits, refs). The token is injected through [`GitHubConfig`];
//! nothing here reads the process environment.

pub mod types;

pub use types::{GitCommit, GitRef, Repository, TreeEntry};

use crate::config::GitHubConfig;
use crate::error::SyncError;
use base64::Engine as _;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use types::ShaOnly;

const REPO_DESCRIPTION: &str = "Auto-generated project backup";

/// Deterministic backup repository name for a project.
pub fn repository_name(project_id: &str) -> String {
    format!("project-{project_id}")
}

pub struct GitHubClient {
    http: reqwest::Client,
    token: String,
    owner: String,
    org: Option<String>,
    api_base: String,
    web_base: String,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("snapsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))?;

        Ok(Self {
            http,
            token: config.token.clone(),
            owner: config.repo_owner().to_string(),
            org: config.org.clone().filter(|o| !o.is_empty()),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            web_base: config.web_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Browser URL of a repository.
    pub fn html_url(&self, repo: &str) -> String {
        format!("{}/{}/{repo}", self.web_base, self.owner)
    }

    /// HTTPS clone URL carrying the token, for git inside a sandbox.
    pub fn authenticated_clone_url(&self, repo: &str) -> String {
        let (scheme, host) = self
            .web_base
            .split_once("://")
            .unwrap_or(("https", self.web_base.as_str()));
        format!("{scheme}://{}@{host}/{}/{repo}.git", self.token, self.owner)
    }

    fn repo_url(&self, repo: &str, tail: &str) -> String {
        format!("{}/repos/{}/{repo}{tail}", self.api_base, self.owner)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    async fn send(
        &self,
        operation: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, SyncError> {
        builder
            .send()
            .await
            .map_err(|e| SyncError::http(operation, e))
    }

    async fn expect_json<T: DeserializeOwned>(
        operation: &str,
        resp: reqwest::Response,
    ) -> Result<T, SyncError> {
        let status = resp.status();
        if !status.is_success() {
            return Err(Self::remote_error(operation, resp).await);
        }
        resp.json::<T>()
            .await
            .map_err(|e| SyncError::http(operation, e))
    }

    async fn remote_error(operation: &str, resp: reqwest::Response) -> SyncError {
        let status = resp.status().as_u16();
        let message = resp
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable>".to_string());
        SyncError::RemoteState {
            operation: operation.to_string(),
            status,
            message,
        }
    }

    /// Look up a repository. `None` on 404; any other failure is an error.
    pub async fn get_repo(&self, repo: &str) -> Result<Option<Repository>, SyncError> {
        let op = "get repository";
        let resp = self
            .send(op, self.request(reqwest::Method::GET, &self.repo_url(repo, "")))
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::expect_json(op, resp).await.map(Some)
    }

    /// Create a private repository initialized with a default branch.
    pub async fn create_repo(&self, repo: &str) -> Result<Repository, SyncError> {
        let op = "create repository";
        let url = match &self.org {
            Some(org) => format!("{}/orgs/{org}/repos", self.api_base),
            None => format!("{}/user/repos", self.api_base),
        };
        let body = json!({
            "name": repo,
            "description": REPO_DESCRIPTION,
            "private": true,
            "auto_init": true,
        });
        let resp = self
            .send(op, self.request(reqwest::Method::POST, &url).json(&body))
            .await?;
        Self::expect_json(op, resp).await
    }

    /// Tip commit of `branch`. `None` when the branch does not exist yet or
    /// the repository is still empty.
    pub async fn branch_tip(&self, repo: &str, branch: &str) -> Result<Option<String>, SyncError> {
        let op = "get branch ref";
        let url = self.repo_url(repo, &format!("/git/ref/heads/{branch}"));
        let resp = self.send(op, self.request(reqwest::Method::GET, &url)).await?;
        if matches!(resp.status(), StatusCode::NOT_FOUND | StatusCode::CONFLICT) {
            return Ok(None);
        }
        let git_ref: GitRef = Self::expect_json(op, resp).await?;
        Ok(Some(git_ref.object.sha))
    }

    pub async fn get_commit(&self, repo: &str, sha: &str) -> Result<GitCommit, SyncError> {
        let op = "get commit";
        let url = self.repo_url(repo, &format!("/git/commits/{sha}"));
        let resp = self.send(op, self.request(reqwest::Method::GET, &url)).await?;
        Self::expect_json(op, resp).await
    }

    /// Upload file content. Returns the blob SHA.
    pub async fn create_blob(&self, repo: &str, content: &str) -> Result<String, SyncError> {
        let op = "create blob";
        let body = json!({
            "content": base64::engine::general_purpose::STANDARD.encode(content.as_bytes()),
            "encoding": "base64",
        });
        let url = self.repo_url(repo, "/git/blobs");
        let resp = self
            .send(op, self.request(reqwest::Method::POST, &url).json(&body))
            .await?;
        let blob: ShaOnly = Self::expect_json(op, resp).await?;
        Ok(blob.sha)
    }

    /// Create a tree, optionally layered over `base_tree`. Returns its SHA.
    pub async fn create_tree(
        &self,
        repo: &str,
        entries: &[TreeEntry],
        base_tree: Option<&str>,
    ) -> Result<String, SyncError> {
        let op = "create tree";
        let mut body = json!({ "tree": entries });
        if let Some(base) = base_tree {
            body["base_tree"] = json!(base);
        }
        let url = self.repo_url(repo, "/git/trees");
        let resp = self
            .send(op, self.request(reqwest::Method::POST, &url).json(&body))
            .await?;
        let tree: ShaOnly = Self::expect_json(op, resp).await?;
        Ok(tree.sha)
    }

    pub async fn create_commit(
        &self,
        repo: &str,
        message: &str,
        tree: &str,
        parents: &[String],
    ) -> Result<String, SyncError> {
        let op = "create commit";
        let body = json!({
            "message": message,
            "tree": tree,
            "parents": parents,
        });
        let url = self.repo_url(repo, "/git/commits");
        let resp = self
            .send(op, self.request(reqwest::Method::POST, &url).json(&body))
            .await?;
        let commit: ShaOnly = Self::expect_json(op, resp).await?;
        Ok(commit.sha)
    }

    /// Point `branch` at `sha`, creating the ref when it does not exist.
    pub async fn force_update_branch(
        &self,
        repo: &str,
        branch: &str,
        sha: &str,
    ) -> Result<(), SyncError> {
        let op = "update ref";
        let url = self.repo_url(repo, &format!("/git/refs/heads/{branch}"));
        let resp = self
            .send(
                op,
                self.request(reqwest::Method::PATCH, &url)
                    .json(&json!({ "sha": sha, "force": true })),
            )
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        if !matches!(status, StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY) {
            return Err(Self::remote_error(op, resp).await);
        }

        tracing::debug!(repo, branch, %status, "ref update rejected, creating ref");
        let op = "create ref";
        let url = self.repo_url(repo, "/git/refs");
        let resp = self
            .send(
                op,
                self.request(reqwest::Method::POST, &url)
                    .json(&json!({ "ref": format!("refs/heads/{branch}"), "sha": sha })),
            )
            .await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(Self::remote_error(op, resp).await)
        }
    }
}
