//! [`Sandbox`]: a live sandbox bound to a client, an ID and a working
//! directory.

use super::{redact, CommandOutput, SandboxClient};
use crate::error::SyncError;
use std::sync::Arc;
use std::time::Duration;

/// Handle to one sandbox. Cheap to clone.
#[derive(Clone)]
pub struct Sandbox {
    client: Arc<dyn SandboxClient>,
    id: String,
    workdir: String,
    grace_ms: u64,
    secrets: Vec<String>,
}

impl std::fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sandbox")
            .field("id", &self.id)
            .field("workdir", &self.workdir)
            .finish()
    }
}

impl Sandbox {
    /// Attach to an existing sandbox.
    pub fn connect(
        client: Arc<dyn SandboxClient>,
        id: impl Into<String>,
        workdir: impl Into<String>,
    ) -> Self {
        Self {
            client,
            id: id.into(),
            workdir: workdir.into(),
            grace_ms: 10_000,
            secrets: Vec::new(),
        }
    }

    /// Create a fresh sandbox from `template`.
    pub async fn provision(
        client: Arc<dyn SandboxClient>,
        template: &str,
        timeout_ms: u64,
        workdir: impl Into<String>,
    ) -> Result<Self, SyncError> {
        let id = client
            .create_sandbox(template, timeout_ms)
            .await
            .map_err(|e| SyncError::tooling("sandbox provisioning", e.to_string()))?;
        tracing::info!(sandbox_id = %id, template, "sandbox provisioned");
        Ok(Self::connect(client, id, workdir))
    }

    /// Extra time allowed for the HTTP round trip beyond a command's own budget.
    pub fn with_grace_ms(mut self, grace_ms: u64) -> Self {
        self.grace_ms = grace_ms;
        self
    }

    /// Strings masked out of any output that ends up in logs or errors.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        if !secret.is_empty() {
            self.secrets.push(secret);
        }
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn preview_url(&self, port: u16) -> String {
        self.client.preview_url(&self.id, port)
    }

    pub fn redact(&self, text: &str) -> String {
        redact(text, &self.secrets)
    }

    /// Run `command` in the working directory. A non-zero exit is returned
    /// as-is; only transport failures and timeouts are errors.
    pub async fn run(
        &self,
        step: &str,
        command: &str,
        timeout_ms: u64,
    ) -> Result<CommandOutput, SyncError> {
        tracing::debug!(sandbox_id = %self.id, step, command = %self.redact(command), "running");

        let budget = Duration::from_millis(timeout_ms.saturating_add(self.grace_ms));
        let call = self
            .client
            .run_command(&self.id, command, &self.workdir, timeout_ms);

        match tokio::time::timeout(budget, call).await {
            Err(_) => Err(SyncError::Timeout {
                step: step.to_string(),
                timeout_ms,
            }),
            Ok(Err(e)) => Err(SyncError::tooling(step, self.redact(&e.to_string()))),
            Ok(Ok(mut output)) => {
                output.stdout = self.redact(&output.stdout);
                output.stderr = self.redact(&output.stderr);
                Ok(output)
            }
        }
    }

    /// Like [`Sandbox::run`] but a non-zero exit becomes a tooling error.
    pub async fn run_checked(
        &self,
        step: &str,
        command: &str,
        timeout_ms: u64,
    ) -> Result<CommandOutput, SyncError> {
        let output = self.run(step, command, timeout_ms).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(SyncError::tooling(step, output.failure_reason()))
        }
    }

    /// Write a file given a path relative to the working directory.
    pub async fn write_file(&self, relative_path: &str, content: &str) -> Result<(), SyncError> {
        let path = self.absolute(relative_path);
        self.client
            .write_file(&self.id, &path, content)
            .await
            .map_err(|e| SyncError::tooling(format!("write {relative_path}"), e.to_string()))
    }

    pub async fn read_file(&self, relative_path: &str) -> Result<String, SyncError> {
        let path = self.absolute(relative_path);
        self.client
            .read_file(&self.id, &path)
            .await
            .map_err(|e| SyncError::tooling(format!("read {relative_path}"), e.to_string()))
    }

    pub async fn set_timeout(&self, timeout_ms: u64) -> Result<(), SyncError> {
        self.client
            .set_timeout(&self.id, timeout_ms)
            .await
            .map_err(|e| SyncError::tooling("sandbox set timeout", e.to_string()))
    }

    pub async fn kill(&self) -> Result<(), SyncError> {
        self.client
            .kill_sandbox(&self.id)
            .await
            .map_err(|e| SyncError::tooling("sandbox kill", e.to_string()))
    }

    fn absolute(&self, relative_path: &str) -> String {
        format!(
            "{}/{}",
            self.workdir.trim_end_matches('/'),
            relative_path.trim_start_matches('/')
        )
    }
}
