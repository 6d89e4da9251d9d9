//! E2B sandbox provider: HTTP client for the E2B REST API.

use super::{CommandOutput, SandboxClient};
use crate::config::SandboxConfig;
use async_trait::async_trait;
use std::time::Duration;

/// Shared HTTP client for E2B API calls.
pub struct E2bSandboxClient {
    api_key: String,
    api_base: String,
    domain: String,
    http: reqwest::Client,
}

impl E2bSandboxClient {
    pub fn new(config: &SandboxConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build reqwest client: {e}"))?;

        Ok(Self {
            api_key: config.api_key.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            domain: config.domain.clone(),
            http,
        })
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.header("Authorization", format!("Bearer {}", self.api_key))
    }

    fn require_key(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.api_key.is_empty(), "E2B API key is not configured");
        Ok(())
    }

    async fn read_body(resp: reqwest::Response) -> (reqwest::StatusCode, String) {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable>".to_string());
        (status, body)
    }
}

#[async_trait]
impl SandboxClient for E2bSandboxClient {
    async fn create_sandbox(&self, template: &str, timeout_ms: u64) -> anyhow::Result<String> {
        self.require_key()?;

        let url = format!("{}/v0/sandboxes", self.api_base);
        let body = serde_json::json!({
            "templateID": template,
            "timeout": timeout_ms / 1000,
        });

        let resp = self
            .authorized(self.http.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("E2B create sandbox request failed: {e}"))?;

        let (status, body_text) = Self::read_body(resp).await;
        anyhow::ensure!(
            status.is_success(),
            "E2B API returned {status}: {body_text}"
        );

        let parsed: serde_json::Value = serde_json::from_str(&body_text)
            .map_err(|e| anyhow::anyhow!("Failed to parse E2B response: {e}\nBody: {body_text}"))?;

        let sandbox_id = parsed["sandboxID"]
            .as_str()
            .or_else(|| parsed["sandbox_id"].as_str())
            .unwrap_or("")
            .to_string();

        anyhow::ensure!(
            !sandbox_id.is_empty(),
            "E2B returned no sandbox_id. Response: {body_text}"
        );

        Ok(sandbox_id)
    }

    async fn set_timeout(&self, sandbox_id: &str, timeout_ms: u64) -> anyhow::Result<()> {
        self.require_key()?;

        let url = format!("{}/v0/sandboxes/{sandbox_id}/timeout", self.api_base);
        let resp = self
            .authorized(self.http.post(&url))
            .json(&serde_json::json!({ "timeout": timeout_ms / 1000 }))
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("E2B set_timeout request failed: {e}"))?;

        let (status, body_text) = Self::read_body(resp).await;
        anyhow::ensure!(
            status.is_success(),
            "E2B API returned {status}: {body_text}"
        );
        Ok(())
    }

    async fn kill_sandbox(&self, sandbox_id: &str) -> anyhow::Result<()> {
        self.require_key()?;

        let url = format!("{}/v0/sandboxes/{sandbox_id}", self.api_base);
        let resp = self
            .authorized(self.http.delete(&url))
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("E2B kill request failed: {e}"))?;

        let status = resp.status();
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            Ok(())
        } else {
            let (_, body_text) = Self::read_body(resp).await;
            anyhow::bail!("E2B API returned {status}: {body_text}")
        }
    }

    async fn run_command(
        &self,
        sandbox_id: &str,
        command: &str,
        workdir: &str,
        timeout_ms: u64,
    ) -> anyhow::Result<CommandOutput> {
        self.require_key()?;

        let url = format!("{}/v0/sandboxes/{sandbox_id}/commands", self.api_base);
        let body = serde_json::json!({
            "cmd": command,
            "workdir": workdir,
            "timeout": timeout_ms / 1000,
        });

        let resp = self
            .authorized(self.http.post(&url))
            .timeout(Duration::from_millis(timeout_ms).max(Duration::from_secs(120)))
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("E2B run_command request failed: {e}"))?;

        let (status, body_text) = Self::read_body(resp).await;
        anyhow::ensure!(
            status.is_success(),
            "E2B API returned {status}: {body_text}"
        );

        let parsed: serde_json::Value = serde_json::from_str(&body_text)
            .map_err(|e| anyhow::anyhow!("Failed to parse E2B response: {e}\nBody: {body_text}"))?;

        Ok(CommandOutput {
            stdout: parsed["stdout"].as_str().unwrap_or("").to_string(),
            stderr: parsed["stderr"].as_str().unwrap_or("").to_string(),
            exit_code: parsed["exitCode"]
                .as_i64()
                .or_else(|| parsed["exit_code"].as_i64())
                .unwrap_or(0),
        })
    }

    async fn write_file(&self, sandbox_id: &str, path: &str, content: &str) -> anyhow::Result<()> {
        self.require_key()?;

        let url = format!(
            "{}/v0/sandboxes/{sandbox_id}/files?path={encoded}",
            self.api_base,
            encoded = urlencoding::encode(path)
        );

        let resp = self
            .authorized(self.http.post(&url))
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(content.to_string())
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("E2B write_file request failed: {e}"))?;

        let (status, body_text) = Self::read_body(resp).await;
        anyhow::ensure!(
            status.is_success(),
            "E2B API returned {status}: {body_text}"
        );
        Ok(())
    }

    async fn read_file(&self, sandbox_id: &str, path: &str) -> anyhow::Result<String> {
        self.require_key()?;

        let url = format!(
            "{}/v0/sandboxes/{sandbox_id}/files?path={encoded}",
            self.api_base,
            encoded = urlencoding::encode(path)
        );

        let resp = self
            .authorized(self.http.get(&url))
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("E2B read_file request failed: {e}"))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            anyhow::bail!("File not found: {path}");
        }

        let (status, body_text) = Self::read_body(resp).await;
        anyhow::ensure!(
            status.is_success(),
            "E2B API returned {status}: {body_text}"
        );
        Ok(body_text)
    }

    fn preview_url(&self, sandbox_id: &str, port: u16) -> String {
        format!("https://{port}-{sandbox_id}.{}", self.domain)
    }
}
