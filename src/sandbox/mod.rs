//! Sandbox abstraction layer for snapsync.
//!
//! Defines the [`SandboxClient`] trait and [`CommandOutput`] type that a
//! sandbox provider implements, plus the [`Sandbox`] handle the synchronizer
//! and restore orchestrator work against.
//!
//! - [`e2b::E2bSandboxClient`]: E2B cloud MicroVM (requires an API key)
//!
//! Unlike a single-session agent, several workflow runs share one client,
//! so every operation names the sandbox it targets.

pub mod e2b;
pub mod git;
pub mod handle;
#[cfg(test)]
pub mod testing;

pub use handle::Sandbox;

use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

/// Output from a command executed inside a sandbox.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i64,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Short human-readable failure reason: stderr if present, else stdout.
    pub fn failure_reason(&self) -> String {
        let text = if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        };
        let tail: String = text
            .lines()
            .rev()
            .take(5)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect::<Vec<_>>()
            .join("\n");
        format!("exit code {}: {tail}", self.exit_code)
    }
}

/// Provider-agnostic sandbox interface.
#[async_trait]
pub trait SandboxClient: Send + Sync {
    /// Provision a new sandbox from `template`. Returns its ID.
    async fn create_sandbox(&self, template: &str, timeout_ms: u64) -> anyhow::Result<String>;

    /// Replace the idle timeout of a running sandbox.
    async fn set_timeout(&self, sandbox_id: &str, timeout_ms: u64) -> anyhow::Result<()>;

    /// Terminate a sandbox. Unknown sandboxes are treated as already gone.
    async fn kill_sandbox(&self, sandbox_id: &str) -> anyhow::Result<()>;

    /// Run a shell command inside the sandbox.
    async fn run_command(
        &self,
        sandbox_id: &str,
        command: &str,
        workdir: &str,
        timeout_ms: u64,
    ) -> anyhow::Result<CommandOutput>;

    /// Write content to an absolute path inside the sandbox.
    async fn write_file(&self, sandbox_id: &str, path: &str, content: &str) -> anyhow::Result<()>;

    /// Read a file from the sandbox as UTF-8.
    async fn read_file(&self, sandbox_id: &str, path: &str) -> anyhow::Result<String>;

    /// Public preview URL for a port.
    fn preview_url(&self, sandbox_id: &str, port: u16) -> String;
}

static PREVIEW_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://\d+-([A-Za-z0-9]+(?:-[A-Za-z0-9]+)*)\.[A-Za-z0-9.-]+(?::\d+)?(?:/.*)?$")
        .expect("preview URL pattern is valid")
});

/// Extract the sandbox ID from a preview URL such as
/// `https://3000-i0dk3x8rz09ofo4z2j1gr.e2b.app`.
pub fn extract_sandbox_id(sandbox_url: &str) -> Option<String> {
    PREVIEW_URL_RE
        .captures(sandbox_url.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Replace every occurrence of each secret with `***`.
pub fn redact(text: &str, secrets: &[String]) -> String {
    secrets
        .iter()
        .filter(|s| !s.is_empty())
        .fold(text.to_string(), |acc, secret| acc.replace(secret.as_str(), "***"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_id_from_preview_url() {
        assert_eq!(
            extract_sandbox_id("https://3000-i0dk3x8rz09ofo4z2j1gr.e2b.app").as_deref(),
            Some("i0dk3x8rz09ofo4z2j1gr")
        );
    }

    #[test]
    fn extracts_dashed_id_with_trailing_path() {
        assert_eq!(
            extract_sandbox_id("https://3000-abc123-def456.e2b.app/dashboard?x=1").as_deref(),
            Some("abc123-def456")
        );
    }

    #[test]
    fn rejects_urls_without_port_prefix() {
        assert!(extract_sandbox_id("https://example.com").is_none());
        assert!(extract_sandbox_id("not a url").is_none());
        assert!(extract_sandbox_id("").is_none());
    }

    #[test]
    fn redact_masks_all_secrets() {
        let secrets = vec!["ghp_abc".to_string(), String::new()];
        assert_eq!(
            redact("https://ghp_abc@github.com/o/r.git ghp_abc", &secrets),
            "https://***@github.com/o/r.git ***"
        );
    }

    #[test]
    fn failure_reason_prefers_stderr() {
        let out = CommandOutput {
            stdout: "partial".into(),
            stderr: "fatal: not a git repository".into(),
            exit_code: 128,
        };
        assert_eq!(out.failure_reason(), "exit code 128: fatal: not a git repository");
        assert!(!out.success());
    }
}
