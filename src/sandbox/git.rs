//! git helpers for commands run inside a sandbox.

use super::Sandbox;
use crate::error::SyncError;

const PROBE_TIMEOUT_MS: u64 = 30_000;

/// Make sure `git` is available, installing it with apt when missing.
pub async fn ensure_git(sandbox: &Sandbox, install_timeout_ms: u64) -> Result<(), SyncError> {
    let probe = sandbox.run("git probe", "git --version", PROBE_TIMEOUT_MS).await?;
    if probe.success() {
        return Ok(());
    }

    tracing::info!(sandbox_id = %sandbox.id(), "git missing, installing");
    sandbox
        .run_checked(
            "git install",
            "sudo apt-get update && sudo apt-get install -y git",
            install_timeout_ms,
        )
        .await?;
    Ok(())
}

/// Quote a value for POSIX `sh`.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// `git rev-parse HEAD`, or `None` when there is no commit yet.
pub async fn head_sha(sandbox: &Sandbox, timeout_ms: u64) -> Result<Option<String>, SyncError> {
    let out = sandbox.run("git rev-parse", "git rev-parse HEAD", timeout_ms).await?;
    let sha = out.stdout.trim();
    if out.success() && !sha.is_empty() {
        Ok(Some(sha.to_string()))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::testing::ScriptedClient;
    use std::sync::Arc;

    #[test]
    fn quotes_single_quotes() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[tokio::test]
    async fn skips_install_when_git_present() {
        let client = Arc::new(ScriptedClient::new());
        client.on("git --version", 0, "git version 2.43.0");
        let sandbox = Sandbox::connect(client.clone(), "sb", "/home/user");
        ensure_git(&sandbox, 1_000).await.unwrap();
        assert!(!client.ran("apt-get"));
    }

    #[tokio::test]
    async fn installs_when_probe_fails() {
        let client = Arc::new(ScriptedClient::new());
        client.on("git --version", 127, "");
        let sandbox = Sandbox::connect(client.clone(), "sb", "/home/user");
        ensure_git(&sandbox, 1_000).await.unwrap();
        assert!(client.ran("apt-get install -y git"));
    }

    #[tokio::test]
    async fn install_failure_is_tooling_error() {
        let client = Arc::new(ScriptedClient::new());
        client.on("git --version", 127, "").on("apt-get", 100, "");
        let sandbox = Sandbox::connect(client, "sb", "/home/user");
        let err = ensure_git(&sandbox, 1_000).await.unwrap_err();
        assert!(matches!(err, SyncError::Tooling { ref step, .. } if step == "git install"));
    }

    #[tokio::test]
    async fn head_sha_is_none_without_commits() {
        let client = Arc::new(ScriptedClient::new());
        client.on("git rev-parse HEAD", 128, "");
        let sandbox = Sandbox::connect(client, "sb", "/home/user");
        assert!(head_sha(&sandbox, 1_000).await.unwrap().is_none());
    }
}
