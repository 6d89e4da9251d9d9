//! Dev server started in the background of a restored sandbox.

use crate::error::SyncError;
use crate::sandbox::Sandbox;

const START_TIMEOUT_MS: u64 = 30_000;
const PROBE_TIMEOUT_MS: u64 = 15_000;
const LOG_PATH: &str = "/tmp/snapsync-dev.log";

#[derive(Debug, Clone)]
pub struct DevServer {
    command: String,
    port: u16,
}

/// A dev server that has been launched. `pid` is `None` when the shell did
/// not report one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningDevServer {
    pub pid: Option<u32>,
    pub port: u16,
}

impl DevServer {
    pub fn new(command: impl Into<String>, port: u16) -> Self {
        Self {
            command: command.into(),
            port,
        }
    }

    /// Launch detached and capture the PID.
    pub async fn start(&self, sandbox: &Sandbox) -> Result<RunningDevServer, SyncError> {
        let out = sandbox
            .run_checked(
                "start dev server",
                &format!("nohup {} > {LOG_PATH} 2>&1 & echo $!", self.command),
                START_TIMEOUT_MS,
            )
            .await?;
        let pid = out.stdout.trim().lines().last().and_then(|l| l.trim().parse().ok());
        tracing::info!(sandbox_id = %sandbox.id(), ?pid, port = self.port, "dev server started");
        Ok(RunningDevServer {
            pid,
            port: self.port,
        })
    }
}

impl RunningDevServer {
    /// Whether the server answers on its port. Never fails.
    pub async fn health_check(&self, sandbox: &Sandbox) -> bool {
        let probe = format!("curl -sf -o /dev/null http://localhost:{}", self.port);
        match sandbox.run("dev server health", &probe, PROBE_TIMEOUT_MS).await {
            Ok(out) => out.success(),
            Err(e) => {
                tracing::debug!(error = %e, "dev server probe errored");
                false
            }
        }
    }

    pub async fn stop(&self, sandbox: &Sandbox) -> Result<(), SyncError> {
        let Some(pid) = self.pid else {
            return Ok(());
        };
        sandbox
            .run_checked(
                "stop dev server",
                &format!("kill {pid} 2>/dev/null || true"),
                PROBE_TIMEOUT_MS,
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::testing::ScriptedClient;
    use std::sync::Arc;

    #[tokio::test]
    async fn start_captures_pid_and_stop_kills_it() {
        let client = Arc::new(ScriptedClient::new());
        client.on("nohup npm run dev", 0, "4242\n");
        let sandbox = Sandbox::connect(client.clone(), "sb", "/home/user");

        let server = DevServer::new("npm run dev", 3000).start(&sandbox).await.unwrap();
        assert_eq!(server.pid, Some(4242));

        server.stop(&sandbox).await.unwrap();
        assert!(client.ran("kill 4242"));
    }

    #[tokio::test]
    async fn health_check_reflects_curl_exit() {
        let client = Arc::new(ScriptedClient::new());
        client.on_times("curl", 7, "", 1);
        let sandbox = Sandbox::connect(client, "sb", "/home/user");
        let server = RunningDevServer {
            pid: None,
            port: 3000,
        };

        assert!(!server.health_check(&sandbox).await);
        assert!(server.health_check(&sandbox).await);
    }

    #[tokio::test]
    async fn stop_without_pid_is_a_no_op() {
        let client = Arc::new(ScriptedClient::new());
        let sandbox = Sandbox::connect(client.clone(), "sb", "/home/user");
        RunningDevServer { pid: None, port: 3000 }.stop(&sandbox).await.unwrap();
        assert!(client.commands().is_empty());
    }
}
