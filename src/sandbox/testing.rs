//! Scripted in-memory [`SandboxClient`] for unit tests.

use super::{CommandOutput, SandboxClient};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;

struct Rule {
    needle: String,
    output: CommandOutput,
    remaining: Option<usize>,
}

/// Records every call. Commands succeed with empty output unless a rule
/// registered with [`ScriptedClient::on`] matches (substring, first wins).
#[derive(Default)]
pub struct ScriptedClient {
    rules: Mutex<Vec<Rule>>,
    commands: Mutex<Vec<String>>,
    files: Mutex<BTreeMap<String, String>>,
    created: Mutex<Vec<String>>,
    killed: Mutex<Vec<String>>,
    timeouts: Mutex<Vec<(String, u64)>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, needle: &str, exit_code: i64, stdout: &str) -> &Self {
        self.push_rule(needle, exit_code, stdout, None)
    }

    /// Rule that applies to the first `times` matching commands only.
    pub fn on_times(&self, needle: &str, exit_code: i64, stdout: &str, times: usize) -> &Self {
        self.push_rule(needle, exit_code, stdout, Some(times))
    }

    fn push_rule(&self, needle: &str, exit_code: i64, stdout: &str, remaining: Option<usize>) -> &Self {
        self.rules.lock().push(Rule {
            needle: needle.to_string(),
            output: CommandOutput {
                stdout: stdout.to_string(),
                stderr: if exit_code == 0 {
                    String::new()
                } else {
                    format!("{needle} failed")
                },
                exit_code,
            },
            remaining,
        });
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }

    pub fn ran(&self, needle: &str) -> bool {
        self.commands.lock().iter().any(|c| c.contains(needle))
    }

    pub fn position(&self, needle: &str) -> Option<usize> {
        self.commands.lock().iter().position(|c| c.contains(needle))
    }

    pub fn files(&self) -> BTreeMap<String, String> {
        self.files.lock().clone()
    }

    pub fn created(&self) -> Vec<String> {
        self.created.lock().clone()
    }

    pub fn killed(&self) -> Vec<String> {
        self.killed.lock().clone()
    }

    pub fn timeouts(&self) -> Vec<(String, u64)> {
        self.timeouts.lock().clone()
    }
}

#[async_trait]
impl SandboxClient for ScriptedClient {
    async fn create_sandbox(&self, template: &str, _timeout_ms: u64) -> anyhow::Result<String> {
        let mut created = self.created.lock();
        created.push(template.to_string());
        Ok(format!("sb-{}", created.len()))
    }

    async fn set_timeout(&self, sandbox_id: &str, timeout_ms: u64) -> anyhow::Result<()> {
        self.timeouts.lock().push((sandbox_id.to_string(), timeout_ms));
        Ok(())
    }

    async fn kill_sandbox(&self, sandbox_id: &str) -> anyhow::Result<()> {
        self.killed.lock().push(sandbox_id.to_string());
        Ok(())
    }

    async fn run_command(
        &self,
        _sandbox_id: &str,
        command: &str,
        _workdir: &str,
        _timeout_ms: u64,
    ) -> anyhow::Result<CommandOutput> {
        self.commands.lock().push(command.to_string());
        let mut rules = self.rules.lock();
        for rule in rules.iter_mut() {
            if rule.remaining == Some(0) || !command.contains(&rule.needle) {
                continue;
            }
            if let Some(n) = rule.remaining.as_mut() {
                *n -= 1;
            }
            return Ok(rule.output.clone());
        }
        Ok(CommandOutput::default())
    }

    async fn write_file(&self, _sandbox_id: &str, path: &str, content: &str) -> anyhow::Result<()> {
        self.files.lock().insert(path.to_string(), content.to_string());
        Ok(())
    }

    async fn read_file(&self, _sandbox_id: &str, path: &str) -> anyhow::Result<String> {
        self.files
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("File not found: {path}"))
    }

    fn preview_url(&self, sandbox_id: &str, port: u16) -> String {
        format!("https://{port}-{sandbox_id}.e2b.app")
    }
}

/// Runs commands through the host's `sh` in the given working directory so
/// tests observe real git behavior. `HOME` is a private directory, which
/// keeps `git config --global` away from the user's own config.
pub struct LocalShellClient {
    home: std::path::PathBuf,
}

impl LocalShellClient {
    pub fn new(home: impl Into<std::path::PathBuf>) -> Self {
        Self { home: home.into() }
    }
}

#[async_trait]
impl SandboxClient for LocalShellClient {
    async fn create_sandbox(&self, _template: &str, _timeout_ms: u64) -> anyhow::Result<String> {
        Ok("local".to_string())
    }

    async fn set_timeout(&self, _sandbox_id: &str, _timeout_ms: u64) -> anyhow::Result<()> {
        Ok(())
    }

    async fn kill_sandbox(&self, _sandbox_id: &str) -> anyhow::Result<()> {
        Ok(())
    }

    async fn run_command(
        &self,
        _sandbox_id: &str,
        command: &str,
        workdir: &str,
        _timeout_ms: u64,
    ) -> anyhow::Result<CommandOutput> {
        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(workdir)
            .env("HOME", &self.home)
            .env("GIT_CONFIG_NOSYSTEM", "1")
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .await?;
        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().map_or(-1, i64::from),
        })
    }

    async fn write_file(&self, _sandbox_id: &str, path: &str, content: &str) -> anyhow::Result<()> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    async fn read_file(&self, _sandbox_id: &str, path: &str) -> anyhow::Result<String> {
        Ok(tokio::fs::read_to_string(path).await?)
    }

    fn preview_url(&self, sandbox_id: &str, port: u16) -> String {
        format!("http://{port}-{sandbox_id}.localhost")
    }
}
