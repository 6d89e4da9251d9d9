//! Configuration schema for snapsync.
//!
//! Every section has a `Default` so a missing or partial `config.toml`
//! still yields a usable configuration. Secrets are never read from the
//! environment outside [`Config::apply_env_overrides`]; downstream
//! components receive them through their constructors.

use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    pub github: GitHubConfig,
    pub sandbox: SandboxConfig,
    pub sync: SyncConfig,
    pub restore: RestoreConfig,
    pub workflow: WorkflowConfig,
    pub gateway: GatewayConfig,
    pub store: StoreConfig,

    /// Path the config was loaded from (not serialized).
    #[serde(skip)]
    #[schemars(skip)]
    pub config_path: PathBuf,
}

/// GitHub credentials and repository placement.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct GitHubConfig {
    /// Personal access token. Overridden by `GITHUB_TOKEN`.
    pub token: String,
    /// Account that owns backup repositories when `org` is unset.
    pub owner: String,
    /// Organization that owns backup repositories. Takes precedence over `owner`.
    pub org: Option<String>,
    /// REST API base URL.
    pub api_base: String,
    /// Web base URL used to build repository links and clone URLs.
    pub web_base: String,
    /// Branch that receives backup commits.
    pub default_branch: String,
    /// Identity used for commits made inside sandboxes.
    pub committer_name: String,
    pub committer_email: String,
    pub request_timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            owner: "backup_admin".into(),
            org: None,
            api_base: "https://api.github.com".into(),
            web_base: "https://github.com".into(),
            default_branch: "main".into(),
            committer_name: "backup_admin".into(),
            committer_email: "backup@snapsync.local".into(),
            request_timeout_secs: 30,
        }
    }
}

impl GitHubConfig {
    /// Account or organization that owns the backup repositories.
    pub fn repo_owner(&self) -> &str {
        self.org
            .as_deref()
            .filter(|o| !o.is_empty())
            .unwrap_or(&self.owner)
    }
}

/// E2B sandbox provider settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SandboxConfig {
    /// E2B API key. Overridden by `E2B_API_KEY`.
    pub api_key: String,
    pub api_base: String,
    /// Domain used to derive preview hosts (`<port>-<id>.<domain>`).
    pub domain: String,
    /// Working directory of generated projects inside a sandbox.
    pub workdir: String,
    /// Default per-command timeout.
    pub command_timeout_ms: u64,
    /// Extra time granted to the HTTP round trip on top of a command timeout.
    pub request_grace_ms: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: "https://api.e2b.dev".into(),
            domain: "e2b.app".into(),
            workdir: "/home/user".into(),
            command_timeout_ms: 60_000,
            request_grace_ms: 10_000,
        }
    }
}

/// Which synchronizer implementation backs up sandbox files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SyncStrategy {
    /// Build blobs, trees and commits through the GitHub REST API.
    #[default]
    Api,
    /// Run git inside the sandbox and push.
    Shell,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SyncConfig {
    pub strategy: SyncStrategy,
    /// Maximum in-flight blob uploads.
    pub blob_concurrency: usize,
    /// Layer the new tree on top of the previous one instead of replacing it.
    pub preserve_unlisted_files: bool,
    /// Polls of the default branch after creating a repository.
    pub provisioning_attempts: u32,
    pub provisioning_delay_ms: u64,
    pub install_timeout_ms: u64,
    pub clone_timeout_ms: u64,
    pub push_timeout_ms: u64,
    pub add_timeout_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            strategy: SyncStrategy::Api,
            blob_concurrency: 8,
            preserve_unlisted_files: false,
            provisioning_attempts: 5,
            provisioning_delay_ms: 1_000,
            install_timeout_ms: 180_000,
            clone_timeout_ms: 300_000,
            push_timeout_ms: 120_000,
            add_timeout_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RestoreConfig {
    /// Sandbox template used for restored projects.
    pub template: String,
    /// Idle timeout applied to a freshly provisioned sandbox.
    pub sandbox_timeout_ms: u64,
    pub clone_timeout_ms: u64,
    pub checkout_timeout_ms: u64,
    pub install_timeout_ms: u64,
    pub dev_command: String,
    pub dev_port: u16,
    /// Wait between starting the dev server and probing it.
    pub startup_delay_ms: u64,
    /// Times a dev server that does not answer is stopped and started again.
    pub dev_restarts: u32,
    /// Kill the new sandbox when a step after provisioning fails.
    pub kill_on_failure: bool,
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            template: "nextjs-app".into(),
            sandbox_timeout_ms: 900_000,
            clone_timeout_ms: 300_000,
            checkout_timeout_ms: 120_000,
            install_timeout_ms: 300_000,
            dev_command: "npm run dev".into(),
            dev_port: 3000,
            startup_delay_ms: 5_000,
            dev_restarts: 1,
            kill_on_failure: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Concurrent event workers.
    pub workers: usize,
    pub max_attempts: u32,
    pub retry_base_ms: u64,
    pub retry_max_ms: u64,
    /// Capacity of the in-memory dispatch queue.
    pub queue_capacity: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            max_attempts: 3,
            retry_base_ms: 1_000,
            retry_max_ms: 30_000,
            queue_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
    pub request_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            max_body_bytes: 10 * 1024 * 1024,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file. `~` is expanded. Overridden by `SNAPSYNC_DB_PATH`.
    pub db_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: "~/.snapsync/snapsync.db".into(),
        }
    }
}

impl StoreConfig {
    pub fn resolved_db_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.db_path).into_owned())
    }
}

impl Config {
    /// Load the config from `path`, or from `~/.snapsync/config.toml` when
    /// `path` is `None`. A missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(shellexpand::tilde(&p.to_string_lossy()).into_owned()),
            None => default_config_path()?,
        };

        let mut config = if config_path.exists() {
            let raw = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config {}", config_path.display()))?;
            toml::from_str::<Config>(&raw)
                .with_context(|| format!("Failed to parse config {}", config_path.display()))?
        } else {
            tracing::debug!(path = %config_path.display(), "config file not found, using defaults");
            Config::default()
        };

        config.config_path = config_path;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides. This is the only place the
    /// process environment is consulted.
    pub fn apply_env_overrides(&mut self) {
        if let Some(token) = non_empty_env("GITHUB_TOKEN") {
            self.github.token = token;
        }
        if let Some(owner) = non_empty_env("GITHUB_OWNER") {
            self.github.owner = owner;
        }
        if let Some(org) = non_empty_env("GITHUB_ORG") {
            self.github.org = Some(org);
        }
        if let Some(key) = non_empty_env("E2B_API_KEY") {
            self.sandbox.api_key = key;
        }
        if let Some(path) = non_empty_env("SNAPSYNC_DB_PATH") {
            self.store.db_path = path;
        }
    }

    /// Config rendered as TOML with secrets masked.
    pub fn redacted_toml(&self) -> Result<String> {
        let mut copy = self.clone();
        if !copy.github.token.is_empty() {
            copy.github.token = "***".into();
        }
        if !copy.sandbox.api_key.is_empty() {
            copy.sandbox.api_key = "***".into();
        }
        toml::to_string_pretty(&copy).context("Failed to serialize config")
    }
}

/// JSON Schema for `config.toml`.
pub fn config_json_schema() -> Result<String> {
    let schema = schemars::schema_for!(Config);
    serde_json::to_string_pretty(&schema).context("Failed to serialize config schema")
}

fn default_config_path() -> Result<PathBuf> {
    let dirs = directories::UserDirs::new()
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
    Ok(dirs.home_dir().join(".snapsync").join("config.toml"))
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
