//! Wires configuration into the long-lived services.

use crate::config::Config;
use crate::github::GitHubClient;
use crate::observability::Metrics;
use crate::restore::RestoreOrchestrator;
use crate::sandbox::e2b::E2bSandboxClient;
use crate::sandbox::SandboxClient;
use crate::store::Store;
use crate::sync::{build_synchronizer, Synchronizer};
use crate::workflow::{GithubSyncFunction, RestoreCommitFunction, WorkflowEngine};
use anyhow::{Context, Result};
use std::sync::Arc;

pub struct App {
    pub config: Config,
    pub store: Store,
    pub metrics: Arc<Metrics>,
    pub synchronizer: Arc<dyn Synchronizer>,
    pub orchestrator: Arc<RestoreOrchestrator>,
    pub engine: Arc<WorkflowEngine>,
}

impl App {
    pub fn build(config: Config) -> Result<Self> {
        let db_path = config.store.resolved_db_path();
        let store = Store::open(&db_path)
            .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
        let sandboxes: Arc<dyn SandboxClient> = Arc::new(E2bSandboxClient::new(&config.sandbox)?);
        Self::with_parts(config, store, sandboxes)
    }

    /// Build around an existing store and sandbox provider.
    pub fn with_parts(
        config: Config,
        store: Store,
        sandboxes: Arc<dyn SandboxClient>,
    ) -> Result<Self> {
        if config.github.token.is_empty() {
            tracing::warn!("GitHub token is not configured; syncs and restores will fail");
        }

        let metrics = Arc::new(Metrics::new()?);
        let github = Arc::new(GitHubClient::new(&config.github)?);
        let synchronizer = build_synchronizer(&config, github.clone(), sandboxes.clone());
        let orchestrator = Arc::new(RestoreOrchestrator::new(
            store.clone(),
            github,
            sandboxes,
            &config,
        ));

        let engine = WorkflowEngine::new(store.clone(), config.workflow.clone(), metrics.clone())
            .register(Arc::new(GithubSyncFunction::new(
                synchronizer.clone(),
                store.clone(),
                metrics.clone(),
            )))
            .register(Arc::new(RestoreCommitFunction::new(
                orchestrator.clone(),
                metrics.clone(),
            )));

        Ok(Self {
            config,
            store,
            metrics,
            synchronizer,
            orchestrator,
            engine: Arc::new(engine),
        })
    }

    pub fn gateway_state(&self) -> crate::gateway::AppState {
        crate::gateway::AppState {
            engine: self.engine.clone(),
            store: self.store.clone(),
            metrics: self.metrics.clone(),
        }
    }
}
