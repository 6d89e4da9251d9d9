use super::{StepContext, WorkflowFunction};
use crate::config::WorkflowConfig;
use crate::error::WorkflowError;
use crate::observability::Metrics;
use crate::store::events::{
    insert_event, load_event, mark_completed, mark_failed, mark_queued, mark_running,
    pending_event_ids, EventRecord, EventStatus,
};
use crate::store::Store;
use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub struct WorkflowEngine {
    store: Store,
    config: WorkflowConfig,
    metrics: Arc<Metrics>,
    functions: HashMap<&'static str, Arc<dyn WorkflowFunction>>,
    tx: mpsc::Sender<String>,
    rx: parking_lot::Mutex<Option<mpsc::Receiver<String>>>,
}

impl WorkflowEngine {
    pub fn new(store: Store, config: WorkflowConfig, metrics: Arc<Metrics>) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        Self {
            store,
            config,
            metrics,
            functions: HashMap::new(),
            tx,
            rx: parking_lot::Mutex::new(Some(rx)),
        }
    }

    pub fn register(mut self, function: Arc<dyn WorkflowFunction>) -> Self {
        tracing::debug!(function = function.id(), event = function.event(), "registered");
        self.functions.insert(function.event(), function);
        self
    }

    fn db<T>(&self, f: impl FnOnce(&Connection) -> anyhow::Result<T>) -> Result<T, WorkflowError> {
        self.store.with_conn(f).map_err(WorkflowError::Store)
    }

    /// Persist an event and queue it. Returns the event ID.
    pub async fn send(&self, name: &str, payload: serde_json::Value) -> Result<String, WorkflowError> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| WorkflowError::UnknownEvent(name.to_string()))?;
        function.validate(&payload)?;

        let id = self.db(|conn| insert_event(conn, name, &payload))?;
        self.tx
            .send(id.clone())
            .await
            .map_err(|_| WorkflowError::QueueClosed)?;
        tracing::info!(event_id = %id, event = name, "event queued");
        Ok(id)
    }

    pub fn event_status(&self, id: &str) -> Result<EventRecord, WorkflowError> {
        self.db(|conn| load_event(conn, id))?
            .ok_or_else(|| WorkflowError::EventNotFound(id.to_string()))
    }

    /// Spawn the worker pool and re-dispatch unfinished events. Can only be
    /// called once.
    pub fn start(self: &Arc<Self>) -> Result<Vec<JoinHandle<()>>, WorkflowError> {
        let rx = self.rx.lock().take().ok_or(WorkflowError::QueueClosed)?;
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let mut handles: Vec<JoinHandle<()>> = (0..self.config.workers.max(1))
            .map(|worker| {
                let engine = Arc::clone(self);
                let rx = Arc::clone(&rx);
                tokio::spawn(async move {
                    loop {
                        let next = rx.lock().await.recv().await;
                        let Some(id) = next else { break };
                        engine.process(&id).await;
                    }
                    tracing::debug!(worker, "workflow worker stopped");
                })
            })
            .collect();

        let pending = self.db(pending_event_ids)?;
        if !pending.is_empty() {
            tracing::info!(count = pending.len(), "re-dispatching unfinished events");
            let tx = self.tx.clone();
            handles.push(tokio::spawn(async move {
                for id in pending {
                    if tx.send(id).await.is_err() {
                        break;
                    }
                }
            }));
        }
        Ok(handles)
    }

    async fn process(&self, id: &str) {
        if let Err(e) = self.try_process(id).await {
            tracing::error!(event_id = %id, error = %e, "event bookkeeping failed");
        }
    }

    async fn try_process(&self, id: &str) -> Result<(), WorkflowError> {
        let Some(event) = self.db(|conn| load_event(conn, id))? else {
            tracing::warn!(event_id = %id, "dispatched event no longer exists");
            return Ok(());
        };
        if matches!(event.status, EventStatus::Completed | EventStatus::Failed) {
            return Ok(());
        }

        let Some(function) = self.functions.get(event.name.as_str()).cloned() else {
            let err = WorkflowError::UnknownEvent(event.name.clone());
            self.db(|conn| mark_failed(conn, id, &err.to_string()))?;
            return Ok(());
        };

        let attempt = self.db(|conn| mark_running(conn, id))?;
        if attempt > self.config.max_attempts {
            self.fail(&event, "attempts exhausted")?;
            return Ok(());
        }
        tracing::info!(event_id = %id, function = function.id(), attempt, "running");

        let ctx = StepContext::new(self.store.clone(), id);
        match function.run(&event, &ctx).await {
            Ok(output) => {
                self.db(|conn| mark_completed(conn, id, &output))?;
                self.metrics.record_event(&event.name, EventStatus::Completed.as_str());
                tracing::info!(event_id = %id, function = function.id(), "completed");
            }
            Err(e) if e.is_retryable() && attempt < self.config.max_attempts => {
                let delay = backoff(&self.config, attempt);
                let reason = e.to_string();
                self.db(|conn| mark_queued(conn, id, Some(&reason)))?;
                self.metrics.record_event(&event.name, "retrying");
                tracing::warn!(event_id = %id, attempt, error = %e, delay_ms = delay.as_millis() as u64, "retrying");
                self.schedule_retry(id.to_string(), delay);
            }
            Err(e) => self.fail(&event, &e.to_string())?,
        }
        Ok(())
    }

    fn fail(&self, event: &EventRecord, reason: &str) -> Result<(), WorkflowError> {
        self.db(|conn| mark_failed(conn, &event.id, reason))?;
        self.metrics.record_event(&event.name, EventStatus::Failed.as_str());
        tracing::error!(event_id = %event.id, event = %event.name, error = reason, "event failed");
        Ok(())
    }

    fn schedule_retry(&self, id: String, delay: Duration) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(id).await.is_err() {
                tracing::warn!("workflow queue closed before retry");
            }
        });
    }
}

/// `retry_base_ms * 2^(attempt - 1)`, capped at `retry_max_ms`.
fn backoff(config: &WorkflowConfig, attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(20);
    let ms = config
        .retry_base_ms
        .saturating_mul(1u64 << exp)
        .min(config.retry_max_ms);
    Duration::from_millis(ms)
}
