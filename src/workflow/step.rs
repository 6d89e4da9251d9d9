use crate::error::WorkflowError;
use crate::store::events::{load_step, save_step};
use crate::store::Store;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;

/// Step runner bound to one event. A step that already completed for this
/// event returns its stored output instead of running again.
#[derive(Clone)]
pub struct StepContext {
    store: Store,
    event_id: String,
}

impl StepContext {
    pub fn new(store: Store, event_id: impl Into<String>) -> Self {
        Self {
            store,
            event_id: event_id.into(),
        }
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub async fn run<T, F, Fut>(&self, name: &str, f: F) -> Result<T, WorkflowError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, WorkflowError>>,
    {
        let saved = self
            .store
            .with_conn(|conn| load_step(conn, &self.event_id, name))
            .map_err(WorkflowError::Store)?;
        if let Some(saved) = saved {
            tracing::debug!(event_id = %self.event_id, step = name, "step replayed from store");
            return serde_json::from_value(saved).map_err(|e| WorkflowError::Store(e.into()));
        }

        let value = f().await?;
        let json = serde_json::to_value(&value).map_err(|e| WorkflowError::Store(e.into()))?;
        self.store
            .with_conn(|conn| save_step(conn, &self.event_id, name, &json))
            .map_err(WorkflowError::Store)?;
        Ok(value)
    }
}
