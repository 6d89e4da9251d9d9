//! Logging setup and Prometheus counters.

use anyhow::Result;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Install the global `tracing` subscriber. `RUST_LOG` wins over `default_filter`.
pub fn init_tracing(default_filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_target(false)
        .try_init();
}

pub struct Metrics {
    registry: Registry,
    sync_total: IntCounterVec,
    restore_total: IntCounterVec,
    events_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let sync_total = IntCounterVec::new(
            Opts::new("snapsync_sync_total", "Repository synchronizations by action"),
            &["action"],
        )?;
        let restore_total = IntCounterVec::new(
            Opts::new("snapsync_restore_total", "Restores by outcome"),
            &["outcome"],
        )?;
        let events_total = IntCounterVec::new(
            Opts::new("snapsync_events_total", "Workflow events by name and final status"),
            &["name", "status"],
        )?;

        registry.register(Box::new(sync_total.clone()))?;
        registry.register(Box::new(restore_total.clone()))?;
        registry.register(Box::new(events_total.clone()))?;

        Ok(Self {
            registry,
            sync_total,
            restore_total,
            events_total,
        })
    }

    /// `action` is a [`crate::sync::SyncAction`] name or `failed`.
    pub fn record_sync(&self, action: &str) {
        self.sync_total.with_label_values(&[action]).inc();
    }

    pub fn record_restore(&self, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.restore_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_event(&self, name: &str, status: &str) {
        self.events_total.with_label_values(&[name, status]).inc();
    }

    /// Text exposition format.
    pub fn render(&self) -> Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8(buf)?)
    }
}
