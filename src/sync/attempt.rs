//! Ordered fallback attempts.
//!
//! Some sandbox steps have several ways to succeed (stage an explicit path
//! list, else everything; push without force, else with lease...). Each
//! variant is one [`Attempt`]; [`run_attempts`] tries them in order and
//! stops at the first success.

use crate::error::SyncError;
use crate::sandbox::{CommandOutput, Sandbox};

#[derive(Debug, Clone)]
pub struct Attempt {
    pub label: String,
    pub command: String,
    pub timeout_ms: u64,
}

impl Attempt {
    pub fn new(label: impl Into<String>, command: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            label: label.into(),
            command: command.into(),
            timeout_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    pub label: String,
    pub reason: String,
}

#[derive(Debug)]
pub enum AttemptOutcome {
    Succeeded {
        label: String,
        output: CommandOutput,
        failures: Vec<AttemptFailure>,
    },
    Exhausted {
        failures: Vec<AttemptFailure>,
    },
}

impl AttemptOutcome {
    /// Collapse into a result; exhaustion becomes a tooling error listing
    /// every reason.
    pub fn into_result(self, step: &str) -> Result<CommandOutput, SyncError> {
        match self {
            AttemptOutcome::Succeeded { output, .. } => Ok(output),
            AttemptOutcome::Exhausted { failures } => {
                let reasons = failures
                    .iter()
                    .map(|f| format!("[{}] {}", f.label, f.reason))
                    .collect::<Vec<_>>()
                    .join("; ");
                Err(SyncError::tooling(step, format!("all attempts failed: {reasons}")))
            }
        }
    }
}

pub async fn run_attempts(sandbox: &Sandbox, step: &str, attempts: &[Attempt]) -> AttemptOutcome {
    let mut failures = Vec::new();

    for attempt in attempts {
        let reason = match sandbox.run(step, &attempt.command, attempt.timeout_ms).await {
            Ok(output) if output.success() => {
                if !failures.is_empty() {
                    tracing::info!(step, label = %attempt.label, "fallback attempt succeeded");
                }
                return AttemptOutcome::Succeeded {
                    label: attempt.label.clone(),
                    output,
                    failures,
                };
            }
            Ok(output) => output.failure_reason(),
            Err(e) => e.to_string(),
        };

        tracing::warn!(step, label = %attempt.label, %reason, "attempt failed");
        failures.push(AttemptFailure {
            label: attempt.label.clone(),
            reason,
        });
    }

    AttemptOutcome::Exhausted { failures }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::testing::ScriptedClient;
    use std::sync::Arc;

    fn attempts() -> Vec<Attempt> {
        vec![
            Attempt::new("explicit paths", "git add app/", 1_000),
            Attempt::new("everything", "git add .", 1_000),
            Attempt::new("all tracked and untracked", "git add -A", 1_000),
        ]
    }

    #[tokio::test]
    async fn stops_at_first_success() {
        let client = Arc::new(ScriptedClient::new());
        let sandbox = Sandbox::connect(client.clone(), "sb", "/home/user");
        let outcome = run_attempts(&sandbox, "git add", &attempts()).await;
        assert!(matches!(outcome, AttemptOutcome::Succeeded { ref label, .. } if label == "explicit paths"));
        assert_eq!(client.commands(), vec!["git add app/"]);
    }

    #[tokio::test]
    async fn falls_through_in_order_and_records_failures() {
        let client = Arc::new(ScriptedClient::new());
        client.on("git add app/", 128, "").on("git add .", 1, "");
        let sandbox = Sandbox::connect(client.clone(), "sb", "/home/user");

        match run_attempts(&sandbox, "git add", &attempts()).await {
            AttemptOutcome::Succeeded { label, failures, .. } => {
                assert_eq!(label, "all tracked and untracked");
                assert_eq!(failures.len(), 2);
                assert_eq!(failures[0].label, "explicit paths");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(client.commands().len(), 3);
    }

    #[tokio::test]
    async fn exhaustion_lists_every_reason() {
        let client = Arc::new(ScriptedClient::new());
        client.on("git add", 1, "");
        let sandbox = Sandbox::connect(client, "sb", "/home/user");

        let err = run_attempts(&sandbox, "git add", &attempts())
            .await
            .into_result("git add")
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("[explicit paths]"));
        assert!(msg.contains("[all tracked and untracked]"));
    }
}
