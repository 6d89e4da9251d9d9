//! Workflow event log and memoised step outputs.

use anyhow::Result;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Queued => "queued",
            EventStatus::Running => "running",
            EventStatus::Completed => "completed",
            EventStatus::Failed => "failed",
        }
    }

    fn parse(s: &str) -> Result<Self> {
        Ok(match s {
            "queued" => EventStatus::Queued,
            "running" => EventStatus::Running,
            "completed" => EventStatus::Completed,
            "failed" => EventStatus::Failed,
            other => anyhow::bail!("unknown event status '{other}'"),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: String,
    pub name: String,
    pub payload: serde_json::Value,
    pub status: EventStatus,
    pub attempts: u32,
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub fn insert_event(conn: &Connection, name: &str, payload: &serde_json::Value) -> Result<String> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO events (id, name, payload, status, attempts, created_at, updated_at)
         VALUES (?1, ?2, ?3, 'queued', 0, ?4, ?4)",
        params![id, name, payload.to_string(), now],
    )?;
    Ok(id)
}

pub fn load_event(conn: &Connection, id: &str) -> Result<Option<EventRecord>> {
    let row = conn
        .query_row(
            "SELECT id, name, payload, status, attempts, output, error, created_at, updated_at
             FROM events WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, u32>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, String>(8)?,
                ))
            },
        )
        .optional()?;

    let Some((id, name, payload, status, attempts, output, error, created_at, updated_at)) = row
    else {
        return Ok(None);
    };

    Ok(Some(EventRecord {
        id,
        name,
        payload: serde_json::from_str(&payload)?,
        status: EventStatus::parse(&status)?,
        attempts,
        output: output.map(|o| serde_json::from_str(&o)).transpose()?,
        error,
        created_at,
        updated_at,
    }))
}

/// Mark an event running and bump its attempt counter. Returns the new count.
pub fn mark_running(conn: &Connection, id: &str) -> Result<u32> {
    let now = Utc::now().to_rfc3339();
    let attempts = conn.query_row(
        "UPDATE events SET status = 'running', attempts = attempts + 1, updated_at = ?2
         WHERE id = ?1
         RETURNING attempts",
        params![id, now],
        |row| row.get(0),
    )?;
    Ok(attempts)
}

pub fn mark_completed(conn: &Connection, id: &str, output: &serde_json::Value) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE events SET status = 'completed', output = ?2, error = NULL, updated_at = ?3
         WHERE id = ?1",
        params![id, output.to_string(), now],
    )?;
    Ok(())
}

pub fn mark_failed(conn: &Connection, id: &str, error: &str) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE events SET status = 'failed', error = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, error, now],
    )?;
    Ok(())
}

/// Put an event back in the queue after a retryable failure.
pub fn mark_queued(conn: &Connection, id: &str, last_error: Option<&str>) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE events SET status = 'queued', error = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, last_error, now],
    )?;
    Ok(())
}

/// IDs of events that never reached a terminal state, oldest first.
pub fn pending_event_ids(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT id FROM events WHERE status IN ('queued', 'running') ORDER BY created_at ASC",
    )?;
    let ids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(ids)
}

pub fn load_step(conn: &Connection, event_id: &str, step: &str) -> Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT output FROM step_results WHERE event_id = ?1 AND step = ?2",
            params![event_id, step],
            |row| row.get(0),
        )
        .optional()?;
    Ok(raw.map(|r| serde_json::from_str(&r)).transpose()?)
}

pub fn save_step(
    conn: &Connection,
    event_id: &str,
    step: &str,
    output: &serde_json::Value,
) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO step_results (event_id, step, output, created_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(event_id, step) DO UPDATE SET output = excluded.output",
        params![event_id, step, output.to_string(), now],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use serde_json::json;

    #[test]
    fn event_lifecycle() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_conn(|conn| {
                let id = insert_event(conn, "restore-commit/project", &json!({"projectId": "p"}))?;
                assert_eq!(load_event(conn, &id)?.unwrap().status, EventStatus::Queued);

                assert_eq!(mark_running(conn, &id)?, 1);
                mark_queued(conn, &id, Some("transient"))?;
                assert_eq!(mark_running(conn, &id)?, 2);

                mark_completed(conn, &id, &json!({"success": true}))?;
                let done = load_event(conn, &id)?.unwrap();
                assert_eq!(done.status, EventStatus::Completed);
                assert_eq!(done.attempts, 2);
                assert_eq!(done.output, Some(json!({"success": true})));
                assert!(done.error.is_none());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn pending_excludes_terminal_events() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_conn(|conn| {
                let a = insert_event(conn, "x", &json!({}))?;
                let b = insert_event(conn, "x", &json!({}))?;
                mark_failed(conn, &b, "boom")?;
                assert_eq!(pending_event_ids(conn)?, vec![a]);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn steps_are_memoised_per_event() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_conn(|conn| {
                let id = insert_event(conn, "x", &json!({}))?;
                assert!(load_step(conn, &id, "sync-to-github")?.is_none());
                save_step(conn, &id, "sync-to-github", &json!({"commitSha": "abc"}))?;
                assert_eq!(
                    load_step(conn, &id, "sync-to-github")?,
                    Some(json!({"commitSha": "abc"}))
                );
                Ok(())
            })
            .unwrap();
    }
}
