//! Fragment persistence: generated files stored as a JSON map
//! `{"path": "content"}` plus the backup coordinates (`repository_name`,
//! `commit_sha`) filled in once a sync succeeds.

use super::messages::{create_message, MessageKind, Role};
use crate::error::SyncError;
use super::projects::{create_project, load_project};
use anyhow::Result;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fragment {
    pub id: String,
    pub message_id: String,
    pub title: String,
    pub files: BTreeMap<String, String>,
    pub sandbox_url: Option<String>,
    pub repository_name: Option<String>,
    pub commit_sha: Option<String>,
    pub created_at: String,
}

/// Fields supplied when a fragment is first recorded.
#[derive(Debug, Clone, Default)]
pub struct NewFragment<'a> {
    pub message_id: &'a str,
    pub title: &'a str,
    pub files: BTreeMap<String, String>,
    pub sandbox_url: Option<&'a str>,
    pub repository_name: Option<&'a str>,
}

/// A generated result as it arrives from outside: the project it belongs
/// to, the assistant message that produced it and its files.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentRecord {
    pub project_id: String,
    /// Used only when the project does not exist yet.
    #[serde(default)]
    pub project_name: Option<String>,
    /// Assistant message content; defaults to the title.
    #[serde(default)]
    pub message: Option<String>,
    pub title: String,
    pub files: BTreeMap<String, String>,
    #[serde(default)]
    pub sandbox_url: Option<String>,
}

impl FragmentRecord {
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.project_id.trim().is_empty() {
            return Err(SyncError::Validation("projectId must not be empty".into()));
        }
        if self.title.trim().is_empty() {
            return Err(SyncError::Validation("title must not be empty".into()));
        }
        for path in self.files.keys() {
            crate::sync::validate_path(path)?;
        }
        Ok(())
    }
}

const COLUMNS: &str =
    "id, message_id, title, files, sandbox_url, repository_name, commit_sha, created_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<(Fragment, String)> {
    let files_json: String = row.get(3)?;
    Ok((
        Fragment {
            id: row.get(0)?,
            message_id: row.get(1)?,
            title: row.get(2)?,
            files: BTreeMap::new(),
            sandbox_url: row.get(4)?,
            repository_name: row.get(5)?,
            commit_sha: row.get(6)?,
            created_at: row.get(7)?,
        },
        files_json,
    ))
}

fn decode((mut fragment, files_json): (Fragment, String)) -> Result<Fragment> {
    fragment.files = serde_json::from_str(&files_json)
        .map_err(|e| anyhow::anyhow!("Failed to deserialize fragment files: {e}"))?;
    Ok(fragment)
}

pub fn create_fragment(conn: &Connection, new: NewFragment<'_>) -> Result<Fragment> {
    let id = uuid::Uuid::new_v4().to_string();
    let files_json = serde_json::to_string(&new.files)
        .map_err(|e| anyhow::anyhow!("Failed to serialize fragment files: {e}"))?;
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO fragments (id, message_id, title, files, sandbox_url, repository_name, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            id,
            new.message_id,
            new.title,
            files_json,
            new.sandbox_url,
            new.repository_name,
            now
        ],
    )?;

    Ok(Fragment {
        id,
        message_id: new.message_id.to_string(),
        title: new.title.to_string(),
        files: new.files,
        sandbox_url: new.sandbox_url.map(String::from),
        repository_name: new.repository_name.map(String::from),
        commit_sha: None,
        created_at: now,
    })
}

/// Store `record` as a new fragment under a new assistant message, creating
/// the project on first use. All rows are written in one transaction.
pub fn record_fragment(conn: &Connection, record: &FragmentRecord) -> Result<Fragment> {
    let tx = conn.unchecked_transaction()?;
    if load_project(&tx, &record.project_id)?.is_none() {
        let name = record.project_name.as_deref().unwrap_or(&record.project_id);
        create_project(&tx, &record.project_id, name)?;
    }
    let message = create_message(
        &tx,
        &record.project_id,
        Role::Assistant,
        MessageKind::Result,
        record.message.as_deref().unwrap_or(&record.title),
    )?;
    let fragment = create_fragment(
        &tx,
        NewFragment {
            message_id: &message.id,
            title: &record.title,
            files: record.files.clone(),
            sandbox_url: record.sandbox_url.as_deref(),
            repository_name: None,
        },
    )?;
    tx.commit()?;
    Ok(fragment)
}

pub fn load_fragment(conn: &Connection, id: &str) -> Result<Option<Fragment>> {
    let row = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM fragments WHERE id = ?1"),
            params![id],
            from_row,
        )
        .optional()?;
    row.map(decode).transpose()
}

/// All fragments of a project, oldest first.
pub fn list_project_fragments(conn: &Connection, project_id: &str) -> Result<Vec<Fragment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {cols} FROM fragments f
         JOIN messages m ON m.id = f.message_id
         WHERE m.project_id = ?1
         ORDER BY f.created_at ASC",
        cols = COLUMNS
            .split(", ")
            .map(|c| format!("f.{c}"))
            .collect::<Vec<_>>()
            .join(", ")
    ))?;
    let rows = stmt.query_map(params![project_id], from_row)?;
    rows.map(|r| decode(r?)).collect()
}

/// Record the backup commit of one fragment. The update only touches a row
/// whose `commit_sha` is still unset; returns whether a row changed.
pub fn bind_commit_sha(
    conn: &Connection,
    fragment_id: &str,
    repository_name: &str,
    commit_sha: &str,
) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE fragments
         SET commit_sha = ?3,
             repository_name = COALESCE(repository_name, ?2)
         WHERE id = ?1 AND commit_sha IS NULL",
        params![fragment_id, repository_name, commit_sha],
    )?;
    Ok(changed > 0)
}
