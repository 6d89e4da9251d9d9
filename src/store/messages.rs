//! Chat message rows. A message belongs to a project and owns at most one
//! fragment.

use anyhow::Result;
use chrono::Utc;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Result,
    Error,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Result => "result",
            MessageKind::Error => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub project_id: String,
    pub role: Role,
    pub kind: MessageKind,
    pub content: String,
    pub created_at: String,
}

pub fn create_message(
    conn: &Connection,
    project_id: &str,
    role: Role,
    kind: MessageKind,
    content: &str,
) -> Result<Message> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO messages (id, project_id, role, kind, content, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, project_id, role.as_str(), kind.as_str(), content, now],
    )?;
    Ok(Message {
        id,
        project_id: project_id.to_string(),
        role,
        kind,
        content: content.to_string(),
        created_at: now,
    })
}
