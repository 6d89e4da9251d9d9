//! snapsync store layer: SQLite-backed persistence for projects, messages,
//! fragments and workflow events.
//!
//! All data lives in a single database file at `store.db_path`. Table
//! helpers are free functions over a [`Connection`]; [`Store`] shares one
//! connection between the gateway and the workflow workers.

pub mod events;
pub mod fragments;
pub mod messages;
pub mod projects;

use anyhow::Result;
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;

const SCHEMA: &str = "
    PRAGMA foreign_keys=ON;

    CREATE TABLE IF NOT EXISTS projects (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY,
        project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        role TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
        kind TEXT NOT NULL CHECK (kind IN ('result', 'error')),
        content TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS fragments (
        id TEXT PRIMARY KEY,
        message_id TEXT NOT NULL UNIQUE REFERENCES messages(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        files TEXT NOT NULL,
        sandbox_url TEXT,
        repository_name TEXT,
        commit_sha TEXT,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_fragments_repository ON fragments(repository_name);

    CREATE TABLE IF NOT EXISTS events (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        payload TEXT NOT NULL,
        status TEXT NOT NULL CHECK (status IN ('queued', 'running', 'completed', 'failed')),
        attempts INTEGER NOT NULL DEFAULT 0,
        output TEXT,
        error TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS step_results (
        event_id TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
        step TEXT NOT NULL,
        output TEXT NOT NULL,
        created_at TEXT NOT NULL,
        PRIMARY KEY (event_id, step)
    );
";

/// Initialize the snapsync SQLite database and create tables if needed.
pub fn init_db(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}

/// Shared handle to the database.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = init_db(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` with exclusive access to the connection.
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock();
        f(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn init_db_creates_parent_dirs_and_tables() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("snapsync.db");
        let conn = init_db(&path).unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('projects', 'messages', 'fragments', 'events', 'step_results')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 5);
    }

    #[test]
    fn init_db_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("snapsync.db");
        init_db(&path).unwrap();
        init_db(&path).unwrap();
    }
}
