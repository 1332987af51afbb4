//! SQLite-backed call history.
//!
//! Raw SQL with rusqlite, no ORM. Connections are opened per operation; the
//! schema is migrated on every open.

pub mod calls;

use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn init_db() -> Result<Connection> {
    let db_path = crate::global::db_file()?;

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    let conn = Connection::open(&db_path).context("Failed to open database connection")?;

    migrate(&conn)?;

    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS calls (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            call_id TEXT NOT NULL UNIQUE,
            call_session_id TEXT NOT NULL,
            agent_name TEXT,
            status TEXT NOT NULL DEFAULT 'connecting',
            transcript_text TEXT,
            error TEXT,
            started_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            ended_at TIMESTAMP
        )",
        [],
    )
    .context("Failed to create calls table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_calls_started_at ON calls(started_at DESC)",
        [],
    )
    .context("Failed to create calls started_at index")?;

    Ok(())
}
