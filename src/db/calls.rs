//! Call record persistence.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

/// A call record from the database.
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub id: i64,
    pub call_id: String,
    pub call_session_id: String,
    pub agent_name: Option<String>,
    pub status: String,
    pub transcript_text: Option<String>,
    pub error: Option<String>,
    pub started_at: String,
    pub ended_at: Option<String>,
}

/// Repository for call records, keyed by the backend-issued call id.
pub struct CallRepository;

impl CallRepository {
    /// Insert a new call record (status = connecting).
    pub fn insert(
        conn: &Connection,
        call_id: &str,
        call_session_id: &str,
        agent_name: Option<&str>,
    ) -> Result<i64> {
        conn.execute(
            "INSERT OR IGNORE INTO calls (call_id, call_session_id, agent_name) \
             VALUES (?1, ?2, ?3)",
            params![call_id, call_session_id, agent_name],
        )
        .context("Failed to insert call")?;

        Ok(conn.last_insert_rowid())
    }

    /// Mark a call as connected.
    pub fn mark_connected(conn: &Connection, call_id: &str) -> Result<()> {
        conn.execute(
            "UPDATE calls SET status = 'connected' WHERE call_id = ?1",
            params![call_id],
        )
        .context("Failed to mark call connected")?;
        Ok(())
    }

    /// Mark a call as ended, storing the final transcript.
    pub fn complete(conn: &Connection, call_id: &str, transcript_text: &str) -> Result<()> {
        conn.execute(
            "UPDATE calls SET status = 'ended', transcript_text = ?1, \
             ended_at = CURRENT_TIMESTAMP WHERE call_id = ?2",
            params![transcript_text, call_id],
        )
        .context("Failed to complete call")?;
        Ok(())
    }

    /// Mark a call as failed with an error.
    pub fn fail(conn: &Connection, call_id: &str, error: &str) -> Result<()> {
        conn.execute(
            "UPDATE calls SET status = 'error', error = ?1, \
             ended_at = CURRENT_TIMESTAMP WHERE call_id = ?2",
            params![error, call_id],
        )
        .context("Failed to mark call as failed")?;
        Ok(())
    }

    /// Get a call by its backend call id.
    pub fn get(conn: &Connection, call_id: &str) -> Result<Option<CallRecord>> {
        conn.query_row(
            "SELECT id, call_id, call_session_id, agent_name, status, \
             transcript_text, error, started_at, ended_at \
             FROM calls WHERE call_id = ?1",
            params![call_id],
            Self::map_row,
        )
        .optional()
        .context("Failed to query call")
    }

    /// List recent calls, newest first.
    pub fn list(conn: &Connection, limit: usize) -> Result<Vec<CallRecord>> {
        let mut stmt = conn
            .prepare(
                "SELECT id, call_id, call_session_id, agent_name, status, \
                 transcript_text, error, started_at, ended_at \
                 FROM calls ORDER BY started_at DESC LIMIT ?1",
            )
            .context("Failed to prepare call list query")?;

        let rows = stmt
            .query_map(params![limit as i64], Self::map_row)
            .context("Failed to query calls")?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CallRecord> {
        Ok(CallRecord {
            id: row.get(0)?,
            call_id: row.get(1)?,
            call_session_id: row.get(2)?,
            agent_name: row.get(3)?,
            status: row.get(4)?,
            transcript_text: row.get(5)?,
            error: row.get(6)?,
            started_at: row.get(7)?,
            ended_at: row.get(8)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrate;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn
    }

    #[test]
    fn test_insert_and_get() {
        let conn = test_conn();
        CallRepository::insert(&conn, "c1", "s1", Some("Maya")).unwrap();

        let record = CallRepository::get(&conn, "c1").unwrap().unwrap();
        assert_eq!(record.call_session_id, "s1");
        assert_eq!(record.agent_name.as_deref(), Some("Maya"));
        assert_eq!(record.status, "connecting");
        assert!(record.ended_at.is_none());
    }

    #[test]
    fn test_lifecycle_to_completed() {
        let conn = test_conn();
        CallRepository::insert(&conn, "c1", "s1", None).unwrap();
        CallRepository::mark_connected(&conn, "c1").unwrap();
        CallRepository::complete(&conn, "c1", "You: hi\nAgent: hello").unwrap();

        let record = CallRepository::get(&conn, "c1").unwrap().unwrap();
        assert_eq!(record.status, "ended");
        assert!(record.transcript_text.unwrap().contains("hello"));
        assert!(record.ended_at.is_some());
    }

    #[test]
    fn test_fail_records_error() {
        let conn = test_conn();
        CallRepository::insert(&conn, "c1", "s1", None).unwrap();
        CallRepository::fail(&conn, "c1", "join timeout").unwrap();

        let record = CallRepository::get(&conn, "c1").unwrap().unwrap();
        assert_eq!(record.status, "error");
        assert_eq!(record.error.as_deref(), Some("join timeout"));
    }

    #[test]
    fn test_duplicate_call_id_is_ignored() {
        let conn = test_conn();
        CallRepository::insert(&conn, "c1", "s1", None).unwrap();
        CallRepository::insert(&conn, "c1", "s2", None).unwrap();

        let records = CallRepository::list(&conn, 10).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].call_session_id, "s1");
    }

    #[test]
    fn test_list_respects_limit() {
        let conn = test_conn();
        for i in 0..5 {
            CallRepository::insert(&conn, &format!("c{i}"), "s", None).unwrap();
        }
        assert_eq!(CallRepository::list(&conn, 3).unwrap().len(), 3);
    }
}
