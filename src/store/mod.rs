//! Durable session persistence, keyed by session name.
//!
//! Writes are last-writer-wins: saves upsert, and the single connection
//! mutex serializes concurrent writers.

mod schema;

use crate::error::{Error, Result};
use crate::session::{AssignmentStatus, EnsembleSession, SessionStatus};
use chrono::{DateTime, Timelike, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use schema::{initialize_schema, is_initialized};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// SQLite-backed session store.
pub struct SessionStore {
    conn: Arc<Mutex<Connection>>,
}

/// Drop sub-second precision so persisted timestamps round-trip exactly.
fn truncate_to_seconds(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_nanosecond(0).unwrap_or(ts)
}

/// Normalize every timestamp in a session to second precision.
pub fn normalize_session_times(session: &mut EnsembleSession) {
    session.created_at = truncate_to_seconds(session.created_at);
    session.updated_at = truncate_to_seconds(session.updated_at);
    session.completed_at = session.completed_at.map(truncate_to_seconds);
    for a in &mut session.assignments {
        a.assigned_at = truncate_to_seconds(a.assigned_at);
        a.completed_at = a.completed_at.map(truncate_to_seconds);
    }
}

impl SessionStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| Error::storage(e.to_string()))?;
        if !is_initialized(&conn) {
            initialize_schema(&conn).map_err(|e| Error::storage(e.to_string()))?;
        }
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory store for tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::storage(e.to_string()))?;
        initialize_schema(&conn).map_err(|e| Error::storage(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| Error::Internal(format!("failed to lock connection: {}", e)))?;
        f(&conn).map_err(|e| Error::storage(e.to_string()))
    }

    /// Persist a session, replacing any existing record with the same
    /// name.
    pub fn save(&self, session: &EnsembleSession) -> Result<()> {
        let mut normalized = session.clone();
        normalize_session_times(&mut normalized);
        let data = serde_json::to_string(&normalized)?;

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (session_name, status, data, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(session_name) DO UPDATE SET
                     status = excluded.status,
                     data = excluded.data,
                     updated_at = excluded.updated_at",
                params![
                    normalized.session_name,
                    normalized.status.to_string(),
                    data,
                    normalized.created_at.to_rfc3339(),
                    normalized.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    /// Load a session by name. Absence is the distinct
    /// [`Error::SessionNotFound`] sentinel.
    pub fn load(&self, name: &str) -> Result<EnsembleSession> {
        let data: Option<String> = self.with_conn(|conn| {
            conn.query_row(
                "SELECT data FROM sessions WHERE session_name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
        })?;

        match data {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Err(Error::SessionNotFound(name.to_string())),
        }
    }

    /// All sessions, most recently updated first.
    pub fn list(&self) -> Result<Vec<EnsembleSession>> {
        let rows: Vec<String> = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT data FROM sessions ORDER BY updated_at DESC, session_name ASC",
            )?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })?;

        rows.iter()
            .map(|json| serde_json::from_str(json).map_err(Error::from))
            .collect()
    }

    /// Delete a session; true when a record existed.
    pub fn delete(&self, name: &str) -> Result<bool> {
        let rows = self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM sessions WHERE session_name = ?1",
                params![name],
            )
        })?;
        Ok(rows > 0)
    }

    /// Overwrite a session's status.
    pub fn update_status(&self, name: &str, status: SessionStatus) -> Result<()> {
        let mut session = self.load(name)?;
        session.status = status;
        session.updated_at = Utc::now();
        if status.is_terminal() && session.completed_at.is_none() {
            session.completed_at = Some(session.updated_at);
        }
        self.save(&session)
    }

    /// Overwrite one assignment's status within a session.
    pub fn update_assignment_status(
        &self,
        name: &str,
        mode_id: &str,
        status: AssignmentStatus,
    ) -> Result<()> {
        let mut session = self.load(name)?;
        let assignment = session.assignment_mut(mode_id).ok_or_else(|| {
            Error::storage(format!("session {} has no assignment for mode {}", name, mode_id))
        })?;
        assignment.status = status;
        if status.is_terminal() && assignment.completed_at.is_none() {
            assignment.completed_at = Some(Utc::now());
        }
        session.updated_at = Utc::now();
        self.save(&session)
    }
}
