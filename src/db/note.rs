//! Note repository

use chrono::NaiveDateTime;
use rusqlite::{Connection, params};
use serde::Serialize;

use super::DbPool;
use crate::Result;

/// `SQLite` `CURRENT_TIMESTAMP` layout
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A free-text note owned by one contact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Note {
    pub id: i64,
    pub contact_id: i64,
    pub note: String,
    pub created_at: NaiveDateTime,
}

/// Note repository
#[derive(Clone)]
pub struct NoteRepo {
    pool: DbPool,
}

impl NoteRepo {
    /// Create a new note repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a note; the timestamp is assigned by the database
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn insert(&self, contact_id: i64, note: &str) -> Result<Note> {
        let conn = super::conn(&self.pool)?;
        insert_row(&conn, contact_id, note)
    }

    /// List notes for a contact in insertion order
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn list_for_contact(&self, contact_id: i64) -> Result<Vec<Note>> {
        let conn = super::conn(&self.pool)?;

        let mut stmt = conn.prepare(
            "SELECT id, contact_id, note, created_at FROM notes
             WHERE contact_id = ?1 ORDER BY id",
        )?;

        let notes = stmt
            .query_map([contact_id], |row| {
                Ok(Note {
                    id: row.get(0)?,
                    contact_id: row.get(1)?,
                    note: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    created_at: parse_timestamp(&row.get::<_, String>(3)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(notes)
    }
}

pub(crate) fn insert_row(conn: &Connection, contact_id: i64, note: &str) -> Result<Note> {
    conn.execute(
        "INSERT INTO notes (contact_id, note) VALUES (?1, ?2)",
        params![contact_id, note],
    )?;

    let id = conn.last_insert_rowid();
    let created_at: String = conn.query_row(
        "SELECT created_at FROM notes WHERE id = ?1",
        [id],
        |row| row.get(0),
    )?;

    tracing::debug!(note_id = id, contact_id, "note inserted");

    Ok(Note {
        id,
        contact_id,
        note: note.to_string(),
        created_at: parse_timestamp(&created_at),
    })
}

fn parse_timestamp(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).unwrap_or_else(|_| {
        tracing::warn!(value = s, "unparseable note timestamp");
        NaiveDateTime::default()
    })
}
