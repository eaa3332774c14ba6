//! Task repository

use chrono::NaiveDate;
use rusqlite::{Connection, params};
use serde::Serialize;

use super::DbPool;
use crate::Result;

/// ISO 8601 date layout used for `due_date`
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A follow-up task owned by one contact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub id: i64,
    pub contact_id: i64,
    pub task: String,
    pub due_date: NaiveDate,
}

/// Task repository
#[derive(Clone)]
pub struct TaskRepo {
    pool: DbPool,
}

impl TaskRepo {
    /// Create a new task repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a task
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn insert(&self, contact_id: i64, task: &str, due_date: NaiveDate) -> Result<Task> {
        let conn = super::conn(&self.pool)?;
        insert_row(&conn, contact_id, task, due_date)
    }

    /// List tasks for a contact in insertion order
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn list_for_contact(&self, contact_id: i64) -> Result<Vec<Task>> {
        let conn = super::conn(&self.pool)?;

        let mut stmt = conn.prepare(
            "SELECT id, contact_id, task, due_date FROM tasks
             WHERE contact_id = ?1 ORDER BY id",
        )?;

        let tasks = stmt
            .query_map([contact_id], |row| {
                let due: String = row.get(3)?;
                Ok(Task {
                    id: row.get(0)?,
                    contact_id: row.get(1)?,
                    task: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    due_date: NaiveDate::parse_from_str(&due, DATE_FORMAT)
                        .unwrap_or_default(),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(tasks)
    }
}

pub(crate) fn insert_row(
    conn: &Connection,
    contact_id: i64,
    task: &str,
    due_date: NaiveDate,
) -> Result<Task> {
    conn.execute(
        "INSERT INTO tasks (contact_id, task, due_date) VALUES (?1, ?2, ?3)",
        params![contact_id, task, due_date.format(DATE_FORMAT).to_string()],
    )?;

    let id = conn.last_insert_rowid();
    tracing::debug!(task_id = id, contact_id, %due_date, "task inserted");

    Ok(Task {
        id,
        contact_id,
        task: task.to_string(),
        due_date,
    })
}
