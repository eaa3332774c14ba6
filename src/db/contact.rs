//! Contact repository

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

use super::DbPool;
use crate::Result;

/// A CRM contact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contact {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl Contact {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            phone: row.get(2)?,
            email: row.get(3)?,
        })
    }
}

/// Contact repository
#[derive(Clone)]
pub struct ContactRepo {
    pool: DbPool,
}

impl ContactRepo {
    /// Create a new contact repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Find contacts whose name contains `pattern`
    ///
    /// Uses `LIKE '%pattern%'`, so an empty pattern matches every contact.
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn search(&self, pattern: &str) -> Result<Vec<Contact>> {
        let conn = super::conn(&self.pool)?;

        let mut stmt = conn.prepare(
            "SELECT id, name, phone, email FROM contacts
             WHERE name LIKE ?1 ORDER BY id",
        )?;

        let contacts = stmt
            .query_map([format!("%{pattern}%")], Contact::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(contacts)
    }

    /// Find the first contact with exactly this name
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn find_by_name(&self, name: &str) -> Result<Option<Contact>> {
        let conn = super::conn(&self.pool)?;
        select_by_name(&conn, name)
    }

    /// Insert a new contact
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn insert(&self, name: &str, phone: Option<&str>, email: Option<&str>) -> Result<Contact> {
        let conn = super::conn(&self.pool)?;
        insert_row(&conn, name, phone, email)
    }

    /// Overwrite phone and/or email; `None` leaves the column untouched
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn update_fields(
        &self,
        id: i64,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> Result<Contact> {
        let conn = super::conn(&self.pool)?;
        update_row(&conn, id, phone, email)
    }
}

pub(crate) fn select_by_name(conn: &Connection, name: &str) -> Result<Option<Contact>> {
    let contact = conn
        .query_row(
            "SELECT id, name, phone, email FROM contacts
             WHERE name = ?1 ORDER BY id LIMIT 1",
            [name],
            Contact::from_row,
        )
        .optional()?;

    Ok(contact)
}

pub(crate) fn insert_row(
    conn: &Connection,
    name: &str,
    phone: Option<&str>,
    email: Option<&str>,
) -> Result<Contact> {
    conn.execute(
        "INSERT INTO contacts (name, phone, email) VALUES (?1, ?2, ?3)",
        params![name, phone, email],
    )?;

    let id = conn.last_insert_rowid();
    tracing::debug!(contact_id = id, name, "contact inserted");

    Ok(Contact {
        id,
        name: name.to_string(),
        phone: phone.map(String::from),
        email: email.map(String::from),
    })
}

pub(crate) fn update_row(
    conn: &Connection,
    id: i64,
    phone: Option<&str>,
    email: Option<&str>,
) -> Result<Contact> {
    conn.execute(
        "UPDATE contacts SET phone = COALESCE(?1, phone), email = COALESCE(?2, email)
         WHERE id = ?3",
        params![phone, email, id],
    )?;

    let contact = conn.query_row(
        "SELECT id, name, phone, email FROM contacts WHERE id = ?1",
        [id],
        Contact::from_row,
    )?;

    tracing::debug!(contact_id = id, "contact updated");
    Ok(contact)
}
