//! CRM store: contact-name addressed operations over the repositories
//!
//! Every mutating call resolves its contact and writes in one `BEGIN
//! IMMEDIATE` transaction, so concurrent sessions (even on separate pools
//! over the same file) never see each other half done. A missing contact
//! surfaces as [`Error::NotFound`] and a half-specified task as
//! [`Error::InvalidArguments`]; neither writes anything.

use chrono::NaiveDate;

use rusqlite::Connection;

use super::{Contact, ContactRepo, DbPool, Note, NoteRepo, Task, TaskRepo, task::DATE_FORMAT};
use crate::{Error, Result};

/// Whether an upsert created a row or changed an existing one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created(Contact),
    Updated(Contact),
}

impl UpsertOutcome {
    /// The resulting contact
    #[must_use]
    pub const fn contact(&self) -> &Contact {
        match self {
            Self::Created(c) | Self::Updated(c) => c,
        }
    }

    #[must_use]
    pub const fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Owned handle over contacts, notes and tasks
#[derive(Clone)]
pub struct CrmStore {
    pool: DbPool,
    contacts: ContactRepo,
    notes: NoteRepo,
    tasks: TaskRepo,
}

impl CrmStore {
    /// Create a store over an initialized pool
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self {
            contacts: ContactRepo::new(pool.clone()),
            notes: NoteRepo::new(pool.clone()),
            tasks: TaskRepo::new(pool.clone()),
            pool,
        }
    }

    /// Substring search over contact names
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn find_contacts(&self, pattern: &str) -> Result<Vec<Contact>> {
        self.contacts.search(pattern)
    }

    /// Exact-name lookup
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no contact has this name
    pub fn contact_by_name(&self, name: &str) -> Result<Contact> {
        self.contacts
            .find_by_name(name)?
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    /// Insert a contact, or update phone/email of the existing exact-name match
    ///
    /// Empty strings count as "not provided".
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn upsert_contact(
        &self,
        name: &str,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> Result<UpsertOutcome> {
        let phone = phone.filter(|s| !s.is_empty());
        let email = email.filter(|s| !s.is_empty());

        super::immediate(&self.pool, |tx| {
            if let Some(existing) = super::contact::select_by_name(tx, name)? {
                if phone.is_none() && email.is_none() {
                    return Ok(UpsertOutcome::Updated(existing));
                }
                let updated = super::contact::update_row(tx, existing.id, phone, email)?;
                return Ok(UpsertOutcome::Updated(updated));
            }

            let created = super::contact::insert_row(tx, name, phone, email)?;
            tracing::info!(contact_id = created.id, "contact created");
            Ok(UpsertOutcome::Created(created))
        })
    }

    /// Attach a note to the contact with this exact name
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the contact does not exist
    pub fn add_note(&self, contact_name: &str, note: &str) -> Result<Note> {
        super::immediate(&self.pool, |tx| {
            let contact = require_contact(tx, contact_name)?;
            super::note::insert_row(tx, contact.id, note)
        })
    }

    /// Notes for a contact id
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn notes_for(&self, contact: &Contact) -> Result<Vec<Note>> {
        self.notes.list_for_contact(contact.id)
    }

    /// Tasks for a contact id
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn tasks_for(&self, contact: &Contact) -> Result<Vec<Task>> {
        self.tasks.list_for_contact(contact.id)
    }

    /// List tasks for the contact with this exact name
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the contact does not exist
    pub fn list_tasks(&self, contact_name: &str) -> Result<Vec<Task>> {
        let contact = self.contact_by_name(contact_name)?;
        self.tasks_for(&contact)
    }

    /// Create a task; `task` and `due_date` must be given together
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the contact does not exist, then
    /// [`Error::InvalidArguments`] when either of `task`/`due_date` is missing
    /// or the date is not `YYYY-MM-DD`
    pub fn create_task(
        &self,
        contact_name: &str,
        task: Option<&str>,
        due_date: Option<&str>,
    ) -> Result<Task> {
        super::immediate(&self.pool, |tx| {
            let contact = require_contact(tx, contact_name)?;

            let (Some(text), Some(due_date)) = (
                task.filter(|s| !s.is_empty()),
                due_date.filter(|s| !s.is_empty()),
            ) else {
                return Err(Error::InvalidArguments(
                    "Must provide both task and due_date to create.".to_string(),
                ));
            };

            let due = NaiveDate::parse_from_str(due_date.trim(), DATE_FORMAT).map_err(|_| {
                Error::InvalidArguments(format!(
                    "Due date '{due_date}' is not a valid date. Use the format YYYY-MM-DD."
                ))
            })?;

            super::task::insert_row(tx, contact.id, text, due)
        })
    }
}

fn require_contact(conn: &Connection, name: &str) -> Result<Contact> {
    super::contact::select_by_name(conn, name)?.ok_or_else(|| Error::NotFound(name.to_string()))
}
