//! Database module for contact, note, and task persistence

pub mod contact;
pub mod note;
mod schema;
pub mod store;
pub mod task;

use std::path::Path;
use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Transaction, TransactionBehavior};

use crate::{Error, Result};

pub use contact::{Contact, ContactRepo};
pub use note::{Note, NoteRepo};
pub use schema::SCHEMA_VERSION;
pub use store::{CrmStore, UpsertOutcome};
pub use task::{Task, TaskRepo};

/// How long a connection waits on another writer's lock before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database connection pool
///
/// Sized to a single connection: every statement from every session is
/// serialized through it.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Pooled database connection
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Initialize the database
///
/// # Errors
///
/// Returns error if database cannot be opened or initialized
pub fn init<P: AsRef<Path>>(path: P) -> Result<DbPool> {
    if let Some(parent) = path.as_ref().parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let manager =
        SqliteConnectionManager::file(path).with_init(|c| c.busy_timeout(BUSY_TIMEOUT));
    let pool = Pool::builder()
        .max_size(1)
        .build(manager)
        .map_err(|e| Error::Database(e.to_string()))?;

    let conn = pool.get().map_err(|e| Error::Database(e.to_string()))?;
    schema::init(&conn)?;

    tracing::info!(version = SCHEMA_VERSION, "database initialized");
    Ok(pool)
}

/// Initialize an in-memory database (for testing)
///
/// # Errors
///
/// Returns error if database cannot be initialized
pub fn init_memory() -> Result<DbPool> {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder()
        .max_size(1)
        .build(manager)
        .map_err(|e| Error::Database(e.to_string()))?;

    let conn = pool.get().map_err(|e| Error::Database(e.to_string()))?;
    schema::init(&conn)?;

    Ok(pool)
}

/// Check out the single pooled connection
pub(crate) fn conn(pool: &DbPool) -> Result<DbConn> {
    pool.get().map_err(|e| Error::Database(e.to_string()))
}

/// Run `f` inside a `BEGIN IMMEDIATE` transaction
///
/// The write lock is taken up front, so read-then-write sequences cannot
/// interleave with another pool on the same file. An `Err` from `f` rolls
/// back.
pub(crate) fn immediate<T>(
    pool: &DbPool,
    f: impl FnOnce(&Transaction<'_>) -> Result<T>,
) -> Result<T> {
    let mut conn = conn(pool)?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}
