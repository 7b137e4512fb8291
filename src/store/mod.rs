//! Key-value persistence for conversation history and settings
//!
//! Every store is bound to a scope. Session scopes hold the choice history of
//! one conversation run; the settings scope holds long-lived values such as a
//! saved credential. Scalar values are last-write-wins.

mod history;
mod memory;
mod schema;
mod sqlite;

use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::{Error, Result};

pub use history::ChoiceHistory;
pub use memory::MemoryStore;
pub use schema::SCHEMA_VERSION;
pub use sqlite::SqliteStore;

/// Key under which a session's choice history is stored
pub const CHOICES_KEY: &str = "chat_choices";

/// Settings key for the saved voice credential
pub const API_KEY_SETTING: &str = "elevenlabs_api_key";

/// Settings key for the user's display name
pub const USER_NAME_SETTING: &str = "user_name";

/// Scope name for long-lived settings
pub const SETTINGS_SCOPE: &str = "settings";

/// Database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// String key-value storage bound to a single scope
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    ///
    /// # Errors
    ///
    /// Returns error if the backing storage cannot be read
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    ///
    /// # Errors
    ///
    /// Returns error if the backing storage cannot be written
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value if present
    ///
    /// # Errors
    ///
    /// Returns error if the backing storage cannot be written
    fn remove(&self, key: &str) -> Result<()>;
}

/// Scope name for a conversation session
#[must_use]
pub fn session_scope(session_id: &str) -> String {
    format!("session:{session_id}")
}

/// Initialize the database
///
/// # Errors
///
/// Returns error if database cannot be opened or initialized
pub fn init<P: AsRef<Path>>(path: P) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(path);
    let pool = Pool::builder()
        .max_size(4)
        .build(manager)
        .map_err(|e| Error::Store(e.to_string()))?;

    let conn = pool.get().map_err(|e| Error::Store(e.to_string()))?;
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
        .map_err(|e| Error::Store(e.to_string()))?;

    let conn = pool.get().map_err(|e| Error::Store(e.to_string()))?;
    schema::init(&conn)?;

    Ok(pool)
}
