//! `SQLite`-backed key-value store

use chrono::Utc;
use rusqlite::OptionalExtension;

use super::{DbPool, KeyValueStore, SETTINGS_SCOPE, session_scope};
use crate::{Error, Result};

/// Key-value store persisted in `SQLite`, bound to one scope
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
    scope: String,
}

impl SqliteStore {
    /// Create a store for an arbitrary scope
    #[must_use]
    pub fn new(pool: DbPool, scope: impl Into<String>) -> Self {
        Self {
            pool,
            scope: scope.into(),
        }
    }

    /// Create a store for a conversation session
    #[must_use]
    pub fn session(pool: DbPool, session_id: &str) -> Self {
        Self::new(pool, session_scope(session_id))
    }

    /// Create a store for long-lived settings
    #[must_use]
    pub fn settings(pool: DbPool) -> Self {
        Self::new(pool, SETTINGS_SCOPE)
    }

    /// Scope this store reads and writes
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Store(e.to_string()))?;

        let value = conn
            .query_row(
                "SELECT value FROM kv_entries WHERE scope = ?1 AND key = ?2",
                [self.scope.as_str(), key],
                |row| row.get(0),
            )
            .optional()?;

        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Store(e.to_string()))?;

        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO kv_entries (scope, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(scope, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            [self.scope.as_str(), key, value, now.as_str()],
        )?;

        tracing::trace!(scope = %self.scope, key, "stored value");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Store(e.to_string()))?;

        conn.execute(
            "DELETE FROM kv_entries WHERE scope = ?1 AND key = ?2",
            [self.scope.as_str(), key],
        )?;
        Ok(())
    }
}
