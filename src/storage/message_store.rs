use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::MutexGuard;
use thiserror::Error;

use super::database::Database;
use crate::common::types::{format_timestamp, parse_timestamp};
use crate::common::{ChatMessage, Flag};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("message {message_id} already exists")]
    Conflict { message_id: String },
    #[error("message {message_id} not found")]
    NotFound { message_id: String },
    #[error("message {message_id} has unreadable timestamp `{value}`: {reason}")]
    Corruption {
        message_id: String,
        value: String,
        reason: String,
    },
    #[error("store unavailable: {0}")]
    Unavailable(#[from] rusqlite::Error),
    #[error("store unavailable: connection lock poisoned")]
    LockPoisoned,
}

impl StorageError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StorageError::Unavailable(_) | StorageError::LockPoisoned)
    }
}

/// Result of a full listing. Rows whose timestamp cannot be read are
/// reported separately so the rest of the listing still comes back.
#[derive(Debug, Default)]
pub struct Listing {
    pub messages: Vec<ChatMessage>,
    pub corrupted: Vec<StorageError>,
}

/// Row as it sits on disk, before the timestamp is parsed.
struct StoredRow {
    timestamp: String,
    message: String,
    message_id: String,
    is_checked: bool,
    is_done: bool,
    is_deleted: bool,
}

impl StoredRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            timestamp: row.get(0)?,
            message: row.get(1)?,
            message_id: row.get(2)?,
            is_checked: row.get(3)?,
            is_done: row.get(4)?,
            is_deleted: row.get(5)?,
        })
    }

    fn into_message(self) -> Result<ChatMessage, StorageError> {
        let timestamp = match parse_timestamp(&self.timestamp) {
            Ok(ts) => ts,
            Err(err) => {
                return Err(StorageError::Corruption {
                    message_id: self.message_id,
                    value: self.timestamp,
                    reason: err.to_string(),
                });
            }
        };

        Ok(ChatMessage {
            timestamp,
            message: self.message,
            message_id: self.message_id,
            is_checked: self.is_checked,
            is_done: self.is_done,
            is_deleted: self.is_deleted,
        })
    }
}

/// Gateway over the `chat_message` table.
pub struct MessageStore {
    db: Database,
}

impl MessageStore {
    /// Open the store at the given path, creating the table if needed
    pub fn with_path<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = Database::new(path)?;
        let store = Self { db };
        store.init_schema()?;
        Ok(store)
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self, StorageError> {
        let db = Database::in_memory()?;
        let store = Self { db };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.conn()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS chat_message (
                timestamp TEXT NOT NULL,
                message TEXT NOT NULL,
                message_id TEXT PRIMARY KEY,
                is_checked INTEGER NOT NULL DEFAULT 0,
                is_done INTEGER NOT NULL DEFAULT 0,
                is_deleted INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.db.connection().ok_or(StorageError::LockPoisoned)
    }

    // ========== Messages ==========

    /// Insert a new record. An existing id yields `Conflict` and leaves the
    /// stored row untouched.
    pub fn insert(&self, record: &ChatMessage) -> Result<(), StorageError> {
        let conn = self.conn()?;
        let result = conn.execute(
            "INSERT INTO chat_message (timestamp, message, message_id, is_checked, is_done, is_deleted)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                format_timestamp(&record.timestamp),
                record.message,
                record.message_id,
                record.is_checked,
                record.is_done,
                record.is_deleted
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(StorageError::Conflict {
                    message_id: record.message_id.clone(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Replace the text of an existing record. Returns `false` when no row
    /// matched the id.
    pub fn update_text(&self, message_id: &str, text: &str) -> Result<bool, StorageError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE chat_message SET message = ?1 WHERE message_id = ?2",
            params![text, message_id],
        )?;
        Ok(changed > 0)
    }

    pub fn get_by_id(&self, message_id: &str) -> Result<ChatMessage, StorageError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT timestamp, message, message_id, is_checked, is_done, is_deleted
                 FROM chat_message
                 WHERE message_id = ?1",
                params![message_id],
                StoredRow::from_row,
            )
            .optional()?;

        match row {
            Some(row) => row.into_message(),
            None => Err(StorageError::NotFound {
                message_id: message_id.to_string(),
            }),
        }
    }

    /// Every row in storage order.
    pub fn get_all(&self) -> Result<Listing, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT timestamp, message, message_id, is_checked, is_done, is_deleted
             FROM chat_message",
        )?;

        let rows = stmt
            .query_map([], StoredRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut listing = Listing::default();
        for row in rows {
            match row.into_message() {
                Ok(message) => listing.messages.push(message),
                Err(err) => listing.corrupted.push(err),
            }
        }
        Ok(listing)
    }

    /// Physically remove every row. Returns how many were dropped.
    pub fn delete_all(&self) -> Result<usize, StorageError> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM chat_message", [])?;
        Ok(removed)
    }

    pub fn count(&self) -> Result<usize, StorageError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chat_message", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ========== Status ==========

    /// Set one status flag on an existing record. Returns `false` when no
    /// row matched the id.
    pub fn update_flag(
        &self,
        message_id: &str,
        flag: Flag,
        value: bool,
    ) -> Result<bool, StorageError> {
        let conn = self.conn()?;
        let sql = format!(
            "UPDATE chat_message SET {} = ?1 WHERE message_id = ?2",
            flag.column()
        );
        let changed = conn.execute(&sql, params![value, message_id])?;
        Ok(changed > 0)
    }

    #[cfg(test)]
    fn execute_raw(&self, sql: &str) -> Result<(), StorageError> {
        self.conn()?.execute_batch(sql)?;
        Ok(())
    }
}
