use std::sync::Arc;

use serde::Serialize;

use crate::common::{ChatMessage, Flag};
use crate::storage::{MessageStore, StorageError};

/// Flag toggle could not be written.
pub const ERROR_UPDATE_FAILED: u16 = 69;
pub const ERROR_NOT_FOUND: u16 = 404;
pub const ERROR_CONFLICT: u16 = 409;
pub const ERROR_CORRUPT_RECORD: u16 = 422;
pub const ERROR_STORE_UNAVAILABLE: u16 = 500;

/// Uniform response body handed to the HTTP layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope<T> {
    #[serde(rename = "Status")]
    pub status: bool,
    #[serde(rename = "Data", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(rename = "ErrorCode", skip_serializing_if = "Option::is_none")]
    pub error_code: Option<u16>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: true,
            data: Some(data),
            error_code: None,
        }
    }

    pub fn error(code: u16) -> Self {
        Self {
            status: false,
            data: None,
            error_code: Some(code),
        }
    }
}

impl Envelope<()> {
    pub fn done() -> Self {
        Self {
            status: true,
            data: None,
            error_code: None,
        }
    }
}

fn error_code(err: &StorageError) -> u16 {
    match err {
        StorageError::NotFound { .. } => ERROR_NOT_FOUND,
        StorageError::Conflict { .. } => ERROR_CONFLICT,
        StorageError::Corruption { .. } => ERROR_CORRUPT_RECORD,
        StorageError::Unavailable(_) | StorageError::LockPoisoned => ERROR_STORE_UNAVAILABLE,
    }
}

/// Operations exposed to the todo list front end. Writes share the store's
/// single connection with the sync engine.
#[derive(Clone)]
pub struct TodoService {
    store: Arc<MessageStore>,
}

impl TodoService {
    pub fn new(store: Arc<MessageStore>) -> Self {
        Self { store }
    }

    pub fn list_all(&self) -> Envelope<Vec<ChatMessage>> {
        match self.store.get_all() {
            Ok(listing) => {
                for err in &listing.corrupted {
                    log::warn!("Skipping unreadable record: {err}");
                }
                Envelope::ok(listing.messages)
            }
            Err(err) => {
                log::error!("Failed to list messages: {err}");
                Envelope::error(error_code(&err))
            }
        }
    }

    pub fn get_by_id(&self, message_id: &str) -> Envelope<ChatMessage> {
        match self.store.get_by_id(message_id) {
            Ok(message) => Envelope::ok(message),
            Err(err) => {
                if err.is_unavailable() {
                    log::error!("Failed to load message {message_id}: {err}");
                } else {
                    log::warn!("Lookup of {message_id} failed: {err}");
                }
                Envelope::error(error_code(&err))
            }
        }
    }

    pub fn toggle_checked(&self, message_id: &str, value: bool) -> Envelope<ChatMessage> {
        self.toggle(message_id, Flag::Checked, value)
    }

    pub fn toggle_done(&self, message_id: &str, value: bool) -> Envelope<ChatMessage> {
        self.toggle(message_id, Flag::Done, value)
    }

    /// Set a flag and answer with the record as it now reads.
    fn toggle(&self, message_id: &str, flag: Flag, value: bool) -> Envelope<ChatMessage> {
        match self.store.update_flag(message_id, flag, value) {
            Ok(true) => self.get_by_id(message_id),
            Ok(false) => Envelope::error(ERROR_NOT_FOUND),
            Err(err) => {
                log::error!("Failed to set {flag}={value} on {message_id}: {err}");
                Envelope::error(ERROR_UPDATE_FAILED)
            }
        }
    }

    pub fn delete_all(&self) -> Envelope<()> {
        match self.store.delete_all() {
            Ok(removed) => {
                log::info!("Cleared {removed} messages");
                Envelope::done()
            }
            Err(err) => {
                log::error!("Failed to clear messages: {err}");
                Envelope::error(error_code(&err))
            }
        }
    }
}
