pub mod database;
pub mod message_store;

pub use message_store::{MessageStore, StorageError};

use std::fs;
use std::path::Path;

/// Ensure the directory holding the database file exists
pub fn ensure_parent_dir(db_path: &str) -> std::io::Result<()> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
