use rusqlite::{Connection, Result as SqlResult};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Process-wide connection wrapper.
///
/// Every statement goes through the one mutex, so writes coming from the
/// event loop and from toggle requests are applied one at a time.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn new<P: AsRef<Path>>(path: P) -> SqlResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    #[cfg(test)]
    pub fn in_memory() -> SqlResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Returns `None` if a previous holder panicked mid-statement.
    pub fn connection(&self) -> Option<MutexGuard<'_, Connection>> {
        self.conn.lock().ok()
    }
}
