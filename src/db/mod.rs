//! SQLite connection wrapper for the gateway.
//!
//! Connections are opened fresh per request and released when the wrapper
//! drops; there is no pooling. The store runs in WAL mode so observability
//! inserts never block concurrent readers.
use std::path::Path;

use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use crate::error::SchemaError;

/// A wrapper around a single SQLite connection to the target store.
#[derive(Debug)]
pub struct Db {
    pub(crate) conn: Connection,
}

impl Db {
    /// Open a read-write connection to the store at the given path.
    ///
    /// Fails with [`SchemaError::DatabaseUnavailable`] when no file exists
    /// at the path — the store is never created implicitly.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SchemaError::DatabaseUnavailable);
        }

        debug!("Opening store (rw): {}", path.display());
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")?;
        Ok(Self { conn })
    }

    /// Open a read-only connection for query execution.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SchemaError::DatabaseUnavailable);
        }

        debug!("Opening store (ro): {}", path.display());
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (useful for testing).
    pub fn open_in_memory() -> Result<Self, SchemaError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    /// Access the underlying connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}
