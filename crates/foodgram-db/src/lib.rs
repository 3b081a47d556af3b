pub mod error;
pub mod import;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod validation;

pub use error::{Error, Result};

use rusqlite::{Connection, OpenFlags, Transaction};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::info;

const READER_POOL_SIZE: usize = 4;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite handle with one writer and a small pool of read-only connections.
///
/// All composite writes go through [`Database::with_tx`] so they commit or
/// roll back as a unit.
pub struct Database {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    reader_idx: AtomicUsize,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let writer = Connection::open(path)?;

        // WAL mode for concurrent reads
        writer.pragma_update(None, "journal_mode", "WAL")?;
        writer.pragma_update(None, "foreign_keys", "ON")?;
        writer.busy_timeout(BUSY_TIMEOUT)?;

        migrations::run(&writer)?;

        let mut readers = Vec::with_capacity(READER_POOL_SIZE);
        for _ in 0..READER_POOL_SIZE {
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            readers.push(Mutex::new(conn));
        }

        info!(
            "Database opened at {} (1 writer + {} readers)",
            path.display(),
            READER_POOL_SIZE
        );
        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            reader_idx: AtomicUsize::new(0),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let idx = self.reader_idx.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[idx]
            .lock()
            .map_err(|e| Error::Internal(format!("Reader lock poisoned: {}", e)))?;
        f(&conn)
    }

    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .writer
            .lock()
            .map_err(|e| Error::Internal(format!("Writer lock poisoned: {}", e)))?;
        f(&conn)
    }

    /// Run `f` inside a write transaction. Any error rolls the whole
    /// transaction back.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self
            .writer
            .lock()
            .map_err(|e| Error::Internal(format!("Writer lock poisoned: {}", e)))?;
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use crate::models::NewUser;
    use tempfile::TempDir;

    /// Keeps the temp dir alive for as long as the database is in use.
    pub struct TestDb {
        pub db: Database,
        _dir: TempDir,
    }

    impl std::ops::Deref for TestDb {
        type Target = Database;
        fn deref(&self) -> &Database {
            &self.db
        }
    }

    pub fn open() -> TestDb {
        let dir = TempDir::new().unwrap();
        let db = Database::open(&dir.path().join("test.db")).unwrap();
        TestDb { db, _dir: dir }
    }

    pub fn user(db: &Database, name: &str) -> i64 {
        db.create_user(&NewUser {
            email: format!("{}@example.com", name),
            username: name.to_string(),
            first_name: name.to_string(),
            last_name: "Tester".to_string(),
            password_hash: "hash".to_string(),
        })
        .unwrap()
    }
}
