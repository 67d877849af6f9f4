//! Key-value persistence
//!
//! The content index stores its records through this seam. Two backends:
//! - `SqliteKv`: a single-table SQLite database for durable nodes
//! - `MemoryKv`: a hash map for tests and ephemeral nodes
//!
//! Both synchronize internally; single-key operations are safe from any
//! thread.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Mutex, RwLock};

use rusqlite::{Connection, OptionalExtension};

/// Namespaced key-value store surface.
pub trait KeyValueStore: Send + Sync + 'static {
    /// Idempotent overwrite.
    fn put(&self, key: &str, value: &[u8]) -> Result<(), KvError>;

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError>;

    /// Succeeds whether or not the key exists.
    fn delete(&self, key: &str) -> Result<(), KvError>;
}

/// Errors from a key-value backend.
#[derive(Debug)]
pub enum KvError {
    Backend(String),
}

impl fmt::Display for KvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KvError::Backend(e) => write!(f, "kv backend error: {}", e),
        }
    }
}

impl std::error::Error for KvError {}

impl From<rusqlite::Error> for KvError {
    fn from(e: rusqlite::Error) -> Self {
        KvError::Backend(e.to_string())
    }
}

/// Creates the records table.
fn create_records_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS records (
            key TEXT PRIMARY KEY NOT NULL,
            value BLOB NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// SQLite-backed store. One table, keys are full namespaced paths.
pub struct SqliteKv {
    conn: Mutex<Connection>,
}

impl SqliteKv {
    /// Open (or create) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KvError> {
        let conn = Connection::open(path)?;
        create_records_table(&conn)?;
        Ok(SqliteKv {
            conn: Mutex::new(conn),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, KvError> {
        let conn = Connection::open_in_memory()?;
        create_records_table(&conn)?;
        Ok(SqliteKv {
            conn: Mutex::new(conn),
        })
    }
}

impl KeyValueStore for SqliteKv {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), KvError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO records (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        let conn = self.conn.lock().unwrap();
        let value = conn
            .query_row("SELECT value FROM records WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn delete(&self, key: &str) -> Result<(), KvError> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM records WHERE key = ?1", [key])?;
        Ok(())
    }
}

/// In-memory store for tests and ephemeral nodes.
#[derive(Default)]
pub struct MemoryKv {
    map: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        MemoryKv::default()
    }
}

impl KeyValueStore for MemoryKv {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), KvError> {
        self.map
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        Ok(self.map.read().unwrap().get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<(), KvError> {
        self.map.write().unwrap().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(store: &dyn KeyValueStore) {
        assert!(store.get("/supply/a").unwrap().is_none());

        store.put("/supply/a", b"one").unwrap();
        assert_eq!(store.get("/supply/a").unwrap().unwrap(), b"one");

        // Overwrite is idempotent.
        store.put("/supply/a", b"two").unwrap();
        assert_eq!(store.get("/supply/a").unwrap().unwrap(), b"two");

        store.delete("/supply/a").unwrap();
        assert!(store.get("/supply/a").unwrap().is_none());

        // Deleting a missing key succeeds.
        store.delete("/supply/a").unwrap();
    }

    #[test]
    fn test_memory_kv_roundtrip() {
        roundtrip(&MemoryKv::new());
    }

    #[test]
    fn test_sqlite_kv_roundtrip() {
        roundtrip(&SqliteKv::open_in_memory().unwrap());
    }

    #[test]
    fn test_sqlite_kv_persists_to_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("records.db");

        {
            let store = SqliteKv::open(&path).unwrap();
            store.put("/supply/cid", b"record").unwrap();
        }

        let reopened = SqliteKv::open(&path).unwrap();
        assert_eq!(reopened.get("/supply/cid").unwrap().unwrap(), b"record");
    }

    #[test]
    fn test_keys_are_independent() {
        let store = MemoryKv::new();
        store.put("/supply/a", b"a").unwrap();
        store.put("/supply/b", b"b").unwrap();

        store.delete("/supply/a").unwrap();
        assert!(store.get("/supply/a").unwrap().is_none());
        assert_eq!(store.get("/supply/b").unwrap().unwrap(), b"b");
    }
}
