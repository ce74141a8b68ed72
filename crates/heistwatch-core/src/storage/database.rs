//! SQLite-backed key-value store.
//!
//! The engine keeps its whole persisted footprint under two keys of a
//! single `kv` table: the JSON session record and the current label.

use std::path::PathBuf;

use log::warn;
use rusqlite::{params, Connection};

use super::{data_dir, Store};
use crate::error::{Result, StorageError};

/// SQLite database holding the persisted timer state.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/heistwatch/heistwatch.db`.
    ///
    /// Creates the file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("heistwatch.db");
        Self::open_at(path)
    }

    /// Open a database at an explicit path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: PathBuf) -> Result<Self> {
        let conn = Connection::open(&path)
            .map_err(|source| StorageError::OpenFailed { path, source })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests and throwaway sessions).
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), StorageError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    pub fn kv_get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<(), StorageError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

impl Store for Database {
    fn get(&self, key: &str) -> Option<String> {
        match self.kv_get(key) {
            Ok(value) => value,
            Err(err) => {
                warn!("kv get '{key}' failed: {err}");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) {
        if let Err(err) = self.kv_set(key, value) {
            warn!("kv set '{key}' failed: {err}");
        }
    }

    fn remove(&self, key: &str) {
        if let Err(err) = self.kv_delete(key) {
            warn!("kv remove '{key}' failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kv_roundtrip() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
    }

    #[test]
    fn kv_set_overwrites() {
        let db = Database::open_memory().unwrap();
        db.kv_set("test", "first").unwrap();
        db.kv_set("test", "second").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "second");
    }

    #[test]
    fn kv_delete_removes() {
        let db = Database::open_memory().unwrap();
        db.kv_set("test", "value").unwrap();
        db.kv_delete("test").unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
    }

    #[test]
    fn store_trait_swallows_nothing_on_happy_path() {
        let db = Database::open_memory().unwrap();
        Store::set(&db, "key", "value");
        assert_eq!(Store::get(&db, "key").as_deref(), Some("value"));
        Store::remove(&db, "key");
        assert!(Store::get(&db, "key").is_none());
    }
}
