//! Durable key/value storage for viewer preferences.
//!
//! This module provides:
//! - The [`KeyValueStore`] seam used by the price store
//! - A SQLite-backed store (WAL mode, retry on "database locked")
//! - An in-memory store used when no persistent storage is available

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use crate::utils::default_db_path;

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;

    /// Whether values survive the process.
    fn is_persistent(&self) -> bool {
        true
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }

    fn is_persistent(&self) -> bool {
        false
    }
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database at `path` with WAL mode and retry logic.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create db directory {}", parent.display()))?;
        }

        let mut attempts = 0;
        let max_attempts = 3;

        let conn = loop {
            match Connection::open(path) {
                Ok(conn) => break conn,
                Err(e) if e.to_string().contains("locked") && attempts < max_attempts => {
                    attempts += 1;
                    thread::sleep(Duration::from_millis(100 * attempts));
                }
                Err(e) => return Err(e).with_context(|| format!("open {}", path.display())),
            }
        };
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "busy_timeout", 5000)?;
        init_schema(&conn)?;
        Ok(SqliteStore { conn })
    }
}

/// Create tables if they don't exist.
fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS preferences (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER
        );
        INSERT OR IGNORE INTO preferences (key, value) VALUES ('schema_version', '1');",
    )?;
    Ok(())
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM preferences WHERE key = ?1")?;
        let value = stmt
            .query_row(params![key], |row| row.get::<_, String>(0))
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let now = Utc::now().timestamp();
        self.conn.execute(
            "INSERT INTO preferences (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM preferences WHERE key = ?1", params![key])?;
        Ok(())
    }
}

/// Open the preference store, degrading to memory when storage is unavailable.
///
/// `PROXY_USAGE_DB_DISABLE=1` forces the in-memory store.
pub fn open_store(path: Option<&Path>) -> Box<dyn KeyValueStore> {
    if env::var("PROXY_USAGE_DB_DISABLE").is_ok_and(|v| v == "1") {
        debug!("persistent storage disabled via env var");
        return Box::new(MemoryStore::new());
    }
    let resolved = path.map(Path::to_path_buf).or_else(default_db_path);
    let Some(resolved) = resolved else {
        warn!("no data directory available; prices will not persist");
        return Box::new(MemoryStore::new());
    };
    match SqliteStore::open(&resolved) {
        Ok(store) => Box::new(store),
        Err(e) => {
            warn!(path = %resolved.display(), "storage unavailable, using memory: {e:#}");
            Box::new(MemoryStore::new())
        }
    }
}
