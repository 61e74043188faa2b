use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use super::{generate_secret, validate_name, SecretStore, SecretStoreError};

/// Secrets persisted in a local SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteSecretStore {
    path: PathBuf,
}

impl SqliteSecretStore {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, SecretStoreError> {
        let store = Self { path: path.into() };
        let _ = store.open()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Connection, SecretStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SECRETS_SCHEMA)?;
        Ok(conn)
    }
}

impl SecretStore for SqliteSecretStore {
    fn get_or_create_secret(&self, name: &str) -> Result<String, SecretStoreError> {
        let name = validate_name(name)?;
        let conn = self.open()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO secrets (name, value, created_at) VALUES (?1, ?2, ?3)",
            params![name, generate_secret(), Utc::now().to_rfc3339()],
        )?;
        if inserted > 0 {
            info!("created secret '{}' in {}", name, self.path.display());
        }
        let value = conn.query_row(
            "SELECT value FROM secrets WHERE name = ?1",
            params![name],
            |row| row.get::<_, String>(0),
        )?;
        Ok(value)
    }

    fn get_secret(&self, name: &str) -> Result<Option<String>, SecretStoreError> {
        let name = validate_name(name)?;
        let conn = self.open()?;
        let value = conn
            .query_row(
                "SELECT value FROM secrets WHERE name = ?1",
                params![name],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }
}

const SECRETS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS secrets (
    name TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    created_at TEXT NOT NULL
);
"#;
