use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use super::{validate_reply, SavedReply, SavedReplyError, SavedReplyStore};

const REPLY_COLUMNS: &str =
    "id, name, content, is_active, usage_count, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct SqliteSavedReplyStore {
    path: PathBuf,
}

struct ReplyRow {
    id: String,
    name: String,
    content: String,
    is_active: bool,
    usage_count: i64,
    created_at: String,
    updated_at: String,
}

impl ReplyRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            content: row.get(2)?,
            is_active: row.get(3)?,
            usage_count: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn into_reply(self) -> Result<SavedReply, SavedReplyError> {
        Ok(SavedReply {
            id: self.id,
            name: self.name,
            content: self.content,
            is_active: self.is_active,
            usage_count: self.usage_count,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

impl SqliteSavedReplyStore {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, SavedReplyError> {
        let store = Self { path: path.into() };
        let _ = store.open()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Connection, SavedReplyError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SAVED_REPLIES_SCHEMA)?;
        Ok(conn)
    }

    fn query(&self, sql: &str) -> Result<Vec<SavedReply>, SavedReplyError> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], ReplyRow::from_row)?;
        let mut replies = Vec::new();
        for row in rows {
            replies.push(row?.into_reply()?);
        }
        Ok(replies)
    }

    fn load(conn: &Connection, id: &str) -> Result<Option<SavedReply>, SavedReplyError> {
        let row = conn
            .query_row(
                &format!("SELECT {REPLY_COLUMNS} FROM saved_replies WHERE id = ?1"),
                params![id],
                ReplyRow::from_row,
            )
            .optional()?;
        row.map(ReplyRow::into_reply).transpose()
    }

    fn load_existing(conn: &Connection, id: &str) -> Result<SavedReply, SavedReplyError> {
        Self::load(conn, id)?.ok_or_else(|| SavedReplyError::NotFound(id.to_string()))
    }
}

impl SavedReplyStore for SqliteSavedReplyStore {
    fn list_active_replies(&self) -> Result<Vec<SavedReply>, SavedReplyError> {
        self.query(&format!(
            "SELECT {REPLY_COLUMNS} FROM saved_replies
             WHERE is_active = 1
             ORDER BY usage_count DESC, updated_at DESC, name ASC"
        ))
    }

    fn list_replies(&self) -> Result<Vec<SavedReply>, SavedReplyError> {
        self.query(&format!(
            "SELECT {REPLY_COLUMNS} FROM saved_replies ORDER BY created_at, name"
        ))
    }

    fn get_reply(&self, id: &str) -> Result<Option<SavedReply>, SavedReplyError> {
        let conn = self.open()?;
        Self::load(&conn, id)
    }

    fn create_reply(&self, name: &str, content: &str) -> Result<SavedReply, SavedReplyError> {
        validate_reply(name, content)?;
        let conn = self.open()?;
        let id = Uuid::new_v4().to_string();
        let now = format_datetime(Utc::now());
        conn.execute(
            "INSERT INTO saved_replies (id, name, content, is_active, usage_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, 1, 0, ?4, ?4)",
            params![id, name.trim(), content, now],
        )?;
        info!("created saved reply {}", id);
        Self::load_existing(&conn, &id)
    }

    fn update_reply(
        &self,
        id: &str,
        name: &str,
        content: &str,
    ) -> Result<SavedReply, SavedReplyError> {
        validate_reply(name, content)?;
        let conn = self.open()?;
        let updated = conn.execute(
            "UPDATE saved_replies SET name = ?1, content = ?2, updated_at = ?3 WHERE id = ?4",
            params![name.trim(), content, format_datetime(Utc::now()), id],
        )?;
        if updated == 0 {
            return Err(SavedReplyError::NotFound(id.to_string()));
        }
        info!("updated saved reply {}", id);
        Self::load_existing(&conn, id)
    }

    fn set_active(&self, id: &str, active: bool) -> Result<SavedReply, SavedReplyError> {
        let conn = self.open()?;
        let updated = conn.execute(
            "UPDATE saved_replies SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
            params![active, format_datetime(Utc::now()), id],
        )?;
        if updated == 0 {
            return Err(SavedReplyError::NotFound(id.to_string()));
        }
        info!("saved reply {} active={}", id, active);
        Self::load_existing(&conn, id)
    }

    fn record_usage(&self, id: &str) -> Result<SavedReply, SavedReplyError> {
        let conn = self.open()?;
        let updated = conn.execute(
            "UPDATE saved_replies SET usage_count = usage_count + 1 WHERE id = ?1",
            params![id],
        )?;
        if updated == 0 {
            return Err(SavedReplyError::NotFound(id.to_string()));
        }
        Self::load_existing(&conn, id)
    }
}

const SAVED_REPLIES_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS saved_replies (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    content TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    usage_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS saved_replies_active_idx
    ON saved_replies (is_active, usage_count);
"#;

// Fixed-width so text ordering matches time ordering.
fn format_datetime(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}
