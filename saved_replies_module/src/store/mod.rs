//! Saved replies: canned responses agents insert into conversations.

mod sqlite_store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::matcher::MatchCandidate;

pub use self::sqlite_store::SqliteSavedReplyStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedReply {
    pub id: String,
    pub name: String,
    pub content: String,
    pub is_active: bool,
    pub usage_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SavedReply {
    pub fn new(name: &str, content: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            content: content.to_string(),
            is_active: true,
            usage_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

impl MatchCandidate for SavedReply {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SavedReplyError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("datetime parse error: {0}")]
    DateTimeParse(#[from] chrono::ParseError),
    #[error("invalid saved reply: {0}")]
    InvalidReply(String),
    #[error("saved reply not found: {0}")]
    NotFound(String),
    #[error("saved reply {0} was listed but could not be loaded")]
    InconsistentStore(String),
    #[error("saved reply store lock poisoned")]
    LockPoisoned,
    #[error("config error: {0}")]
    Config(String),
}

pub trait SavedReplyStore: Send + Sync {
    /// Active replies, most used first.
    fn list_active_replies(&self) -> Result<Vec<SavedReply>, SavedReplyError>;
    fn list_replies(&self) -> Result<Vec<SavedReply>, SavedReplyError>;
    fn get_reply(&self, id: &str) -> Result<Option<SavedReply>, SavedReplyError>;
    fn create_reply(&self, name: &str, content: &str) -> Result<SavedReply, SavedReplyError>;
    fn update_reply(
        &self,
        id: &str,
        name: &str,
        content: &str,
    ) -> Result<SavedReply, SavedReplyError>;
    fn set_active(&self, id: &str, active: bool) -> Result<SavedReply, SavedReplyError>;
    fn record_usage(&self, id: &str) -> Result<SavedReply, SavedReplyError>;
}

pub(crate) fn validate_reply(name: &str, content: &str) -> Result<(), SavedReplyError> {
    if name.trim().is_empty() {
        return Err(SavedReplyError::InvalidReply("name is empty".to_string()));
    }
    if content.trim().is_empty() {
        return Err(SavedReplyError::InvalidReply("content is empty".to_string()));
    }
    Ok(())
}

fn sort_by_popularity(replies: &mut [SavedReply]) {
    replies.sort_by(|a, b| {
        b.usage_count
            .cmp(&a.usage_count)
            .then(b.updated_at.cmp(&a.updated_at))
            .then(a.name.cmp(&b.name))
    });
}

/// Replies held in process memory.
#[derive(Debug, Default)]
pub struct MemorySavedReplyStore {
    replies: RwLock<Vec<SavedReply>>,
}

impl MemorySavedReplyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies(replies: Vec<SavedReply>) -> Self {
        Self {
            replies: RwLock::new(replies),
        }
    }

    fn modify<F>(&self, id: &str, apply: F) -> Result<SavedReply, SavedReplyError>
    where
        F: FnOnce(&mut SavedReply),
    {
        let mut replies = self
            .replies
            .write()
            .map_err(|_| SavedReplyError::LockPoisoned)?;
        let reply = replies
            .iter_mut()
            .find(|reply| reply.id == id)
            .ok_or_else(|| SavedReplyError::NotFound(id.to_string()))?;
        apply(reply);
        Ok(reply.clone())
    }
}

impl SavedReplyStore for MemorySavedReplyStore {
    fn list_active_replies(&self) -> Result<Vec<SavedReply>, SavedReplyError> {
        let mut active: Vec<SavedReply> = self
            .replies
            .read()
            .map_err(|_| SavedReplyError::LockPoisoned)?
            .iter()
            .filter(|reply| reply.is_active)
            .cloned()
            .collect();
        sort_by_popularity(&mut active);
        Ok(active)
    }

    fn list_replies(&self) -> Result<Vec<SavedReply>, SavedReplyError> {
        let mut replies = self
            .replies
            .read()
            .map_err(|_| SavedReplyError::LockPoisoned)?
            .clone();
        replies.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.name.cmp(&b.name)));
        Ok(replies)
    }

    fn get_reply(&self, id: &str) -> Result<Option<SavedReply>, SavedReplyError> {
        let replies = self
            .replies
            .read()
            .map_err(|_| SavedReplyError::LockPoisoned)?;
        Ok(replies.iter().find(|reply| reply.id == id).cloned())
    }

    fn create_reply(&self, name: &str, content: &str) -> Result<SavedReply, SavedReplyError> {
        validate_reply(name, content)?;
        let reply = SavedReply::new(name, content);
        self.replies
            .write()
            .map_err(|_| SavedReplyError::LockPoisoned)?
            .push(reply.clone());
        info!("created saved reply {}", reply.id);
        Ok(reply)
    }

    fn update_reply(
        &self,
        id: &str,
        name: &str,
        content: &str,
    ) -> Result<SavedReply, SavedReplyError> {
        validate_reply(name, content)?;
        self.modify(id, |reply| {
            reply.name = name.trim().to_string();
            reply.content = content.to_string();
            reply.updated_at = Utc::now();
        })
    }

    fn set_active(&self, id: &str, active: bool) -> Result<SavedReply, SavedReplyError> {
        self.modify(id, |reply| {
            reply.is_active = active;
            reply.updated_at = Utc::now();
        })
    }

    fn record_usage(&self, id: &str) -> Result<SavedReply, SavedReplyError> {
        self.modify(id, |reply| reply.usage_count += 1)
    }
}
