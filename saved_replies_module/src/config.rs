use std::env;
use std::path::{Path, PathBuf};

use crate::fuzzy::FuzzyOptions;
use crate::store::SavedReplyError;

const DEFAULT_FUZZY_THRESHOLD: f64 = 0.4;

#[derive(Debug, Clone)]
pub struct SavedRepliesConfig {
    /// Shared with the search index.
    pub state_dir: PathBuf,
    pub db_path: PathBuf,
    pub fuzzy_threshold: f64,
}

impl SavedRepliesConfig {
    pub fn from_env() -> Result<Self, SavedReplyError> {
        dotenvy::dotenv().ok();

        let state_dir = match non_empty_env("SEARCH_INDEX_STATE_DIR") {
            Some(value) => PathBuf::from(value),
            None => default_state_dir()?,
        };
        let db_path = non_empty_env("SAVED_REPLIES_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| state_dir.join("saved_replies.db"));
        let fuzzy_threshold = match non_empty_env("SAVED_REPLIES_FUZZY_THRESHOLD") {
            Some(raw) => parse_threshold(&raw)?,
            None => DEFAULT_FUZZY_THRESHOLD,
        };

        Ok(Self {
            state_dir,
            db_path,
            fuzzy_threshold,
        })
    }

    pub fn with_state_dir(state_dir: impl AsRef<Path>) -> Self {
        let state_dir = state_dir.as_ref().to_path_buf();
        Self {
            db_path: state_dir.join("saved_replies.db"),
            state_dir,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }

    pub fn fuzzy_options(&self) -> FuzzyOptions {
        FuzzyOptions {
            threshold: self.fuzzy_threshold,
            ..FuzzyOptions::default()
        }
    }
}

fn parse_threshold(raw: &str) -> Result<f64, SavedReplyError> {
    let value: f64 = raw.parse().map_err(|_| {
        SavedReplyError::Config(format!("SAVED_REPLIES_FUZZY_THRESHOLD '{}' is not a number", raw))
    })?;
    if !(0.0..=1.0).contains(&value) {
        return Err(SavedReplyError::Config(format!(
            "SAVED_REPLIES_FUZZY_THRESHOLD must be within 0..=1, got {}",
            value
        )));
    }
    Ok(value)
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn default_state_dir() -> Result<PathBuf, SavedReplyError> {
    let home = dirs::home_dir()
        .ok_or_else(|| SavedReplyError::Config("home directory not found".to_string()))?;
    Ok(home.join(".support_desk").join("state"))
}
