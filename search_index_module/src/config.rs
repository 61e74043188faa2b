use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::hashed_words::HASH_WORDS_SECRET_NAME;
use crate::secrets_store::{
    CachedSecretStore, PostgresSecretStore, SecretStore, SecretStoreError, SqliteSecretStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretsBackend {
    Sqlite,
    Postgres,
}

impl SecretsBackend {
    fn parse(raw: &str) -> Result<Self, SecretStoreError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "sqlite" => Ok(Self::Sqlite),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(SecretStoreError::Config(format!(
                "unknown SECRETS_BACKEND '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchIndexConfig {
    pub state_dir: PathBuf,
    pub secrets_backend: SecretsBackend,
    pub secrets_db_path: PathBuf,
    /// Logical name of the key used for word hashing.
    pub hash_words_secret_name: String,
}

impl SearchIndexConfig {
    pub fn from_env() -> Result<Self, SecretStoreError> {
        dotenvy::dotenv().ok();

        let state_dir = match non_empty_env("SEARCH_INDEX_STATE_DIR") {
            Some(value) => PathBuf::from(value),
            None => default_state_dir()?,
        };
        let secrets_backend = SecretsBackend::parse(
            &non_empty_env("SECRETS_BACKEND").unwrap_or_default(),
        )?;
        let secrets_db_path = non_empty_env("SECRETS_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| state_dir.join("secrets.db"));
        let hash_words_secret_name = non_empty_env("HASH_WORDS_SECRET_NAME")
            .unwrap_or_else(|| HASH_WORDS_SECRET_NAME.to_string());

        Ok(Self {
            state_dir,
            secrets_backend,
            secrets_db_path,
            hash_words_secret_name,
        })
    }

    pub fn with_state_dir(state_dir: impl AsRef<Path>) -> Self {
        let state_dir = state_dir.as_ref().to_path_buf();
        Self {
            secrets_db_path: state_dir.join("secrets.db"),
            state_dir,
            secrets_backend: SecretsBackend::Sqlite,
            hash_words_secret_name: HASH_WORDS_SECRET_NAME.to_string(),
        }
    }
}

/// Open the configured backend behind a process-wide cache.
pub fn build_secret_store(
    config: &SearchIndexConfig,
) -> Result<Arc<dyn SecretStore>, SecretStoreError> {
    let store: Arc<dyn SecretStore> = match config.secrets_backend {
        SecretsBackend::Sqlite => Arc::new(CachedSecretStore::new(SqliteSecretStore::new(
            &config.secrets_db_path,
        )?)),
        SecretsBackend::Postgres => {
            Arc::new(CachedSecretStore::new(PostgresSecretStore::from_env()?))
        }
    };
    Ok(store)
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn default_state_dir() -> Result<PathBuf, SecretStoreError> {
    let home = dirs::home_dir()
        .ok_or_else(|| SecretStoreError::Config("home directory not found".to_string()))?;
    Ok(home.join(".support_desk").join("state"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    const KEYS: [&str; 4] = [
        "SEARCH_INDEX_STATE_DIR",
        "SECRETS_BACKEND",
        "SECRETS_DB_PATH",
        "HASH_WORDS_SECRET_NAME",
    ];

    struct EnvGuard {
        saved: Vec<(&'static str, Option<String>)>,
    }

    impl EnvGuard {
        fn set(vars: &[(&'static str, &str)]) -> Self {
            let saved = KEYS.iter().map(|key| (*key, env::var(key).ok())).collect();
            for key in KEYS {
                env::remove_var(key);
            }
            for (key, value) in vars {
                env::set_var(key, value);
            }
            Self { saved }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.saved.drain(..) {
                match value {
                    Some(value) => env::set_var(key, value),
                    None => env::remove_var(key),
                }
            }
        }
    }

    #[test]
    #[serial]
    fn defaults_derive_from_state_dir() {
        let temp = TempDir::new().unwrap();
        let state = temp.path().to_str().unwrap();
        let _env = EnvGuard::set(&[("SEARCH_INDEX_STATE_DIR", state)]);

        let config = SearchIndexConfig::from_env().unwrap();
        assert_eq!(config.state_dir, temp.path());
        assert_eq!(config.secrets_db_path, temp.path().join("secrets.db"));
        assert_eq!(config.secrets_backend, SecretsBackend::Sqlite);
        assert_eq!(config.hash_words_secret_name, "hash-words");
    }

    #[test]
    #[serial]
    fn explicit_values_override_defaults() {
        let temp = TempDir::new().unwrap();
        let state = temp.path().to_str().unwrap();
        let db = temp.path().join("other.db");
        let _env = EnvGuard::set(&[
            ("SEARCH_INDEX_STATE_DIR", state),
            ("SECRETS_DB_PATH", db.to_str().unwrap()),
            ("SECRETS_BACKEND", "Postgres"),
            ("HASH_WORDS_SECRET_NAME", "hash-words-v2"),
        ]);

        let config = SearchIndexConfig::from_env().unwrap();
        assert_eq!(config.secrets_db_path, db);
        assert_eq!(config.secrets_backend, SecretsBackend::Postgres);
        assert_eq!(config.hash_words_secret_name, "hash-words-v2");
    }

    #[test]
    #[serial]
    fn unknown_backend_is_rejected() {
        let temp = TempDir::new().unwrap();
        let state = temp.path().to_str().unwrap();
        let _env = EnvGuard::set(&[
            ("SEARCH_INDEX_STATE_DIR", state),
            ("SECRETS_BACKEND", "redis"),
        ]);

        assert!(matches!(
            SearchIndexConfig::from_env(),
            Err(SecretStoreError::Config(_))
        ));
    }

    #[test]
    fn sqlite_backend_builds_a_working_store() {
        let temp = TempDir::new().unwrap();
        let config = SearchIndexConfig::with_state_dir(temp.path());
        let store = build_secret_store(&config).unwrap();

        let secret = store.get_or_create_secret("hash-words").unwrap();
        assert_eq!(store.get_secret("hash-words").unwrap(), Some(secret));
        assert!(config.secrets_db_path.exists());
    }
}
