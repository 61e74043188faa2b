//! Named secret storage for keyed hashing.
//!
//! A secret is created once per logical name and reused for the lifetime of
//! the backing store. Creation is idempotent: concurrent callers asking for
//! the same name converge on whichever value was persisted first.

mod postgres_store;
mod sqlite_store;

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use rand::RngCore;

pub use self::postgres_store::PostgresSecretStore;
pub use self::sqlite_store::SqliteSecretStore;

const SECRET_BYTES: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum SecretStoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("postgres error: {0}")]
    Postgres(#[from] postgres::Error),
    #[error("pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid secret name: {0:?}")]
    InvalidName(String),
    #[error("missing SUPABASE_DB_URL")]
    MissingDbUrl,
    #[error("secret store config error: {0}")]
    Config(String),
    #[error("secret store lock poisoned")]
    LockPoisoned,
}

pub trait SecretStore: Send + Sync {
    /// Return the secret stored under `name`, creating it on first use.
    fn get_or_create_secret(&self, name: &str) -> Result<String, SecretStoreError>;
    fn get_secret(&self, name: &str) -> Result<Option<String>, SecretStoreError>;
}

/// Random key material, base64 encoded.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    BASE64_STANDARD.encode(bytes)
}

pub(crate) fn validate_name(name: &str) -> Result<&str, SecretStoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed != name {
        return Err(SecretStoreError::InvalidName(name.to_string()));
    }
    Ok(trimmed)
}

/// In-process store, mostly for tests and single-binary setups.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: Mutex<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secrets<I, K, V>(secrets: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let secrets = secrets
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        Self {
            secrets: Mutex::new(secrets),
        }
    }
}

impl SecretStore for MemorySecretStore {
    fn get_or_create_secret(&self, name: &str) -> Result<String, SecretStoreError> {
        let name = validate_name(name)?;
        let mut secrets = self
            .secrets
            .lock()
            .map_err(|_| SecretStoreError::LockPoisoned)?;
        Ok(secrets
            .entry(name.to_string())
            .or_insert_with(generate_secret)
            .clone())
    }

    fn get_secret(&self, name: &str) -> Result<Option<String>, SecretStoreError> {
        let name = validate_name(name)?;
        let secrets = self
            .secrets
            .lock()
            .map_err(|_| SecretStoreError::LockPoisoned)?;
        Ok(secrets.get(name).cloned())
    }
}

/// Memoizes secrets fetched from another store.
///
/// The host process owns one instance and hands it to every consumer, so a
/// secret is read from the backing store at most once per name unless two
/// callers race on the very first lookup. In that case both receive the value
/// the backing store settled on and the first one cached wins.
pub struct CachedSecretStore<S> {
    inner: S,
    cache: RwLock<HashMap<String, String>>,
}

impl<S: SecretStore> CachedSecretStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn cached(&self, name: &str) -> Result<Option<String>, SecretStoreError> {
        let cache = self
            .cache
            .read()
            .map_err(|_| SecretStoreError::LockPoisoned)?;
        Ok(cache.get(name).cloned())
    }

    fn remember(&self, name: &str, value: String) -> Result<String, SecretStoreError> {
        let mut cache = self
            .cache
            .write()
            .map_err(|_| SecretStoreError::LockPoisoned)?;
        Ok(cache.entry(name.to_string()).or_insert(value).clone())
    }
}

impl<S: SecretStore> SecretStore for CachedSecretStore<S> {
    fn get_or_create_secret(&self, name: &str) -> Result<String, SecretStoreError> {
        if let Some(value) = self.cached(name)? {
            return Ok(value);
        }
        let value = self.inner.get_or_create_secret(name)?;
        self.remember(name, value)
    }

    fn get_secret(&self, name: &str) -> Result<Option<String>, SecretStoreError> {
        if let Some(value) = self.cached(name)? {
            return Ok(Some(value));
        }
        match self.inner.get_secret(name)? {
            Some(value) => self.remember(name, value).map(Some),
            None => Ok(None),
        }
    }
}
