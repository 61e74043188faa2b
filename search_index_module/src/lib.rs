pub mod config;
pub mod hashed_words;
pub mod secrets_store;

pub use config::{build_secret_store, SearchIndexConfig, SecretsBackend};
pub use hashed_words::{
    collect_tokens, EmailText, HashedWordExtractor, HashedWordsError, HASHED_WORD_LENGTH,
    HASH_WORDS_SECRET_NAME,
};
pub use secrets_store::{
    generate_secret, CachedSecretStore, MemorySecretStore, PostgresSecretStore, SecretStore,
    SecretStoreError, SqliteSecretStore,
};
