//! Privacy-preserving word fingerprints for inbound email.
//!
//! Email text is reduced to a set of short keyed hashes so conversations can
//! be matched against search terms without persisting the words themselves.
//! The same secret must be used for indexing and querying, otherwise the
//! fingerprints are not comparable.

use std::collections::HashSet;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rust_stemmers::{Algorithm, Stemmer};
use sha2::Sha256;
use tracing::{debug, warn};

use crate::secrets_store::{SecretStore, SecretStoreError};

type HmacSha256 = Hmac<Sha256>;

pub const HASH_WORDS_SECRET_NAME: &str = "hash-words";
pub const HASHED_WORD_LENGTH: usize = 7;

/// The parts of an email that get indexed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailText {
    pub from: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
}

impl EmailText {
    pub fn new(from: Option<&str>, subject: Option<&str>, body: Option<&str>) -> Self {
        Self {
            from: from.map(str::to_string),
            subject: subject.map(str::to_string),
            body: body.map(str::to_string),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HashedWordsError {
    #[error("secret unavailable: {0}")]
    SecretUnavailable(#[from] SecretStoreError),
    #[error("secret '{0}' is empty")]
    EmptySecret(String),
    #[error("secret cannot key HMAC-SHA256")]
    InvalidKey,
}

pub struct HashedWordExtractor {
    secrets: Arc<dyn SecretStore>,
    secret_name: String,
    stemmer: Stemmer,
}

impl HashedWordExtractor {
    pub fn new(secrets: Arc<dyn SecretStore>) -> Self {
        Self::with_secret_name(secrets, HASH_WORDS_SECRET_NAME)
    }

    pub fn with_secret_name(secrets: Arc<dyn SecretStore>, secret_name: impl Into<String>) -> Self {
        Self {
            secrets,
            secret_name: secret_name.into(),
            stemmer: Stemmer::create(Algorithm::English),
        }
    }

    pub fn secret_name(&self) -> &str {
        &self.secret_name
    }

    /// Fingerprint the sender, subject and body of an email.
    ///
    /// Fails without producing anything when the secret cannot be fetched.
    pub fn extract_hashed_words(
        &self,
        email: &EmailText,
    ) -> Result<HashSet<String>, HashedWordsError> {
        let tokens = collect_tokens(email);
        let hashes = self.hash_tokens(&tokens)?;
        let hashed: HashSet<String> = hashes.into_iter().collect();
        debug!(
            "hashed {} tokens into {} distinct words",
            tokens.len(),
            hashed.len()
        );
        Ok(hashed)
    }

    /// Stem and hash already-normalized tokens, keeping duplicates.
    pub fn hash_tokens(&self, tokens: &[String]) -> Result<Vec<String>, HashedWordsError> {
        let keyed = self.keyed_mac()?;
        let candidates = with_stems(&self.stemmer, tokens);
        Ok(candidates
            .iter()
            .filter_map(|word| truncated_hash(&keyed, word))
            .collect())
    }

    fn keyed_mac(&self) -> Result<HmacSha256, HashedWordsError> {
        let secret = self
            .secrets
            .get_or_create_secret(&self.secret_name)
            .map_err(|err| {
                warn!("failed to load secret '{}': {}", self.secret_name, err);
                HashedWordsError::SecretUnavailable(err)
            })?;
        if secret.is_empty() {
            return Err(HashedWordsError::EmptySecret(self.secret_name.clone()));
        }
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| HashedWordsError::InvalidKey)
    }
}

/// Split an email into raw tokens.
///
/// The sender is one token as-is. Subject and body are lower-cased, split on
/// whitespace and trimmed of surrounding punctuation.
pub fn collect_tokens(email: &EmailText) -> Vec<String> {
    let mut tokens = Vec::new();
    if let Some(from) = email.from.as_deref().filter(|value| !value.is_empty()) {
        tokens.push(from.to_string());
    }
    for text in [email.subject.as_deref(), email.body.as_deref()]
        .into_iter()
        .flatten()
    {
        tokens.extend(split_words(text));
    }
    tokens
}

fn split_words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|word| word.trim_matches(|ch: char| !ch.is_alphanumeric()))
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

// Raw words followed by their stems. Both are indexed so a later lookup can
// hit on either the exact word or its root.
fn with_stems(stemmer: &Stemmer, tokens: &[String]) -> Vec<String> {
    let mut candidates = Vec::with_capacity(tokens.len() * 2);
    candidates.extend(tokens.iter().cloned());
    candidates.extend(tokens.iter().map(|token| stemmer.stem(token).into_owned()));
    candidates
}

fn truncated_hash(keyed: &HmacSha256, word: &str) -> Option<String> {
    let mut mac = keyed.clone();
    mac.update(word.as_bytes());
    let encoded = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    let short: String = encoded.chars().take(HASHED_WORD_LENGTH).collect();
    (!short.is_empty()).then_some(short)
}
