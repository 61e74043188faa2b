mod test_support;

use search_index_module::{
    build_secret_store, CachedSecretStore, EmailText, HashedWordExtractor, PostgresSecretStore,
    SearchIndexConfig, SecretStore, SqliteSecretStore, HASHED_WORD_LENGTH,
    HASH_WORDS_SECRET_NAME,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn sample_email() -> EmailText {
    EmailText::new(
        Some("jane.doe@example.com"),
        Some("Refund for order #4411"),
        Some("Hi team,\n\nMy package arrived damaged. I'd like a refund, please!\n\nThanks,\nJane"),
    )
}

#[test]
fn hashes_survive_a_process_restart() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let db_path = temp.path().join("secrets.db");

    let before = {
        let store = CachedSecretStore::new(SqliteSecretStore::new(&db_path)?);
        HashedWordExtractor::new(Arc::new(store)).extract_hashed_words(&sample_email())?
    };
    let after = {
        let store = CachedSecretStore::new(SqliteSecretStore::new(&db_path)?);
        HashedWordExtractor::new(Arc::new(store)).extract_hashed_words(&sample_email())?
    };

    assert_eq!(before, after);
    assert!(before.iter().all(|word| word.len() == HASHED_WORD_LENGTH));
    Ok(())
}

#[test]
fn query_terms_hit_indexed_email() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let config = SearchIndexConfig::with_state_dir(temp.path());
    let extractor = HashedWordExtractor::new(build_secret_store(&config)?);

    let indexed = extractor.extract_hashed_words(&sample_email())?;
    let query = extractor.extract_hashed_words(&EmailText::new(None, Some("refunds"), None))?;
    assert!(!query.is_disjoint(&indexed));

    let unrelated = extractor.extract_hashed_words(&EmailText::new(None, Some("invoice"), None))?;
    assert!(unrelated.is_disjoint(&indexed));
    Ok(())
}

#[test]
fn separate_databases_produce_unrelated_hashes() -> Result<(), Box<dyn std::error::Error>> {
    let first = TempDir::new()?;
    let second = TempDir::new()?;

    let a = HashedWordExtractor::new(Arc::new(SqliteSecretStore::new(
        first.path().join("secrets.db"),
    )?))
    .extract_hashed_words(&sample_email())?;
    let b = HashedWordExtractor::new(Arc::new(SqliteSecretStore::new(
        second.path().join("secrets.db"),
    )?))
    .extract_hashed_words(&sample_email())?;

    assert_ne!(a, b);
    Ok(())
}

#[test]
fn concurrent_extractions_agree() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let config = SearchIndexConfig::with_state_dir(temp.path());
    let extractor = Arc::new(HashedWordExtractor::new(build_secret_store(&config)?));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let extractor = Arc::clone(&extractor);
            thread::spawn(move || extractor.extract_hashed_words(&sample_email()).unwrap())
        })
        .collect();
    let results: Vec<HashSet<String>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
    Ok(())
}

#[test]
fn postgres_store_round_trips_secret() -> Result<(), Box<dyn std::error::Error>> {
    let Some(db_url) = test_support::require_supabase_db_url("postgres_store_round_trips_secret")
    else {
        return Ok(());
    };
    let store = PostgresSecretStore::new(&db_url)?;
    let created = store.get_or_create_secret(HASH_WORDS_SECRET_NAME)?;
    assert_eq!(store.get_or_create_secret(HASH_WORDS_SECRET_NAME)?, created);
    assert_eq!(store.get_secret(HASH_WORDS_SECRET_NAME)?, Some(created));
    Ok(())
}
