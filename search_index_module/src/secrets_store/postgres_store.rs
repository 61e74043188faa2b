use postgres_native_tls::MakeTlsConnector;
use r2d2::{Pool, PooledConnection};
use r2d2_postgres::PostgresConnectionManager;
use std::env;
use std::time::Duration;
use tracing::{error, info};

use super::{generate_secret, validate_name, SecretStore, SecretStoreError};

#[derive(Debug)]
struct LoggingErrorHandler;

impl r2d2::HandleError<postgres::Error> for LoggingErrorHandler {
    fn handle_error(&self, err: postgres::Error) {
        error!("secrets_store postgres pool error: {:?}", err);
    }
}

/// Secrets persisted in the shared Postgres database.
#[derive(Clone)]
pub struct PostgresSecretStore {
    pool: Pool<PostgresConnectionManager<MakeTlsConnector>>,
}

impl PostgresSecretStore {
    pub fn from_env() -> Result<Self, SecretStoreError> {
        let db_url = env::var("SUPABASE_DB_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or(SecretStoreError::MissingDbUrl)?;
        Self::new(&db_url)
    }

    pub fn new(db_url: &str) -> Result<Self, SecretStoreError> {
        let config: postgres::Config = db_url.parse()?;

        let mut tls_builder = native_tls::TlsConnector::builder();
        if env::var("SECRETS_TLS_ALLOW_INVALID_CERTS")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false)
        {
            tls_builder.danger_accept_invalid_certs(true);
            tls_builder.danger_accept_invalid_hostnames(true);
        }
        let tls_connector = tls_builder
            .build()
            .map_err(|e| SecretStoreError::Config(e.to_string()))?;
        let tls = MakeTlsConnector::new(tls_connector);

        let manager = PostgresConnectionManager::new(config, tls);
        let pool = Pool::builder()
            .max_size(4)
            .connection_timeout(Duration::from_secs(5))
            .idle_timeout(Some(Duration::from_secs(300)))
            .error_handler(Box::new(LoggingErrorHandler))
            .build(manager)?;

        let store = Self { pool };
        store.ensure_schema()?;
        Ok(store)
    }

    fn conn(
        &self,
    ) -> Result<PooledConnection<PostgresConnectionManager<MakeTlsConnector>>, SecretStoreError>
    {
        Ok(self.pool.get()?)
    }

    fn ensure_schema(&self) -> Result<(), SecretStoreError> {
        let mut conn = self.conn()?;
        conn.batch_execute(
            "CREATE TABLE IF NOT EXISTS secrets (
                name TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
        )?;
        Ok(())
    }
}

impl SecretStore for PostgresSecretStore {
    fn get_or_create_secret(&self, name: &str) -> Result<String, SecretStoreError> {
        let name = validate_name(name)?;
        let candidate = generate_secret();
        let mut conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT INTO secrets (name, value, created_at)
             VALUES ($1, $2, NOW())
             ON CONFLICT (name) DO NOTHING",
            &[&name, &candidate],
        )?;
        if inserted > 0 {
            info!("created secret '{}' in postgres", name);
        }
        let row = conn.query_one("SELECT value FROM secrets WHERE name = $1", &[&name])?;
        Ok(row.get(0))
    }

    fn get_secret(&self, name: &str) -> Result<Option<String>, SecretStoreError> {
        let name = validate_name(name)?;
        let mut conn = self.conn()?;
        let row = conn.query_opt("SELECT value FROM secrets WHERE name = $1", &[&name])?;
        Ok(row.map(|r| r.get(0)))
    }
}
