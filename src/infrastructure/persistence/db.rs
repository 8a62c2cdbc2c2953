//! Database pool construction and schema migration.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

use crate::config::Config;
use crate::error::KeygenError;

/// Connects to PostgreSQL with the configured pool limits and applies any
/// pending migrations.
///
/// # Errors
///
/// Returns [`KeygenError::StoreUnavailable`] if the connection cannot be
/// established or a migration fails.
pub async fn connect_pool(config: &Config) -> Result<PgPool, KeygenError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(&config.database_url)
        .await?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| KeygenError::store(format!("failed to migrate: {}", e)))?;

    Ok(pool)
}
