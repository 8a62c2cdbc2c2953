//! PostgreSQL implementation of the key store.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::repositories::KeyStore;
use crate::error::KeygenError;

/// PostgreSQL-backed key store over the `valid_keys` / `used_keys` tables.
///
/// Batch operations use array binds so each refill step is a single
/// round trip regardless of batch size.
pub struct PgKeyStore {
    pool: Arc<PgPool>,
}

impl PgKeyStore {
    /// Creates a new store with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeyStore for PgKeyStore {
    async fn load_valid_keys(&self, limit: usize) -> Result<Vec<String>, KeygenError> {
        let keys = sqlx::query_scalar::<_, String>(
            "SELECT key FROM valid_keys ORDER BY created_at LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(keys)
    }

    async fn all_valid_keys(&self) -> Result<Vec<String>, KeygenError> {
        let keys = sqlx::query_scalar::<_, String>("SELECT key FROM valid_keys")
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(keys)
    }

    async fn filter_existing(&self, keys: &[String]) -> Result<Vec<String>, KeygenError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        // A key deleted from valid_keys on consumption must still count as
        // existing, so both tables participate in the check.
        let existing = sqlx::query_scalar::<_, String>(
            r#"
            SELECT key FROM valid_keys WHERE key = ANY($1)
            UNION
            SELECT key FROM used_keys WHERE key = ANY($1)
            "#,
        )
        .bind(keys)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(existing)
    }

    async fn insert_valid_keys(&self, keys: &[String]) -> Result<(), KeygenError> {
        if keys.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO valid_keys (key)
            SELECT * FROM UNNEST($1::text[])
            ON CONFLICT (key) DO NOTHING
            "#,
        )
        .bind(keys)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn mark_consumed(&self, key: &str) -> Result<(), KeygenError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO used_keys (key) VALUES ($1) ON CONFLICT (key) DO NOTHING")
            .bind(key)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM valid_keys WHERE key = $1")
            .bind(key)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }
}
