//! Redis-backed shared counter implementation.

use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::time::Duration;
use tracing::info;

use crate::domain::repositories::CounterStore;
use crate::error::KeygenError;

/// Shared segment counter backed by a Redis integer key.
///
/// `INCRBY` gives the atomic lease; `EXPIRE` keeps the counter key from
/// living forever once the service stops allocating. Uses
/// `ConnectionManager` for connection reuse and automatic reconnects.
pub struct RedisCounter {
    conn: ConnectionManager,
}

impl RedisCounter {
    /// Connects to Redis and validates the connection with a PING.
    ///
    /// # Errors
    ///
    /// Returns [`KeygenError::StoreUnavailable`] if the URL is invalid, the
    /// connection cannot be established, or the PING health check fails.
    pub async fn connect(redis_url: &str) -> Result<Self, KeygenError> {
        info!("Connecting to Redis counter store");

        let client = Client::open(redis_url)
            .map_err(|e| KeygenError::store(format!("failed to create Redis client: {}", e)))?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| KeygenError::store(format!("failed to connect to Redis: {}", e)))?;

        let mut test_conn = conn.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| KeygenError::store(format!("Redis PING failed: {}", e)))?;

        info!("✓ Connected to Redis counter store");

        Ok(Self { conn })
    }
}

#[async_trait]
impl CounterStore for RedisCounter {
    async fn increment_and_get(&self, counter_id: &str, step: i64) -> Result<i64, KeygenError> {
        let mut conn = self.conn.clone();
        let total: i64 = conn.incr(counter_id, step).await?;
        Ok(total)
    }

    async fn set_expiry(&self, counter_id: &str, ttl: Duration) -> Result<(), KeygenError> {
        let mut conn = self.conn.clone();
        conn.expire::<_, ()>(counter_id, ttl.as_secs() as i64)
            .await?;
        Ok(())
    }
}
