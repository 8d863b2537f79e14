use crate::infrastructure::cache::{CacheError, CacheStore};
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::collections::BTreeMap;
use std::time::Duration;

/// Redis-backed cache gateway with an auto-reconnecting connection.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    const SCAN_BATCH: u32 = 200;

    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(|e| CacheError::Connection(e.to_string()))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        Ok(Self { conn })
    }

    fn ttl_seconds(ttl: Duration) -> u64 {
        ttl.as_secs().max(1)
    }
}

fn command_error(err: redis::RedisError) -> CacheError {
    if err.code() == Some("WRONGTYPE") {
        CacheError::Value(err.to_string())
    } else if err.is_io_error() || err.is_connection_dropped() || err.is_timeout() {
        CacheError::Connection(err.to_string())
    } else {
        CacheError::Command(err.to_string())
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await.map_err(command_error)?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        match ttl {
            Some(ttl) => {
                let _: () = conn
                    .set_ex(key, value, Self::ttl_seconds(ttl))
                    .await
                    .map_err(command_error)?;
            }
            None => {
                let _: () = conn.set(key, value).await.map_err(command_error)?;
            }
        }
        Ok(())
    }

    async fn touch(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let refreshed: bool = conn
            .expire(key, Self::ttl_seconds(ttl) as i64)
            .await
            .map_err(command_error)?;
        Ok(refreshed)
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.del(key).await.map_err(command_error)?;
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<(), CacheError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let _: i64 = conn.del(keys).await.map_err(command_error)?;
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        let mut deleted: u64 = 0;

        // Step 1: Walk the keyspace with SCAN so large stores are never blocked.
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(Self::SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(command_error)?;

            // Step 2: Delete each matching batch.
            if !keys.is_empty() {
                let removed: i64 = conn.del(&keys).await.map_err(command_error)?;
                deleted += removed.max(0) as u64;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(deleted)
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.hset(key, field, value).await.map_err(command_error)?;
        Ok(())
    }

    async fn hash_delete(&self, key: &str, field: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.hdel(key, field).await.map_err(command_error)?;
        Ok(removed > 0)
    }

    async fn hash_get_all(&self, key: &str) -> Result<BTreeMap<String, String>, CacheError> {
        let mut conn = self.conn.clone();
        let fields: BTreeMap<String, String> = conn.hgetall(key).await.map_err(command_error)?;
        Ok(fields)
    }
}
