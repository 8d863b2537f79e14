pub mod locked_instances;
pub mod redis_cache;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache connection error: {0}")]
    Connection(String),

    #[error("cache command error: {0}")]
    Command(String),

    /// The stored value has the wrong shape or type for the command.
    #[error("cache value error: {0}")]
    Value(String),
}

/// Shared key/value store with TTLs.
///
/// Several watcher processes may talk to the same store; last write wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    /// Store `value`; `None` keeps it until explicitly deleted.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;
    /// Reset the TTL of an existing key. Returns `false` if the key is gone.
    async fn touch(&self, key: &str, ttl: Duration) -> Result<bool, CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
    async fn delete_many(&self, keys: &[String]) -> Result<(), CacheError>;
    /// Delete every key matching a glob pattern and return how many went away.
    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError>;
    /// Set one field of a hash, creating the hash if needed.
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), CacheError>;
    /// Remove one field of a hash. Returns `false` if it was not there.
    async fn hash_delete(&self, key: &str, field: &str) -> Result<bool, CacheError>;
    /// Every field of a hash; empty when the key is absent.
    async fn hash_get_all(&self, key: &str) -> Result<BTreeMap<String, String>, CacheError>;
}
