use crate::domain::value_objects::cache_keys::LOCKED_INSTANCES;
use crate::infrastructure::cache::{CacheError, CacheStore};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Result of removing an instance from the shared busy-instance registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    MissingMap,
    MissingEntry,
    /// The registry key holds something other than a hash; it is left untouched.
    Unreadable(String),
}

/// Registry of instance name -> lock reason that the portal UI reads.
///
/// Stored as one cache hash so that each worker only ever writes its own field.
pub struct LockedInstances {
    cache: Arc<dyn CacheStore>,
}

impl LockedInstances {
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self { cache }
    }

    /// Current map, `None` when the registry is absent.
    pub async fn load(&self) -> Result<Option<BTreeMap<String, String>>, CacheError> {
        let map = self.cache.hash_get_all(LOCKED_INSTANCES).await?;
        Ok((!map.is_empty()).then_some(map))
    }

    /// Mark `instance` as busy with `reason`.
    pub async fn add(&self, instance: &str, reason: &str) -> Result<(), CacheError> {
        match self.cache.hash_set(LOCKED_INSTANCES, instance, reason).await {
            // An unreadable registry is replaced rather than blocking new locks.
            Err(CacheError::Value(_)) => {
                self.cache.delete(LOCKED_INSTANCES).await?;
                self.cache.hash_set(LOCKED_INSTANCES, instance, reason).await
            }
            other => other,
        }
    }

    /// Drop `instance` from the registry, tolerating a missing map or entry.
    pub async fn remove(&self, instance: &str) -> Result<RemoveOutcome, CacheError> {
        match self.cache.hash_delete(LOCKED_INSTANCES, instance).await {
            Ok(true) => Ok(RemoveOutcome::Removed),
            Ok(false) => {
                // Only used to pick the log line; a concurrent writer may change it.
                let missing = self.cache.hash_get_all(LOCKED_INSTANCES).await?.is_empty();
                Ok(if missing {
                    RemoveOutcome::MissingMap
                } else {
                    RemoveOutcome::MissingEntry
                })
            }
            Err(CacheError::Value(reason)) => Ok(RemoveOutcome::Unreadable(reason)),
            Err(err) => Err(err),
        }
    }
}
