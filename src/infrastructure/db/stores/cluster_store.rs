use crate::infrastructure::db::database::DatabaseError;
use crate::infrastructure::db::dto::ClusterRow;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterRepositoryError {
    StorageUnavailable,
}

impl From<DatabaseError> for ClusterRepositoryError {
    fn from(_: DatabaseError) -> Self {
        ClusterRepositoryError::StorageUnavailable
    }
}

#[async_trait]
pub trait ClusterStore: Send + Sync {
    /// Fetch a cluster by slug. Returns `None` if no such cluster is registered.
    async fn get_by_slug(&self, slug: &str) -> Result<Option<ClusterRow>, ClusterRepositoryError>;
}
