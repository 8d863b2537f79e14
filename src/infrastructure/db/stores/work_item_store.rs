use crate::infrastructure::db::database::DatabaseError;
use crate::infrastructure::db::dto::WorkItemRow;
use async_trait::async_trait;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkItemRepositoryError {
    NotFound,
    InvalidInput,
    StorageUnavailable,
}

impl From<DatabaseError> for WorkItemRepositoryError {
    fn from(_: DatabaseError) -> Self {
        WorkItemRepositoryError::StorageUnavailable
    }
}

/// Durable work queue with reservation leases.
#[async_trait]
pub trait WorkItemStore: Send + Sync {
    /// Enqueue a ready item and return exactly what was stored.
    async fn insert(&self, row: &WorkItemRow) -> Result<WorkItemRow, WorkItemRepositoryError>;
    /// Atomically reserve the oldest ready item, or one whose lease expired.
    ///
    /// Reserving increments the item's `reserve_count`.
    async fn reserve(
        &self,
        worker_id: &str,
        lease_expires_at: OffsetDateTime,
    ) -> Result<Option<WorkItemRow>, WorkItemRepositoryError>;
    /// Fetch an item by its delivery id. Returns `None` if it doesn't exist.
    async fn get(&self, id: uuid::Uuid) -> Result<Option<WorkItemRow>, WorkItemRepositoryError>;
    /// Extend the lease of an item still reserved by `worker_id`.
    ///
    /// Returns `NotFound` when the reservation was lost.
    async fn touch(
        &self,
        id: uuid::Uuid,
        worker_id: &str,
        lease_expires_at: OffsetDateTime,
    ) -> Result<(), WorkItemRepositoryError>;
    /// Remove an item permanently. Returns an error if it doesn't exist.
    async fn delete(&self, id: uuid::Uuid) -> Result<(), WorkItemRepositoryError>;
    /// Park an item for operator inspection. Returns an error if it doesn't exist.
    async fn bury(&self, id: uuid::Uuid) -> Result<(), WorkItemRepositoryError>;
    /// Number of items waiting to be reserved.
    async fn queue_depth(&self) -> Result<u64, WorkItemRepositoryError>;
}
