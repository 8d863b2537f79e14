use crate::domain::entities::work_item::{WorkItem, WorkItemStats};
use crate::domain::value_objects::ids::DeliveryId;
use crate::domain::value_objects::timestamps::Timestamp;
use crate::infrastructure::db::dto::WorkItemRow;
use crate::infrastructure::db::stores::work_item_store::{WorkItemRepositoryError, WorkItemStore};
use std::sync::Arc;
use time::Duration;

/// Queue gateway used by producers and workers.
pub struct QueueRepository {
    store: Arc<dyn WorkItemStore>,
}

impl QueueRepository {
    pub fn new(store: Arc<dyn WorkItemStore>) -> Self {
        Self { store }
    }

    /// Enqueue a new work item with the given wire body.
    pub async fn put(&self, body: String) -> Result<WorkItem, WorkItemRepositoryError> {
        if body.trim().is_empty() {
            return Err(WorkItemRepositoryError::InvalidInput);
        }
        let row = WorkItemRow::ready(body, Timestamp::now_utc());
        let stored = self.store.insert(&row).await?;
        Ok(stored.into_work_item())
    }

    /// Reserve the next available item for `worker_id` with a lease of `lease`.
    pub async fn reserve(
        &self,
        worker_id: &str,
        lease: Duration,
    ) -> Result<Option<WorkItem>, WorkItemRepositoryError> {
        let lease_expires_at = Timestamp::now_utc().after(lease);
        let row = self
            .store
            .reserve(worker_id, lease_expires_at.as_inner())
            .await?;

        Ok(row.map(WorkItemRow::into_work_item))
    }

    /// Current queue-side bookkeeping for an item, if it still exists.
    pub async fn stats(
        &self,
        id: DeliveryId,
    ) -> Result<Option<WorkItemStats>, WorkItemRepositoryError> {
        let Some(row) = self.store.get(id.0).await? else {
            return Ok(None);
        };
        let item = row.into_work_item();

        Ok(Some(WorkItemStats {
            reserve_count: item.reserve_count,
            state: item.state,
            age: Timestamp::now_utc().since(item.created_at),
        }))
    }

    /// Extend the reservation so the queue does not redeliver while work is ongoing.
    pub async fn touch(
        &self,
        id: DeliveryId,
        worker_id: &str,
        lease: Duration,
    ) -> Result<(), WorkItemRepositoryError> {
        let lease_expires_at = Timestamp::now_utc().after(lease);
        self.store
            .touch(id.0, worker_id, lease_expires_at.as_inner())
            .await
    }

    /// Mark an item permanently done.
    pub async fn delete(&self, id: DeliveryId) -> Result<(), WorkItemRepositoryError> {
        self.store.delete(id.0).await
    }

    /// Remove an item from active processing without deleting it.
    pub async fn bury(&self, id: DeliveryId) -> Result<(), WorkItemRepositoryError> {
        self.store.bury(id.0).await
    }

    pub async fn queue_depth(&self) -> Result<u64, WorkItemRepositoryError> {
        self.store.queue_depth().await
    }
}
