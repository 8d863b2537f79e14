use crate::domain::value_objects::ids::DeliveryId;
use crate::infrastructure::db::repositories::queue_repository::QueueRepository;
use crate::infrastructure::db::stores::work_item_store::WorkItemRepositoryError;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationError {
    /// Another worker now holds the item.
    LeaseLost,
    Storage(String),
}

/// A worker's hold on one reserved work item.
#[derive(Clone)]
pub struct Reservation {
    queue: Arc<QueueRepository>,
    pub id: DeliveryId,
    pub worker_id: String,
    lease: time::Duration,
}

impl Reservation {
    pub fn new(
        queue: Arc<QueueRepository>,
        id: DeliveryId,
        worker_id: impl Into<String>,
        lease: time::Duration,
    ) -> Self {
        Self {
            queue,
            id,
            worker_id: worker_id.into(),
            lease,
        }
    }

    /// Extend the lease so the queue does not redeliver while work continues.
    pub async fn touch(&self) -> Result<(), ReservationError> {
        self.queue
            .touch(self.id, &self.worker_id, self.lease)
            .await
            .map_err(|e| match e {
                WorkItemRepositoryError::NotFound => ReservationError::LeaseLost,
                other => ReservationError::Storage(format!("{other:?}")),
            })
    }

    /// Acknowledge the item. An item already gone counts as done.
    pub async fn delete(&self) -> Result<(), ReservationError> {
        match self.queue.delete(self.id).await {
            Ok(()) => Ok(()),
            Err(WorkItemRepositoryError::NotFound) => {
                debug!(delivery_id = %self.id, "work_item_already_deleted");
                Ok(())
            }
            Err(e) => Err(ReservationError::Storage(format!("{e:?}"))),
        }
    }

    pub async fn bury(&self) -> Result<(), ReservationError> {
        self.queue
            .bury(self.id)
            .await
            .map_err(|e| ReservationError::Storage(format!("{e:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::{Reservation, ReservationError};
    use crate::application::context::test_support::harness;
    use crate::domain::entities::work_item::WorkItemState;
    use time::Duration;

    #[tokio::test]
    async fn given_stolen_item_when_touched_should_report_lease_lost() {
        let h = harness();
        let id = h.queue.push(r#"{"type":"CREATE","application_id":1}"#, 0);
        h.ctx
            .repos
            .queue
            .reserve("worker-1", Duration::seconds(60))
            .await
            .unwrap();
        let reservation = Reservation::new(h.ctx.repos.queue.clone(), id, "worker-1", Duration::seconds(60));

        assert_eq!(reservation.touch().await, Ok(()));
        h.queue.steal(id);
        assert_eq!(reservation.touch().await, Err(ReservationError::LeaseLost));
    }

    #[tokio::test]
    async fn given_deleted_item_when_deleted_again_should_succeed() {
        let h = harness();
        let id = h.queue.push("{}", 0);
        let reservation = Reservation::new(h.ctx.repos.queue.clone(), id, "worker-1", Duration::seconds(60));

        reservation.delete().await.unwrap();
        reservation.delete().await.unwrap();
        assert_eq!(h.queue.state(id), None);
    }

    #[tokio::test]
    async fn given_item_when_buried_should_park_it() {
        let h = harness();
        let id = h.queue.push("{}", 0);
        let reservation = Reservation::new(h.ctx.repos.queue.clone(), id, "worker-1", Duration::seconds(60));

        reservation.bury().await.unwrap();
        assert_eq!(h.queue.state(id), Some(WorkItemState::Buried));
    }
}
