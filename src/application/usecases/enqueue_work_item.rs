// Use case: enqueue_work_item.

use crate::application::context::AppContext;
use crate::domain::entities::work_item::{WorkItem, WorkPayload};
use tracing::{info, instrument};

/// Puts a work item on the queue in wire format.
pub struct EnqueueWorkItemUseCase;

#[derive(Debug)]
pub enum EnqueueWorkItemError {
    Encode(String),
    Storage(String),
}

impl EnqueueWorkItemUseCase {
    #[instrument(skip(ctx))]
    pub async fn execute(
        ctx: &AppContext,
        payload: &WorkPayload,
    ) -> Result<WorkItem, EnqueueWorkItemError> {
        // Step 1: Encode the payload.
        let body = payload
            .to_body()
            .map_err(|e| EnqueueWorkItemError::Encode(e.to_string()))?;

        // Step 2: Store it as a ready item.
        let item = ctx
            .repos
            .queue
            .put(body)
            .await
            .map_err(|e| EnqueueWorkItemError::Storage(format!("{e:?}")))?;

        info!(delivery_id = %item.id, kind = payload.kind(), "work_item_enqueued");
        Ok(item)
    }
}
