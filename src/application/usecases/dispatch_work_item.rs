// Use case: dispatch_work_item.

use crate::application::context::AppContext;
use crate::application::shared::outcome::HandlerOutcome;
use crate::application::shared::reservation::Reservation;
use crate::application::usecases::release_job_lock::ReleaseJobLockUseCase;
use crate::application::usecases::watch_instance_creation::WatchInstanceCreationUseCase;
use crate::domain::entities::work_item::{PayloadError, WorkPayload};
use crate::domain::workflows::reservation_policy::ReservationPolicy;
use metrics::counter;
use tracing::{error, info, instrument, warn};

/// Reserves one work item and routes it to its handler.
pub struct DispatchWorkItemUseCase;

#[derive(Debug)]
pub enum DispatchWorkItemError {
    Storage(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Nothing was ready.
    Idle,
    /// The item disappeared between reserve and inspection.
    Vanished,
    /// Poisoned or malformed; buried without running a handler.
    Buried(&'static str),
    /// No handler for the item's type; it stays reserved.
    Ignored,
    Handled(HandlerOutcome),
    /// The handler raised; the item stays reserved for redelivery.
    Failed,
}

impl DispatchWorkItemUseCase {
    /// Reserve, screen, and handle a single item.
    #[instrument(skip(ctx))]
    pub async fn execute(
        ctx: &AppContext,
        worker_id: &str,
    ) -> Result<DispatchOutcome, DispatchWorkItemError> {
        // Step 1: Reserve the next item.
        let lease = ctx.settings.queue.lease();
        let Some(item) = ctx
            .repos
            .queue
            .reserve(worker_id, lease)
            .await
            .map_err(|e| DispatchWorkItemError::Storage(format!("{e:?}")))?
        else {
            return Ok(DispatchOutcome::Idle);
        };
        counter!("work_items_reserved_total").increment(1);
        let reservation = Reservation::new(ctx.repos.queue.clone(), item.id, worker_id, lease);

        // Step 2: Bury items that keep coming back.
        let Some(stats) = ctx
            .repos
            .queue
            .stats(item.id)
            .await
            .map_err(|e| DispatchWorkItemError::Storage(format!("{e:?}")))?
        else {
            return Ok(DispatchOutcome::Vanished);
        };
        let policy = ReservationPolicy::new(ctx.settings.queue.reserve_error_threshold);
        if policy.is_poisoned(stats.reserve_count) {
            warn!(
                delivery_id = %item.id,
                reserve_count = stats.reserve_count,
                "work_item_poisoned"
            );
            return Self::bury(&reservation, "reserve_threshold").await;
        }

        // Step 3: Decode the body.
        let payload = match WorkPayload::parse(&item.body) {
            Ok(payload) => payload,
            Err(PayloadError::Malformed(reason)) => {
                warn!(delivery_id = %item.id, reason = %reason, "work_item_malformed");
                return Self::bury(&reservation, "malformed").await;
            }
            Err(PayloadError::UnknownType(kind)) => {
                counter!("work_items_ignored_total").increment(1);
                warn!(delivery_id = %item.id, kind = %kind, "work_item_unknown_type");
                return Ok(DispatchOutcome::Ignored);
            }
        };

        // Step 4: Run the handler; failures leave the item for redelivery.
        let kind = payload.kind();
        info!(
            delivery_id = %item.id,
            kind,
            reserve_count = stats.reserve_count,
            "work_item_dispatched"
        );
        let result = match &payload {
            WorkPayload::Create(create) => {
                WatchInstanceCreationUseCase::execute(ctx, &reservation, create)
                    .await
                    .map_err(|e| format!("{e:?}"))
            }
            WorkPayload::JobLock(job_lock) => {
                ReleaseJobLockUseCase::execute(ctx, &reservation, job_lock)
                    .await
                    .map_err(|e| format!("{e:?}"))
            }
        };

        // Step 5: Record the outcome.
        match result {
            Ok(HandlerOutcome::Buried(reason)) => {
                counter!("work_items_buried_total", "reason" => reason).increment(1);
                Ok(DispatchOutcome::Handled(HandlerOutcome::Buried(reason)))
            }
            Ok(outcome) => {
                counter!("work_items_completed_total", "kind" => kind).increment(1);
                Ok(DispatchOutcome::Handled(outcome))
            }
            Err(reason) => {
                counter!("handler_errors_total", "kind" => kind).increment(1);
                error!(delivery_id = %item.id, kind, error = %reason, "work_item_handler_failed");
                Ok(DispatchOutcome::Failed)
            }
        }
    }

    async fn bury(
        reservation: &Reservation,
        reason: &'static str,
    ) -> Result<DispatchOutcome, DispatchWorkItemError> {
        reservation
            .bury()
            .await
            .map_err(|e| DispatchWorkItemError::Storage(format!("{e:?}")))?;
        counter!("work_items_buried_total", "reason" => reason).increment(1);
        Ok(DispatchOutcome::Buried(reason))
    }
}
