// Use case: release_job_lock.

use crate::application::context::AppContext;
use crate::application::shared::job_poller::JobPoller;
use crate::application::shared::outcome::HandlerOutcome;
use crate::application::shared::reservation::{Reservation, ReservationError};
use crate::domain::entities::work_item::JobLockPayload;
use crate::domain::value_objects::cache_keys::{
    LOCK_TTL_SECONDS, USER_INSTANCE_INDEX_PATTERN, cluster_instances_key,
};
use crate::infrastructure::cache::CacheError;
use crate::infrastructure::cache::locked_instances::{LockedInstances, RemoveOutcome};
use crate::infrastructure::cluster::ClusterError;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Waits for a cluster job on a locked instance, then releases the lock.
pub struct ReleaseJobLockUseCase;

#[derive(Debug)]
pub enum ReleaseJobLockError {
    Cache(CacheError),
    Cluster(ClusterError),
    Reservation(ReservationError),
}

impl From<ReservationError> for ReleaseJobLockError {
    fn from(err: ReservationError) -> Self {
        ReleaseJobLockError::Reservation(err)
    }
}

impl From<CacheError> for ReleaseJobLockError {
    fn from(err: CacheError) -> Self {
        ReleaseJobLockError::Cache(err)
    }
}

impl ReleaseJobLockUseCase {
    /// Hold the lock while the job runs; drop it and stale caches once it ends.
    #[instrument(skip(ctx, reservation, payload), fields(delivery_id = %reservation.id, instance = %payload.instance))]
    pub async fn execute(
        ctx: &AppContext,
        reservation: &Reservation,
        payload: &JobLockPayload,
    ) -> Result<HandlerOutcome, ReleaseJobLockError> {
        // Step 1: Resolve the cluster; an unknown slug can never succeed.
        let Some(cluster) = ctx
            .clusters
            .resolve(&payload.cluster)
            .await
            .map_err(ReleaseJobLockError::Cluster)?
        else {
            warn!(cluster = %payload.cluster, "job_lock_unknown_cluster");
            reservation.bury().await?;
            return Ok(HandlerOutcome::Buried("unknown_cluster"));
        };

        // Step 2: Poll while the lock is held, refreshing it and the reservation.
        let lock_ttl = Duration::from_secs(LOCK_TTL_SECONDS);
        let mut poller = JobPoller::new(cluster.as_ref(), payload.job_id);
        loop {
            poller.wait().await;

            if ctx.cache.get(&payload.lock_key).await?.is_none() {
                reservation.delete().await?;
                info!(lock_key = %payload.lock_key, "job_lock_abandoned");
                return Ok(HandlerOutcome::Abandoned);
            }

            // Polling errors never end the wait; the lock must stay alive until the job does.
            match poller.poll().await {
                Ok(Some(_)) => break,
                Ok(None) => {}
                Err(err) => warn!(
                    cluster = %payload.cluster,
                    job_id = %payload.job_id,
                    error = %err,
                    "job_lock_poll_failed"
                ),
            }

            reservation.touch().await?;
            ctx.cache.touch(&payload.lock_key, lock_ttl).await?;
        }

        // Step 3: Release the lock and invalidate everything derived from the instance.
        if !payload.flush_keys.is_empty() {
            ctx.cache.delete_many(&payload.flush_keys).await?;
        }
        ctx.cache.delete(&payload.lock_key).await?;
        Self::unregister_instance(ctx, &payload.instance).await?;
        let user_lists = ctx.cache.delete_pattern(USER_INSTANCE_INDEX_PATTERN).await?;
        ctx.cache
            .delete(&cluster_instances_key(&payload.cluster))
            .await?;

        // Step 4: Acknowledge the work item.
        reservation.delete().await?;
        info!(
            lock_key = %payload.lock_key,
            job_id = %payload.job_id,
            user_lists,
            "job_lock_released"
        );
        Ok(HandlerOutcome::Completed)
    }

    async fn unregister_instance(ctx: &AppContext, instance: &str) -> Result<(), CacheError> {
        let registry = LockedInstances::new(ctx.cache.clone());
        match registry.remove(instance).await? {
            RemoveOutcome::Removed => {}
            RemoveOutcome::MissingMap => warn!("locked_instances_missing"),
            RemoveOutcome::MissingEntry => warn!("locked_instance_not_registered"),
            RemoveOutcome::Unreadable(reason) => {
                warn!(reason = %reason, "locked_instances_unreadable")
            }
        }
        Ok(())
    }
}
