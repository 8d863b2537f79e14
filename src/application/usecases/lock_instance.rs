// Use case: lock_instance.

use crate::application::context::AppContext;
use crate::application::usecases::enqueue_work_item::{
    EnqueueWorkItemError, EnqueueWorkItemUseCase,
};
use crate::domain::entities::work_item::{JobLockPayload, WorkItem, WorkPayload};
use crate::domain::value_objects::cache_keys::{
    LOCK_TTL_SECONDS, instance_cache_key, instance_lock_key,
};
use crate::domain::value_objects::ids::ClusterJobId;
use crate::infrastructure::cache::CacheError;
use crate::infrastructure::cache::locked_instances::LockedInstances;
use std::time::Duration;
use tracing::{info, instrument};

/// Marks an instance busy and, for cluster jobs, queues the wait that unlocks it.
pub struct LockInstanceUseCase;

#[derive(Debug, Clone)]
pub struct LockInstanceCommand {
    pub cluster: String,
    pub instance: String,
    pub reason: String,
    pub job_id: Option<ClusterJobId>,
}

#[derive(Debug)]
pub enum LockInstanceError {
    Cache(CacheError),
    Enqueue(EnqueueWorkItemError),
}

#[derive(Debug)]
pub struct LockInstanceResult {
    pub lock_key: String,
    pub work_item: Option<WorkItem>,
}

impl LockInstanceUseCase {
    #[instrument(skip(ctx))]
    pub async fn execute(
        ctx: &AppContext,
        command: LockInstanceCommand,
    ) -> Result<LockInstanceResult, LockInstanceError> {
        // Step 1: Take the lock with a short TTL.
        let lock_key = instance_lock_key(&command.cluster, &command.instance);
        ctx.cache
            .set(
                &lock_key,
                &command.reason,
                Some(Duration::from_secs(LOCK_TTL_SECONDS)),
            )
            .await
            .map_err(LockInstanceError::Cache)?;

        // Step 2: Publish the instance as busy.
        LockedInstances::new(ctx.cache.clone())
            .add(&command.instance, &command.reason)
            .await
            .map_err(LockInstanceError::Cache)?;

        // Step 3: Without a cluster job the lock simply expires.
        let Some(job_id) = command.job_id else {
            return Ok(LockInstanceResult {
                lock_key,
                work_item: None,
            });
        };

        // Step 4: Queue the wait that releases the lock when the job ends.
        let payload = WorkPayload::JobLock(JobLockPayload {
            lock_key: lock_key.clone(),
            instance: command.instance.clone(),
            job_id,
            cluster: command.cluster.clone(),
            flush_keys: vec![instance_cache_key(&command.cluster, &command.instance)],
        });
        let item = EnqueueWorkItemUseCase::execute(ctx, &payload)
            .await
            .map_err(LockInstanceError::Enqueue)?;
        info!(lock_key = %lock_key, job_id = %job_id, "instance_locked");

        Ok(LockInstanceResult {
            lock_key,
            work_item: Some(item),
        })
    }
}
