// Use case: worker_loop.

use crate::application::context::AppContext;
use crate::application::usecases::dispatch_work_item::{DispatchOutcome, DispatchWorkItemUseCase};
use std::time::Duration;
use tracing::{info, warn};

/// Runs one worker continuously until a shutdown signal is received.
pub struct WorkerLoopUseCase;

impl WorkerLoopUseCase {
    /// Dispatch items back to back; wait `idle_poll` whenever the queue is empty.
    pub async fn run(
        ctx: &AppContext,
        worker_id: &str,
        idle_poll: Duration,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) {
        // Step 1: Loop until the shutdown signal is triggered.
        loop {
            if *shutdown.borrow() {
                break;
            }

            // Step 2: Handle at most one item.
            let pause = match DispatchWorkItemUseCase::execute(ctx, worker_id).await {
                Ok(DispatchOutcome::Idle) => true,
                Ok(_) => false,
                Err(err) => {
                    warn!(worker_id, error = ?err, "work_item_reserve_failed");
                    true
                }
            };
            if !pause {
                continue;
            }

            // Step 3: Sleep until the next reserve attempt or shutdown.
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(idle_poll) => {}
            }
        }

        // Step 4: Exit cleanly once shutdown is signaled.
        info!(worker_id, "worker_stopped");
    }
}
