// Use case: worker_pool.

use crate::application::context::AppContext;
use crate::application::usecases::worker_loop::WorkerLoopUseCase;
use metrics::counter;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tracing::{error, info, warn};

struct WorkerHandle {
    id: String,
    join: tokio::task::JoinHandle<()>,
}

/// Fixed-size pool of workers that replaces any worker that dies.
pub struct WorkerPool {
    ctx: Arc<AppContext>,
    size: usize,
    idle_poll: Duration,
    shutdown_grace: Duration,
    supervise_interval: Duration,
    handles: Mutex<Vec<WorkerHandle>>,
    next_id: AtomicUsize,
    shutdown: watch::Sender<bool>,
}

impl WorkerPool {
    /// Build a pool sized from settings (at least one worker).
    pub fn new(ctx: Arc<AppContext>, size: usize) -> Self {
        let idle_poll = Duration::from_millis(ctx.settings.queue.idle_poll_ms);
        let shutdown_grace = Duration::from_millis(ctx.settings.workers.shutdown_grace_ms);
        let (shutdown, _) = watch::channel(false);

        Self {
            ctx,
            size: size.max(1),
            idle_poll,
            shutdown_grace,
            supervise_interval: Duration::from_secs(1),
            handles: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
            shutdown,
        }
    }

    /// Run the pool until `stop` flips to true, then shut it down.
    pub async fn run(self: Arc<Self>, mut stop: watch::Receiver<bool>) {
        // Step 1: Spawn the workers.
        self.start().await;
        info!(workers = self.size, "worker_pool_started");

        // Step 2: Replace dead workers until asked to stop.
        loop {
            if *stop.borrow() {
                break;
            }
            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(self.supervise_interval) => {
                    self.restart_dead_workers().await;
                }
            }
        }

        // Step 3: Drain, then abort stragglers.
        self.shutdown().await;
    }

    async fn start(&self) {
        let mut handles = self.handles.lock().await;
        while handles.len() < self.size {
            handles.push(self.spawn_worker());
        }
    }

    async fn restart_dead_workers(&self) {
        if *self.shutdown.borrow() {
            return;
        }

        let mut handles = self.handles.lock().await;
        for slot in handles.iter_mut() {
            if !slot.join.is_finished() {
                continue;
            }

            let dead = std::mem::replace(slot, self.spawn_worker());
            counter!("workers_restarted_total").increment(1);
            match dead.join.await {
                Err(err) if err.is_panic() => {
                    error!(worker_id = %dead.id, replacement = %slot.id, "worker_panicked")
                }
                _ => warn!(worker_id = %dead.id, replacement = %slot.id, "worker_exited"),
            }
        }
    }

    /// Signal every worker, wait for the grace period, then abort what is left.
    ///
    /// Aborted handlers leave their items reserved; the queue redelivers them
    /// once the lease runs out.
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);
        let handles = std::mem::take(&mut *self.handles.lock().await);

        let deadline = tokio::time::Instant::now() + self.shutdown_grace;
        let mut aborted = 0;
        for mut handle in handles {
            if tokio::time::timeout_at(deadline, &mut handle.join)
                .await
                .is_err()
            {
                handle.join.abort();
                aborted += 1;
            }
        }

        info!(aborted, "worker_pool_stopped");
    }

    fn spawn_worker(&self) -> WorkerHandle {
        // Step 1: Allocate a unique worker id.
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let worker_id = format!("worker-{id}");
        let worker_label = worker_id.clone();

        // Step 2: Spawn the worker loop task.
        let ctx = self.ctx.clone();
        let idle_poll = self.idle_poll;
        let shutdown = self.shutdown.subscribe();
        let join = tokio::spawn(async move {
            WorkerLoopUseCase::run(&ctx, &worker_label, idle_poll, shutdown).await;
        });

        WorkerHandle { id: worker_id, join }
    }
}

#[cfg(test)]
impl WorkerPool {
    async fn test_worker_ids(&self) -> Vec<String> {
        self.handles
            .lock()
            .await
            .iter()
            .map(|h| h.id.clone())
            .collect()
    }
}
