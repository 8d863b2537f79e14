use crate::application::context::AppContext;
use crate::application::usecases::worker_pool::WorkerPool;
use crate::config::Settings;
use crate::infrastructure::cache::CacheError;
use crate::infrastructure::cache::redis_cache::RedisCache;
use crate::infrastructure::cluster::directory::ClusterDirectory;
use crate::infrastructure::db::database::DatabaseError;
use crate::infrastructure::db::postgres::PostgresDatabase;
use crate::infrastructure::db::repositories::Repositories;
use crate::infrastructure::notify::relay::HttpRelayNotifier;
use crate::infrastructure::notify::{Mailer, NotifyError};
use crate::interface::cli::supervisor::{SupervisorError, wait_for_shutdown_signal};
use crate::interface::http;
use crate::interface::http::state::AppState;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Notify(#[from] NotifyError),

    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
}

/// Wire the collaborators together and run the pool until a shutdown signal.
pub async fn run(settings: Settings, workers: usize) -> Result<(), StartupError> {
    // Step 1: Install the metrics recorder.
    let metrics = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(err) => {
            warn!(error = %err, "metrics_recorder_unavailable");
            None
        }
    };

    // Step 2: Connect the stores.
    let db = Arc::new(PostgresDatabase::connect(&settings.db.url, settings.db.max_connections).await?);
    let cache = Arc::new(RedisCache::connect(&settings.redis.url).await?);
    let repos = Repositories::postgres(db);

    // Step 3: Build cluster access and notifications.
    let clusters = Arc::new(ClusterDirectory::new(
        repos.cluster.clone(),
        Duration::from_millis(settings.cluster.request_timeout_ms),
        settings.cluster.verify_tls,
    ));
    let notifications = &settings.notifications;
    let notifier = Arc::new(HttpRelayNotifier::new(
        notifications.relay_url.clone(),
        notifications.from.clone(),
        Duration::from_millis(notifications.request_timeout_ms),
    )?);
    let mailer = Arc::new(Mailer::new(
        notifier,
        notifications.subject_prefix.clone(),
        notifications.admins.clone(),
        notifications.managers.clone(),
    ));

    // Step 4: Assemble the shared context.
    let ctx = Arc::new(AppContext::new(
        repos,
        cache,
        clusters,
        mailer,
        settings.clone(),
    ));

    // Step 5: Turn signals into a shutdown broadcast.
    let (stop_tx, stop_rx) = watch::channel(false);
    let signals = tokio::spawn(async move {
        let result = wait_for_shutdown_signal().await;
        let _ = stop_tx.send(true);
        result
    });

    // Step 6: Serve operational endpoints if enabled.
    let server = settings.server.enabled.then(|| {
        let state = AppState {
            ctx: ctx.clone(),
            metrics,
        };
        let bind_addr = format!("{}:{}", settings.server.host, settings.server.port);
        let shutdown = stop_rx.clone();
        tokio::spawn(async move {
            if let Err(err) = http::serve(state, &bind_addr, shutdown).await {
                error!(error = %err, "http_server_failed");
            }
        })
    });

    // Step 7: Run the workers until shutdown.
    let pool = Arc::new(WorkerPool::new(ctx, workers));
    pool.run(stop_rx).await;

    if let Some(server) = server {
        let _ = server.await;
    }
    if signals.is_finished() {
        if let Ok(result) = signals.await {
            result?;
        }
    }

    info!("watcher_stopped");
    Ok(())
}
