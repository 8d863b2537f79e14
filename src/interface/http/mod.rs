pub mod routes;
pub mod state;

use axum::Router;
use state::AppState;

/// Operational endpoints served next to the worker pool.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::ready::router())
        .merge(routes::metrics::router())
        .with_state(state)
}

/// Serve `app` until `shutdown` flips to true.
pub async fn serve(
    state: AppState,
    bind_addr: &str,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(addr = %bind_addr, "http_listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(async move {
            while !*shutdown.borrow() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
}
