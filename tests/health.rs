use axum::body::Body;
use axum::http::{Request, StatusCode};
use portal_watcher::interface::http;
use tower::util::ServiceExt;

#[tokio::test]
async fn health_endpoint_works_without_backends() {
    let response = http::routes::health::router::<()>()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
