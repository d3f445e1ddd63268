//! API Routes
//!
//! Configures the Axum router with the proxy surface and control endpoints.

use axum::{
    routing::{any, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    control_handler, enqueue_action_handler, health_handler, proxy_handler, stats_handler,
    sync_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `ANY /proxy`, `/proxy/` and `/proxy/*path` - Intercepted request to the upstream origin
/// - `POST /control` - Control channel message
/// - `GET /stats` - Stats snapshot
/// - `POST /sync/:tag` - Register a background sync
/// - `POST /actions` - Queue a user action for replay
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/proxy", any(proxy_handler))
        .route("/proxy/", any(proxy_handler))
        .route("/proxy/*path", any(proxy_handler))
        .route("/control", post(control_handler))
        .route("/stats", get(stats_handler))
        .route("/sync/:tag", post(sync_handler))
        .route("/actions", post(enqueue_action_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::network::mock::MockFetcher;
    use crate::sync::MemoryActionQueue;
    use crate::worker::{CacheWorker, WorkerEvents};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use std::sync::Arc;
    use tower::util::ServiceExt;

    async fn create_test_app(fetcher: Arc<MockFetcher>) -> Router {
        fetcher.respond("https://app.test/", 200, "<html>");
        let config = Config {
            upstream_url: "https://app.test".to_string(),
            static_manifest: vec!["/".to_string()],
            critical_endpoints: vec![],
            ..Config::default()
        };
        let worker =
            CacheWorker::new(&config, fetcher, Arc::new(MemoryActionQueue::new())).unwrap();
        worker.on_install().await.unwrap();
        worker.on_activate().await.unwrap();
        create_router(AppState::new(worker))
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_test_app(MockFetcher::new()).await;

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("\"lifecycle\":\"active\""));
    }

    #[tokio::test]
    async fn test_proxy_root_served_from_cache() {
        let app = create_test_app(MockFetcher::new()).await;

        let response = app
            .oneshot(Request::builder().uri("/proxy").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-cache-source"], "cache");
        assert_eq!(body_string(response).await, "<html>");
    }

    #[tokio::test]
    async fn test_proxy_root_with_trailing_slash() {
        let app = create_test_app(MockFetcher::new()).await;

        let response = app
            .oneshot(Request::builder().uri("/proxy/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-cache-source"], "cache");
        assert_eq!(body_string(response).await, "<html>");
    }

    #[tokio::test]
    async fn test_proxy_forwards_path_and_query() {
        let fetcher = MockFetcher::new();
        fetcher.respond("https://app.test/api/items?page=2", 200, "[]");
        let app = create_test_app(fetcher.clone()).await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/proxy/api/items?page=2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-cache-source"], "network");
        assert_eq!(fetcher.calls_to("https://app.test/api/items?page=2"), 1);
    }

    #[tokio::test]
    async fn test_proxy_offline_miss_is_bad_gateway() {
        let app = create_test_app(MockFetcher::new()).await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/proxy/api/unknown")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_control_unknown_is_no_content() {
        let app = create_test_app(MockFetcher::new()).await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/control")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"type":"SKIP_WAITING"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_sync_endpoint_accepts_known_tag() {
        let app = create_test_app(MockFetcher::new()).await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/sync/user-action-sync")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_sync_endpoint_rejects_unknown_tag() {
        let app = create_test_app(MockFetcher::new()).await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/sync/nightly")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
