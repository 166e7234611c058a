//! HTTP router configuration.
//!
//! This module provides functions to build the Axum router with all
//! necessary routes and middleware.

use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handler::{handle_mcp, health_check, readiness_check};
use crate::state::AppState;

/// Build the main application router.
///
/// Routes:
/// - `POST /mcp` - JSON-RPC endpoint
/// - `GET /health` - Health check
/// - `GET /ready` - Readiness check with engine status
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let rpc_routes = Router::new().route("/mcp", post(handle_mcp));

    let health_routes = Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check));

    Router::new()
        .merge(rpc_routes)
        .merge(health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use esbuild_mcp_common::RuntimeConfig;
    use serde_json::{Value, json};
    use tower::util::ServiceExt;

    fn setup_router() -> Router {
        let config = RuntimeConfig::default();
        let state = AppState::new(&config).unwrap();
        build_router(state, Duration::from_secs(30))
    }

    fn post_json(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/mcp")
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = setup_router();

        let response = app
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

    #[tokio::test]
    async fn test_readiness_check() {
        let app = setup_router();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/ready")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["engine"], "not_loaded");
    }

    #[tokio::test]
    async fn test_ping() {
        let app = setup_router();

        let request = json!({"jsonrpc": "2.0", "id": 1, "method": "ping"});
        let response = app.oneshot(post_json(request.to_string())).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["id"], 1);
        assert_eq!(body["result"], json!({}));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let app = setup_router();

        let response = app.oneshot(post_json("{not json")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], crate::rpc::PARSE_ERROR);
        assert!(body["id"].is_null());
    }

    #[tokio::test]
    async fn test_notification_accepted() {
        let app = setup_router();

        let request = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
        let response = app.oneshot(post_json(request.to_string())).await.unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = setup_router();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/functions/nonexistent")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
