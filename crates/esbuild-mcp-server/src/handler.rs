//! HTTP handlers.
//!
//! `POST /mcp` carries JSON-RPC messages; the remaining routes are health checks.

use std::time::Instant;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use tracing::{Instrument, debug, info_span, warn};
use uuid::Uuid;

use crate::rpc::{PARSE_ERROR, RpcResponse, handle_message};
use crate::state::AppState;

/// Handle one JSON-RPC message or batch.
///
/// Responds with `202 Accepted` and no body when the message only contained
/// notifications.
pub async fn handle_mcp(State(state): State<AppState>, body: Bytes) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let span = info_span!("mcp_request", request_id = %request_id);

    async move {
        let start = Instant::now();

        let message: Value = match serde_json::from_slice(&body) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Malformed JSON-RPC body");
                let response =
                    RpcResponse::error(Value::Null, PARSE_ERROR, format!("Parse error: {e}"));
                return Json(response).into_response();
            }
        };

        let response = handle_message(&state, message).await;
        debug!(duration_ms = start.elapsed().as_millis(), "Message handled");

        match response {
            Some(body) => Json(body).into_response(),
            None => StatusCode::ACCEPTED.into_response(),
        }
    }
    .instrument(span)
    .await
}

/// Health check handler.
///
/// Returns 200 OK if the server is running.
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Readiness check handler.
///
/// The server can take requests whether or not the engine is loaded yet, so
/// this always answers 200 and reports the engine status alongside.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let engine = state.manager().get_state();

    let body = json!({
        "status": "ready",
        "engine": engine.status,
        "version": engine.version,
    });

    (StatusCode::OK, Json(body))
}
