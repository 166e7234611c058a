//! JSON-RPC 2.0 message handling.
//!
//! Supported methods:
//! - `initialize`: Handshake, returns server info and capabilities
//! - `ping`: Liveness check
//! - `tools/list`: Tool declarations
//! - `tools/call`: Run a tool
//!
//! Requests without an `id` are notifications and never get a response.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, instrument};

use crate::schema::tool_definitions;
use crate::state::AppState;
use crate::tools::call_tool;

/// Protocol revision announced during the handshake.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;

/// An incoming request or notification.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl RpcRequest {
    /// Returns `true` if no response is expected.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Error object of a failed request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// Response to a request.
#[derive(Debug, Clone, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Map<String, Value>>,
}

/// Handle one decoded message.
///
/// Returns `None` for notifications.
#[instrument(skip(state, request), fields(method = %request.method))]
pub async fn dispatch(state: &AppState, request: RpcRequest) -> Option<RpcResponse> {
    if request.is_notification() {
        debug!("Notification received");
        return None;
    }

    let id = request.id.clone().unwrap_or(Value::Null);
    if request.jsonrpc != "2.0" {
        return Some(RpcResponse::error(
            id,
            INVALID_REQUEST,
            "Unsupported JSON-RPC version",
        ));
    }

    let response = match request.method.as_str() {
        "initialize" => RpcResponse::success(id, server_info()),
        "ping" => RpcResponse::success(id, json!({})),
        "tools/list" => RpcResponse::success(id, json!({ "tools": tool_definitions() })),
        "tools/call" => call(state, id, request.params).await,
        other => RpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {other}")),
    };

    Some(response)
}

/// Handle a raw message, single or batch.
///
/// Returns `None` when nothing needs to be sent back.
pub async fn handle_message(state: &AppState, message: Value) -> Option<Value> {
    match message {
        Value::Array(batch) if batch.is_empty() => Some(to_value(RpcResponse::error(
            Value::Null,
            INVALID_REQUEST,
            "Empty batch",
        ))),
        Value::Array(batch) => {
            let mut responses = Vec::new();
            for message in batch {
                if let Some(response) = handle_single(state, message).await {
                    responses.push(to_value(response));
                }
            }
            (!responses.is_empty()).then_some(Value::Array(responses))
        }
        single => handle_single(state, single).await.map(to_value),
    }
}

async fn handle_single(state: &AppState, message: Value) -> Option<RpcResponse> {
    let id = message.get("id").cloned().unwrap_or(Value::Null);
    match serde_json::from_value::<RpcRequest>(message) {
        Ok(request) => dispatch(state, request).await,
        Err(e) => Some(RpcResponse::error(
            id,
            INVALID_REQUEST,
            format!("Invalid request: {e}"),
        )),
    }
}

async fn call(state: &AppState, id: Value, params: Value) -> RpcResponse {
    let params: CallParams = match serde_json::from_value(params) {
        Ok(params) => params,
        Err(e) => return RpcResponse::error(id, INVALID_PARAMS, format!("Invalid params: {e}")),
    };

    let args = params.arguments.unwrap_or_default();
    match call_tool(state.manager(), &params.name, args).await {
        Some(response) => RpcResponse::success(id, to_value(response)),
        None => RpcResponse::error(
            id,
            INVALID_PARAMS,
            format!("Unknown tool: {}", params.name),
        ),
    }
}

fn server_info() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": { "listChanged": false }
        },
        "serverInfo": {
            "name": "esbuild-mcp",
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

fn to_value<T: Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
