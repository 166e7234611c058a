//! Tool response contract and error translation.
//!
//! Every tool returns a [`ToolResponse`]: one text content block, flagged with
//! `isError` on failure. Handlers never build error bodies themselves; they
//! hand whatever failed to [`to_error_response`].

use serde::Serialize;
use serde_json::Value;

use esbuild_mcp_common::{DiagnosticSet, EngineError, LoadError, PatternError, ToolError};

/// A text content block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextContent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

/// Result of a tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub content: Vec<TextContent>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolResponse {
    /// A successful response carrying `text` as-is.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![TextContent {
                kind: "text",
                text: text.into(),
            }],
            is_error: false,
        }
    }

    /// A successful response carrying `payload` as pretty-printed JSON.
    pub fn success_json<T: Serialize + ?Sized>(payload: &T) -> Self {
        match serde_json::to_string_pretty(payload) {
            Ok(text) => Self::text(text),
            Err(e) => to_error_response(format!("Failed to serialize result: {e}")),
        }
    }

    /// The text of the first content block.
    pub fn first_text(&self) -> &str {
        self.content.first().map_or("", |c| c.text.as_str())
    }
}

/// Anything a tool can fail with, reduced to what the response needs.
///
/// A diagnostic collection is only recognized when it arrives as a
/// [`DiagnosticSet`]; an arbitrary JSON object that happens to have
/// `errors`/`warnings` fields is rendered as plain JSON text.
#[derive(Debug, Clone, PartialEq)]
pub enum Failure {
    /// Structured engine diagnostics, serialized verbatim.
    Diagnostics(DiagnosticSet),
    /// A single message.
    Message(String),
}

impl From<DiagnosticSet> for Failure {
    fn from(set: DiagnosticSet) -> Self {
        Self::Diagnostics(set)
    }
}

impl From<EngineError> for Failure {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Diagnostics(set) => Self::Diagnostics(set),
            EngineError::Message { message } => Self::Message(message),
        }
    }
}

impl From<ToolError> for Failure {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::Engine(engine) => engine.into(),
            other => Self::Message(other.to_string()),
        }
    }
}

impl From<LoadError> for Failure {
    fn from(err: LoadError) -> Self {
        Self::Message(err.to_string())
    }
}

impl From<PatternError> for Failure {
    fn from(err: PatternError) -> Self {
        Self::Message(err.to_string())
    }
}

impl From<String> for Failure {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}

impl From<&str> for Failure {
    fn from(message: &str) -> Self {
        Self::Message(message.to_string())
    }
}

impl From<Value> for Failure {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Message(text),
            Value::Null => Self::Message("null".into()),
            Value::Object(_) | Value::Array(_) => Self::Message(
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()),
            ),
            other => Self::Message(other.to_string()),
        }
    }
}

impl<T: Into<Failure>> From<Option<T>> for Failure {
    fn from(value: Option<T>) -> Self {
        value.map_or_else(|| Self::Message("undefined".into()), Into::into)
    }
}

/// Convert any failure into the uniform error response.
///
/// Never fails and never produces an empty text.
pub fn to_error_response(failure: impl Into<Failure>) -> ToolResponse {
    let text = match failure.into() {
        Failure::Diagnostics(set) => serde_json::to_string_pretty(&set)
            .unwrap_or_else(|_| set.to_string()),
        Failure::Message(message) if message.is_empty() => "Unknown error".to_string(),
        Failure::Message(message) => message,
    };

    ToolResponse {
        is_error: true,
        ..ToolResponse::text(text)
    }
}
