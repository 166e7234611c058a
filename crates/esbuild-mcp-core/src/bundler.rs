//! The engine's callable surface.
//!
//! [`Bundler`] is what tool handlers receive from the lazy accessor. The
//! production implementation, [`WasmBundler`], forwards every call into a
//! [`GuestSession`]; tests substitute in-memory implementations.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, warn};

use crate::instance::GuestSession;
use esbuild_mcp_common::{Diagnostic, EngineError};

/// Option object handed to the engine.
pub type EngineOptions = Map<String, Value>;

/// A file produced by a build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputFile {
    pub path: String,
    pub text: String,
}

/// Result of `build` or `rebuild`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildResult {
    #[serde(default)]
    pub output_files: Vec<OutputFile>,
    #[serde(default)]
    pub errors: Vec<Diagnostic>,
    #[serde(default)]
    pub warnings: Vec<Diagnostic>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metafile: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mangle_cache: Option<Map<String, Value>>,
}

/// Result of `transform`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformResult {
    pub code: String,
    /// Source map text; empty when no map was requested.
    #[serde(default)]
    pub map: String,
    #[serde(default)]
    pub warnings: Vec<Diagnostic>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mangle_cache: Option<Map<String, Value>>,
}

/// Options for `analyze_metafile`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,
}

/// Severity of messages passed to `format_messages`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Error,
    Warning,
}

/// Options for `format_messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatOptions {
    pub kind: MessageKind,
    #[serde(default)]
    pub color: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_width: Option<u32>,
}

/// A loaded engine.
#[async_trait]
pub trait Bundler: Send + Sync {
    /// Build identifier of the loaded engine.
    fn version(&self) -> &str;

    /// Bundle the entry points named in `options`.
    async fn build(&self, options: EngineOptions) -> Result<BuildResult, EngineError>;

    /// Create an incremental build context.
    async fn context(&self, options: EngineOptions)
    -> Result<Box<dyn BuildContext>, EngineError>;

    /// Transform a single source text.
    async fn transform(
        &self,
        code: &str,
        options: EngineOptions,
    ) -> Result<TransformResult, EngineError>;

    /// Render a human-readable size report for a metafile.
    async fn analyze_metafile(
        &self,
        metafile: Value,
        options: AnalyzeOptions,
    ) -> Result<String, EngineError>;

    /// Render diagnostics the way the engine prints them.
    async fn format_messages(
        &self,
        messages: Vec<Diagnostic>,
        options: FormatOptions,
    ) -> Result<Vec<String>, EngineError>;
}

/// An incremental build context.
#[async_trait]
pub trait BuildContext: Send {
    /// Run the build again with the context's options.
    async fn rebuild(&mut self) -> Result<BuildResult, EngineError>;

    /// Release the context inside the engine.
    async fn dispose(self: Box<Self>) -> Result<(), EngineError>;
}

/// One queued call for a worker-hosted engine.
struct Call {
    op: &'static str,
    payload: Value,
    reply: oneshot::Sender<Result<Value, EngineError>>,
}

#[derive(Clone)]
enum Dispatch {
    /// Calls run on the caller's task.
    Inline(Arc<Mutex<GuestSession>>),
    /// Calls are sent to a dedicated task that owns the session.
    Worker(mpsc::Sender<Call>),
}

/// [`Bundler`] backed by a running WebAssembly engine instance.
#[derive(Clone)]
pub struct WasmBundler {
    version: Arc<str>,
    dispatch: Dispatch,
}

impl WasmBundler {
    /// Queue depth of a worker-hosted engine.
    const WORKER_QUEUE: usize = 64;

    /// Wrap a started session.
    ///
    /// With `use_worker`, the session moves to a dedicated task and calls are
    /// delivered over a channel; otherwise calls lock the session directly.
    pub fn new(session: GuestSession, use_worker: bool) -> Self {
        let version: Arc<str> = Arc::from(session.version());

        let dispatch = if use_worker {
            let (tx, rx) = mpsc::channel(Self::WORKER_QUEUE);
            tokio::spawn(run_worker(session, rx));
            Dispatch::Worker(tx)
        } else {
            Dispatch::Inline(Arc::new(Mutex::new(session)))
        };

        Self { version, dispatch }
    }

    /// Returns `true` if calls are served by a worker task.
    pub fn is_worker(&self) -> bool {
        matches!(self.dispatch, Dispatch::Worker(_))
    }

    async fn invoke(&self, op: &'static str, payload: Value) -> Result<Value, EngineError> {
        match &self.dispatch {
            Dispatch::Inline(session) => session.lock().await.call(op, payload).await,
            Dispatch::Worker(tx) => {
                let (reply, rx) = oneshot::channel();
                tx.send(Call { op, payload, reply })
                    .await
                    .map_err(|_| EngineError::message("Engine worker has stopped"))?;
                rx.await
                    .map_err(|_| EngineError::message("Engine worker dropped the call"))?
            }
        }
    }

    async fn invoke_as<T: DeserializeOwned>(
        &self,
        op: &'static str,
        payload: Value,
    ) -> Result<T, EngineError> {
        let value = self.invoke(op, payload).await?;
        serde_json::from_value(value)
            .map_err(|e| EngineError::message(format!("Unexpected '{op}' result: {e}")))
    }
}

async fn run_worker(mut session: GuestSession, mut rx: mpsc::Receiver<Call>) {
    debug!(session_id = %session.session_id(), "Engine worker started");

    while let Some(call) = rx.recv().await {
        let result = session.call(call.op, call.payload).await;
        if call.reply.send(result).is_err() {
            warn!(op = call.op, "Engine call abandoned by its caller");
        }
    }

    debug!(session_id = %session.session_id(), "Engine worker stopped");
}

#[async_trait]
impl Bundler for WasmBundler {
    fn version(&self) -> &str {
        &self.version
    }

    async fn build(&self, options: EngineOptions) -> Result<BuildResult, EngineError> {
        self.invoke_as("build", Value::Object(options)).await
    }

    async fn context(
        &self,
        options: EngineOptions,
    ) -> Result<Box<dyn BuildContext>, EngineError> {
        #[derive(Deserialize)]
        struct Created {
            id: u64,
        }

        let created: Created = self.invoke_as("context", Value::Object(options)).await?;
        Ok(Box::new(WasmContext {
            bundler: self.clone(),
            id: created.id,
        }))
    }

    async fn transform(
        &self,
        code: &str,
        options: EngineOptions,
    ) -> Result<TransformResult, EngineError> {
        self.invoke_as("transform", json!({ "code": code, "options": options }))
            .await
    }

    async fn analyze_metafile(
        &self,
        metafile: Value,
        options: AnalyzeOptions,
    ) -> Result<String, EngineError> {
        self.invoke_as(
            "analyzeMetafile",
            json!({ "metafile": metafile, "options": options }),
        )
        .await
    }

    async fn format_messages(
        &self,
        messages: Vec<Diagnostic>,
        options: FormatOptions,
    ) -> Result<Vec<String>, EngineError> {
        self.invoke_as(
            "formatMessages",
            json!({ "messages": messages, "options": options }),
        )
        .await
    }
}

impl std::fmt::Debug for WasmBundler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmBundler")
            .field("version", &self.version)
            .field("worker", &self.is_worker())
            .finish()
    }
}

/// Incremental context living inside a [`WasmBundler`] engine.
struct WasmContext {
    bundler: WasmBundler,
    id: u64,
}

#[async_trait]
impl BuildContext for WasmContext {
    async fn rebuild(&mut self) -> Result<BuildResult, EngineError> {
        self.bundler
            .invoke_as("rebuild", json!({ "id": self.id }))
            .await
    }

    async fn dispose(self: Box<Self>) -> Result<(), EngineError> {
        self.bundler
            .invoke("dispose", json!({ "id": self.id }))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_result_from_engine_json() {
        let json = r#"{
            "outputFiles": [{"path": "out.js", "text": "console.log('test')"}],
            "errors": [],
            "warnings": [{"text": "unused", "location": null}],
            "mangleCache": {"a": "b"}
        }"#;
        let result: BuildResult = serde_json::from_str(json).unwrap();

        assert_eq!(result.output_files[0].path, "out.js");
        assert_eq!(result.warnings.len(), 1);
        assert!(result.metafile.is_none());
        assert_eq!(result.mangle_cache.unwrap()["a"], "b");
    }

    #[test]
    fn test_transform_result_defaults() {
        let result: TransformResult = serde_json::from_str(r#"{"code": "x;\n"}"#).unwrap();
        assert_eq!(result.code, "x;\n");
        assert!(result.map.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_format_options_wire() {
        let opts = FormatOptions {
            kind: MessageKind::Warning,
            color: false,
            terminal_width: None,
        };
        assert_eq!(
            serde_json::to_value(&opts).unwrap(),
            json!({"kind": "warning", "color": false})
        );
    }

    #[test]
    fn test_analyze_options_wire() {
        assert_eq!(
            serde_json::to_value(AnalyzeOptions::default()).unwrap(),
            json!({})
        );
        assert_eq!(
            serde_json::to_value(AnalyzeOptions {
                verbose: Some(true)
            })
            .unwrap(),
            json!({"verbose": true})
        );
    }
}
