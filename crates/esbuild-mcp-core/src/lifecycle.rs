//! Engine lifecycle management.
//!
//! [`EngineManager`] owns the single [`EngineState`] of the process and is
//! the only code that changes it. Tool handlers obtain an engine through
//! [`EngineManager::get_engine`], which loads on demand.
//!
//! # States
//!
//! ```text
//!              load()            success
//! NotLoaded ──────────► Loading ─────────► Ready
//!                        │  ▲               │
//!                failure │  └─── load() ────┤
//!                        ▼                  │
//!                      Failed ── load() ────┘
//! ```
//!
//! # Concurrency
//!
//! Loads are single-flight. A `load` with the same options as the load in
//! progress joins it and receives the same outcome; a `load` with different
//! options waits for the running one to finish and then starts its own.
//! `get_engine` joins whatever load is running and never reloads a `Ready`
//! engine. Every transition happens under one mutex, so a snapshot never
//! mixes fields from two states.
//!
//! A load runs on its own task. Callers only wait for its outcome, so a
//! caller that gives up (timeout, disconnect) leaves the load running for
//! everyone else. Only a load task that panics ends in `Failed` without a
//! loader error.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{Instrument, error, info, info_span, warn};

use crate::bundler::Bundler;
use crate::loader::{EngineLoader, ModuleSource, parse_remote_url};
use crate::{CompiledModule, WasmEngine};
use esbuild_mcp_common::{LoadError, LoadOptions, ModuleRequest};

/// Lifecycle status of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
    NotLoaded,
    Loading,
    Ready,
    Failed,
}

/// Snapshot of the engine lifecycle.
///
/// Fields that do not apply to `status` are always `None`: `version` and
/// `loaded_at` only when `Ready`, `error` only when `Failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineState {
    pub status: EngineStatus,
    pub version: Option<String>,
    /// Options of the most recent load attempt.
    pub options: Option<LoadOptions>,
    pub error: Option<String>,
    pub loaded_at: Option<DateTime<Utc>>,
}

impl EngineState {
    /// The state before any load.
    pub fn not_loaded() -> Self {
        Self {
            status: EngineStatus::NotLoaded,
            version: None,
            options: None,
            error: None,
            loaded_at: None,
        }
    }

    fn loading(options: LoadOptions) -> Self {
        Self {
            status: EngineStatus::Loading,
            options: Some(options),
            ..Self::not_loaded()
        }
    }

    fn ready(options: LoadOptions, version: String, loaded_at: DateTime<Utc>) -> Self {
        Self {
            status: EngineStatus::Ready,
            version: Some(version),
            options: Some(options),
            error: None,
            loaded_at: Some(loaded_at),
        }
    }

    fn failed(options: LoadOptions, error: String) -> Self {
        Self {
            status: EngineStatus::Failed,
            options: Some(options),
            error: Some(error),
            ..Self::not_loaded()
        }
    }

    /// Returns `true` if the engine can serve calls.
    pub fn is_ready(&self) -> bool {
        self.status == EngineStatus::Ready
    }
}

impl Default for EngineState {
    fn default() -> Self {
        Self::not_loaded()
    }
}

/// A successful load: the state it produced and the engine handle.
#[derive(Clone)]
struct Loaded {
    state: EngineState,
    bundler: Arc<dyn Bundler>,
}

type LoadOutcome = Result<Loaded, LoadError>;

struct InFlight {
    options: LoadOptions,
    outcome: watch::Receiver<Option<LoadOutcome>>,
}

struct Inner {
    state: EngineState,
    /// Present exactly when `state.status` is `Ready`.
    bundler: Option<Arc<dyn Bundler>>,
    inflight: Option<InFlight>,
}

enum Step {
    Done(Loaded),
    Join(watch::Receiver<Option<LoadOutcome>>),
    Wait(watch::Receiver<Option<LoadOutcome>>),
    Lead(LoadOptions, watch::Sender<Option<LoadOutcome>>),
}

/// Owner of the engine lifecycle.
///
/// Create one per process and share it behind an `Arc`.
pub struct EngineManager {
    shared: Arc<Shared>,
}

/// Everything a load task needs after its caller has gone away.
struct Shared {
    engine: WasmEngine,
    loader: Arc<dyn EngineLoader>,
    inner: Mutex<Inner>,
}

impl EngineManager {
    /// Create a manager in the `NotLoaded` state.
    ///
    /// `engine` compiles local module files; it must be the engine `loader`
    /// instantiates modules with.
    pub fn new(engine: WasmEngine, loader: Arc<dyn EngineLoader>) -> Self {
        Self {
            shared: Arc::new(Shared {
                engine,
                loader,
                inner: Mutex::new(Inner {
                    state: EngineState::not_loaded(),
                    bundler: None,
                    inflight: None,
                }),
            }),
        }
    }

    /// Independent snapshot of the current state.
    pub fn get_state(&self) -> EngineState {
        self.shared.inner.lock().state.clone()
    }

    /// Load (or reload) the engine with `options`.
    ///
    /// On failure the state becomes `Failed` with the error's text and the
    /// same error is returned. Dropping the returned future does not stop
    /// the load; it still completes for everyone else.
    pub async fn load(&self, options: LoadOptions) -> Result<EngineState, LoadError> {
        self.run(Some(options)).await.map(|loaded| loaded.state)
    }

    /// Obtain a ready engine, loading it first if needed.
    ///
    /// Reuses the options of the previous attempt, or defaults if there was
    /// none.
    pub async fn get_engine(&self) -> Result<Arc<dyn Bundler>, LoadError> {
        self.run(None).await.map(|loaded| loaded.bundler)
    }

    async fn run(&self, requested: Option<LoadOptions>) -> LoadOutcome {
        loop {
            match self.next_step(requested.as_ref()) {
                Step::Done(loaded) => return Ok(loaded),
                Step::Join(rx) => {
                    if let Some(outcome) = wait_outcome(rx).await {
                        return outcome;
                    }
                }
                Step::Wait(rx) => {
                    let _ = wait_outcome(rx).await;
                }
                Step::Lead(options, tx) => {
                    let rx = tx.subscribe();
                    spawn_load(Arc::clone(&self.shared), options, tx);
                    if let Some(outcome) = wait_outcome(rx).await {
                        return outcome;
                    }
                }
            }
        }
    }

    fn next_step(&self, requested: Option<&LoadOptions>) -> Step {
        let mut inner = self.shared.inner.lock();

        if let Some(inflight) = &inner.inflight {
            return match requested {
                Some(options) if *options != inflight.options => {
                    Step::Wait(inflight.outcome.clone())
                }
                _ => Step::Join(inflight.outcome.clone()),
            };
        }

        if requested.is_none() {
            if let (EngineStatus::Ready, Some(bundler)) = (inner.state.status, &inner.bundler) {
                return Step::Done(Loaded {
                    state: inner.state.clone(),
                    bundler: Arc::clone(bundler),
                });
            }
        }

        let options = requested
            .cloned()
            .or_else(|| inner.state.options.clone())
            .unwrap_or_default();

        let (tx, rx) = watch::channel(None);
        inner.inflight = Some(InFlight {
            options: options.clone(),
            outcome: rx,
        });
        inner.state = EngineState::loading(options.clone());
        inner.bundler = None;

        Step::Lead(options, tx)
    }
}

/// Run one load on its own task and publish the outcome through `tx`.
fn spawn_load(shared: Arc<Shared>, options: LoadOptions, tx: watch::Sender<Option<LoadOutcome>>) {
    let span = info_span!("engine_load", worker = options.use_worker);
    tokio::spawn(
        async move {
            let start = Instant::now();
            let mut guard = AbortGuard {
                shared: Arc::clone(&shared),
                pending: Some((options.clone(), tx)),
            };

            let result = shared.resolve_and_initialize(&options).await;
            let outcome = shared.commit(options, result);

            match &outcome {
                Ok(loaded) => info!(
                    version = loaded.state.version.as_deref().unwrap_or_default(),
                    duration_ms = start.elapsed().as_millis(),
                    "Engine ready"
                ),
                Err(err) => error!(error = %err, "Engine load failed"),
            }

            if let Some((_, tx)) = guard.pending.take() {
                tx.send_replace(Some(outcome));
            }
        }
        .instrument(span),
    );
}

impl Shared {
    async fn resolve_and_initialize(
        &self,
        options: &LoadOptions,
    ) -> Result<Arc<dyn Bundler>, LoadError> {
        if options.is_ambiguous() {
            warn!("Both localModulePath and remoteURL given; using localModulePath");
        }

        let source = match options.module_request() {
            ModuleRequest::Local(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|e| LoadError::module_read(path.display().to_string(), &e))?;
                let engine = self.engine.inner().clone();
                let module = tokio::task::spawn_blocking(move || {
                    CompiledModule::from_bytes(&engine, &bytes)
                })
                .await
                .map_err(|e| LoadError::compilation(format!("Compilation task failed: {e}")))??;
                ModuleSource::Compiled(module)
            }
            ModuleRequest::Remote(url) => ModuleSource::Remote(parse_remote_url(url)?),
            ModuleRequest::Default => ModuleSource::Default,
        };

        info!(source = source.kind(), "Initializing engine");
        self.loader.initialize(source, options.use_worker).await
    }

    /// Record the result of a load as the current state.
    fn commit(
        &self,
        options: LoadOptions,
        result: Result<Arc<dyn Bundler>, LoadError>,
    ) -> LoadOutcome {
        let mut inner = self.inner.lock();
        inner.inflight = None;
        match result {
            Ok(bundler) => {
                inner.state = EngineState::ready(options, bundler.version().to_string(), Utc::now());
                inner.bundler = Some(Arc::clone(&bundler));
                Ok(Loaded {
                    state: inner.state.clone(),
                    bundler,
                })
            }
            Err(err) => {
                inner.state = EngineState::failed(options, err.to_string());
                inner.bundler = None;
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for EngineManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineManager")
            .field("status", &self.shared.inner.lock().state.status)
            .finish_non_exhaustive()
    }
}

/// Fails the load if its task panics or is aborted before publishing.
struct AbortGuard {
    shared: Arc<Shared>,
    pending: Option<(LoadOptions, watch::Sender<Option<LoadOutcome>>)>,
}

impl Drop for AbortGuard {
    fn drop(&mut self) {
        if let Some((options, tx)) = self.pending.take() {
            let outcome = self.shared.commit(options, Err(LoadError::Cancelled));
            warn!("Engine load task stopped before completion");
            tx.send_replace(Some(outcome));
        }
    }
}

async fn wait_outcome(mut rx: watch::Receiver<Option<LoadOutcome>>) -> Option<LoadOutcome> {
    let outcome = rx.wait_for(Option::is_some).await.ok()?;
    outcome.clone()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;
    use crate::bundler::{
        AnalyzeOptions, BuildContext, BuildResult, EngineOptions, FormatOptions,
        TransformResult,
    };
    use esbuild_mcp_common::{Diagnostic, EngineError, RuntimeConfig};

    struct FakeBundler {
        version: String,
    }

    #[async_trait]
    impl Bundler for FakeBundler {
        fn version(&self) -> &str {
            &self.version
        }

        async fn build(&self, _options: EngineOptions) -> Result<BuildResult, EngineError> {
            Ok(BuildResult::default())
        }

        async fn context(
            &self,
            _options: EngineOptions,
        ) -> Result<Box<dyn BuildContext>, EngineError> {
            Err(EngineError::message("not supported"))
        }

        async fn transform(
            &self,
            code: &str,
            _options: EngineOptions,
        ) -> Result<TransformResult, EngineError> {
            Ok(TransformResult {
                code: code.to_string(),
                ..Default::default()
            })
        }

        async fn analyze_metafile(
            &self,
            _metafile: Value,
            _options: AnalyzeOptions,
        ) -> Result<String, EngineError> {
            Ok(String::new())
        }

        async fn format_messages(
            &self,
            _messages: Vec<Diagnostic>,
            _options: FormatOptions,
        ) -> Result<Vec<String>, EngineError> {
            Ok(Vec::new())
        }
    }

    /// Loader whose outcomes are scripted per call.
    #[derive(Default)]
    struct ScriptedLoader {
        calls: AtomicUsize,
        failures: Mutex<Vec<LoadError>>,
        delay: Option<Duration>,
        panics: bool,
        seen: Mutex<Vec<(String, bool)>>,
    }

    impl ScriptedLoader {
        fn failing_once(err: impl Into<LoadError>) -> Self {
            Self {
                failures: Mutex::new(vec![err.into()]),
                ..Default::default()
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EngineLoader for ScriptedLoader {
        async fn initialize(
            &self,
            source: ModuleSource,
            use_worker: bool,
        ) -> Result<Arc<dyn Bundler>, LoadError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().push((source.kind().to_string(), use_worker));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            assert!(!self.panics, "loader crashed");
            if let Some(err) = self.failures.lock().pop() {
                return Err(err);
            }
            Ok(Arc::new(FakeBundler {
                version: format!("0.27.{n}"),
            }))
        }
    }

    fn manager(loader: Arc<ScriptedLoader>) -> EngineManager {
        let engine = WasmEngine::new(&RuntimeConfig::default()).unwrap();
        EngineManager::new(engine, loader)
    }

    fn assert_consistent(state: &EngineState) {
        match state.status {
            EngineStatus::Ready => {
                assert!(state.version.is_some());
                assert!(state.loaded_at.is_some());
                assert!(state.error.is_none());
            }
            EngineStatus::Failed => {
                assert!(state.error.is_some());
                assert!(state.version.is_none());
                assert!(state.loaded_at.is_none());
            }
            EngineStatus::NotLoaded | EngineStatus::Loading => {
                assert!(state.version.is_none());
                assert!(state.error.is_none());
                assert!(state.loaded_at.is_none());
            }
        }
    }

    #[test]
    fn test_initial_state() {
        let manager = manager(Arc::new(ScriptedLoader::default()));
        let state = manager.get_state();

        assert_eq!(state, EngineState::not_loaded());
        assert!(state.options.is_none());
        assert_consistent(&state);
    }

    #[tokio::test]
    async fn test_load_default_module() {
        let loader = Arc::new(ScriptedLoader::default());
        let manager = manager(loader.clone());

        let state = manager.load(LoadOptions::default()).await.unwrap();

        assert_eq!(state.status, EngineStatus::Ready);
        assert_eq!(state.version.as_deref(), Some("0.27.0"));
        assert!(state.error.is_none());
        assert_eq!(state.options, Some(LoadOptions::default()));
        assert_consistent(&state);
        assert_eq!(loader.seen.lock()[0], ("default".to_string(), false));
    }

    #[tokio::test]
    async fn test_snapshot_independence() {
        let manager = manager(Arc::new(ScriptedLoader::default()));
        manager.load(LoadOptions::default()).await.unwrap();

        let mut first = manager.get_state();
        let second = manager.get_state();
        assert_eq!(first, second);

        first.status = EngineStatus::NotLoaded;
        first.version = None;

        assert_eq!(manager.get_state(), second);
        assert!(manager.get_state().is_ready());
    }

    #[tokio::test]
    async fn test_failure_reported_on_both_channels() {
        let loader = Arc::new(ScriptedLoader::failing_once(LoadError::initialization(
            "WASM load failed",
        )));
        let manager = manager(loader);

        let err = manager.load(LoadOptions::default()).await.unwrap_err();
        let state = manager.get_state();

        assert_eq!(state.status, EngineStatus::Failed);
        assert_eq!(state.error.as_deref(), Some(err.to_string().as_str()));
        assert!(err.to_string().contains("WASM load failed"));
        assert_consistent(&state);
    }

    #[tokio::test]
    async fn test_raw_string_failure() {
        let manager = manager(Arc::new(ScriptedLoader::failing_once("raw string error")));

        let err = manager.load(LoadOptions::default()).await.unwrap_err();
        assert_eq!(err, LoadError::Other("raw string error".into()));

        let state = manager.get_state();
        assert_eq!(state.status, EngineStatus::Failed);
        assert!(state.error.unwrap().contains("raw string error"));
    }

    #[tokio::test]
    async fn test_missing_local_module() {
        let loader = Arc::new(ScriptedLoader::default());
        let manager = manager(loader.clone());

        let err = manager
            .load(LoadOptions::local("/missing/file"))
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        let text = err.to_string();
        assert!(text.contains("No such file") || text.contains("not found"));
        assert_eq!(manager.get_state().status, EngineStatus::Failed);
        // The loader is never reached
        assert_eq!(loader.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_local_module_bytes() {
        let path = std::env::temp_dir().join(format!("esbuild-mcp-bad-{}.wasm", std::process::id()));
        std::fs::write(&path, b"definitely not wasm").unwrap();

        let manager = manager(Arc::new(ScriptedLoader::default()));
        let err = manager.load(LoadOptions::local(&path)).await.unwrap_err();
        let _ = std::fs::remove_file(&path);

        assert!(matches!(err, LoadError::Compilation { .. }));
        assert_eq!(manager.get_state().status, EngineStatus::Failed);
    }

    #[tokio::test]
    async fn test_invalid_remote_url() {
        let manager = manager(Arc::new(ScriptedLoader::default()));

        let err = manager
            .load(LoadOptions::remote("ftp://example.com/esbuild.wasm"))
            .await
            .unwrap_err();

        assert!(matches!(err, LoadError::InvalidUrl { .. }));
        assert_eq!(manager.get_state().error, Some(err.to_string()));
    }

    #[tokio::test]
    async fn test_remote_url_and_worker_reach_loader() {
        let loader = Arc::new(ScriptedLoader::default());
        let manager = manager(loader.clone());

        let options = LoadOptions::remote("https://example.com/esbuild.wasm").with_worker(true);
        let state = manager.load(options.clone()).await.unwrap();

        assert_eq!(state.options, Some(options));
        assert_eq!(loader.seen.lock()[0], ("remote".to_string(), true));
    }

    #[tokio::test]
    async fn test_reload_while_ready() {
        let loader = Arc::new(ScriptedLoader::default());
        let manager = manager(loader.clone());

        manager.load(LoadOptions::default()).await.unwrap();
        let state = manager
            .load(LoadOptions::default().with_worker(true))
            .await
            .unwrap();

        assert_eq!(loader.calls(), 2);
        assert_eq!(state.version.as_deref(), Some("0.27.1"));
        assert!(state.options.unwrap().use_worker);
    }

    #[tokio::test]
    async fn test_recover_after_failure() {
        let manager = manager(Arc::new(ScriptedLoader::failing_once("first fail")));

        assert!(manager.load(LoadOptions::default()).await.is_err());
        let state = manager.load(LoadOptions::default()).await.unwrap();

        assert_eq!(state.status, EngineStatus::Ready);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_get_engine_auto_loads() {
        let loader = Arc::new(ScriptedLoader::default());
        let manager = manager(loader.clone());

        let engine = manager.get_engine().await.unwrap();
        assert_eq!(engine.version(), "0.27.0");
        assert!(manager.get_state().is_ready());

        // Ready engines are reused, not reloaded
        let again = manager.get_engine().await.unwrap();
        assert_eq!(again.version(), "0.27.0");
        assert_eq!(loader.calls(), 1);
    }

    #[tokio::test]
    async fn test_get_engine_reuses_previous_options() {
        let loader = Arc::new(ScriptedLoader::failing_once("first fail"));
        let manager = manager(loader.clone());

        let options = LoadOptions::remote("https://example.com/esbuild.wasm");
        assert!(manager.load(options.clone()).await.is_err());

        manager.get_engine().await.unwrap();

        assert_eq!(manager.get_state().options, Some(options));
        assert_eq!(loader.seen.lock()[1].0, "remote");
    }

    #[tokio::test]
    async fn test_get_engine_propagates_failure() {
        let manager = manager(Arc::new(ScriptedLoader::failing_once("boom")));

        let err = manager.get_engine().await.err().unwrap();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(manager.get_state().error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_concurrent_get_engine_is_single_flight() {
        let loader = Arc::new(ScriptedLoader::slow(Duration::from_millis(50)));
        let manager = Arc::new(manager(loader.clone()));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let manager = Arc::clone(&manager);
                tokio::spawn(async move { manager.get_engine().await.map(|b| b.version().to_string()) })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), "0.27.0");
        }
        assert_eq!(loader.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_identical_loads_share_outcome() {
        let loader = Arc::new(ScriptedLoader::slow(Duration::from_millis(50)));
        let manager = Arc::new(manager(loader.clone()));

        let a = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.load(LoadOptions::default()).await })
        };
        let b = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.load(LoadOptions::default()).await })
        };

        let (a, b) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());
        assert_eq!(a, b);
        assert_eq!(loader.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_different_loads_are_serialized() {
        let loader = Arc::new(ScriptedLoader::slow(Duration::from_millis(30)));
        let manager = Arc::new(manager(loader.clone()));

        let first = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.load(LoadOptions::default()).await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(manager.get_state().status, EngineStatus::Loading);
        assert_consistent(&manager.get_state());

        let second = manager
            .load(LoadOptions::default().with_worker(true))
            .await
            .unwrap();
        let first = first.await.unwrap().unwrap();

        assert_eq!(loader.calls(), 2);
        assert!(!first.options.unwrap().use_worker);
        assert!(second.options.clone().unwrap().use_worker);
        assert_eq!(manager.get_state(), second);
    }

    #[tokio::test]
    async fn test_dropped_caller_does_not_abort_load() {
        let loader = Arc::new(ScriptedLoader::slow(Duration::from_millis(100)));
        let manager = Arc::new(manager(loader.clone()));

        let joiner = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                manager.get_engine().await.map(|b| b.version().to_string())
            })
        };

        let dropped = tokio::time::timeout(Duration::from_millis(20), manager.get_engine()).await;
        assert!(dropped.is_err());
        assert_eq!(manager.get_state().status, EngineStatus::Loading);

        assert_eq!(joiner.await.unwrap().unwrap(), "0.27.0");
        let state = manager.get_state();
        assert_eq!(state.status, EngineStatus::Ready);
        assert_consistent(&state);
        assert_eq!(loader.calls(), 1);
    }

    #[tokio::test]
    async fn test_load_completes_without_waiters() {
        let loader = Arc::new(ScriptedLoader::slow(Duration::from_millis(30)));
        let manager = manager(loader.clone());

        let dropped =
            tokio::time::timeout(Duration::from_millis(5), manager.load(LoadOptions::default()))
                .await;
        assert!(dropped.is_err());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(manager.get_state().is_ready());

        manager.get_engine().await.unwrap();
        assert_eq!(loader.calls(), 1);
    }

    #[tokio::test]
    async fn test_panicking_loader_marks_failed() {
        let loader = Arc::new(ScriptedLoader {
            panics: true,
            ..Default::default()
        });
        let manager = manager(loader);

        let err = manager.load(LoadOptions::default()).await.unwrap_err();
        assert_eq!(err, LoadError::Cancelled);

        let state = manager.get_state();
        assert_eq!(state.status, EngineStatus::Failed);
        assert_eq!(state.error.as_deref(), Some("engine load was cancelled"));
        assert_consistent(&state);
    }

    #[test]
    fn test_state_wire_shape() {
        let value = serde_json::to_value(EngineState::not_loaded()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "status": "not_loaded",
                "version": null,
                "options": null,
                "error": null,
                "loadedAt": null
            })
        );

        let failed = EngineState::failed(LoadOptions::default(), "boom".into());
        let value = serde_json::to_value(failed).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["options"], serde_json::json!({"useWorker": false}));
    }
}
