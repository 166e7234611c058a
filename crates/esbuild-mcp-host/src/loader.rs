//! The production [`EngineLoader`].
//!
//! [`WasmLoader`] turns a [`ModuleSource`] into a running engine:
//!
//! 1. Resolve the module (already compiled, fetched, or the configured default)
//! 2. Create a store with the configured limits
//! 3. Instantiate against the host linker and run the engine's initialization
//! 4. Wrap the session in a [`WasmBundler`], inline or on a worker task

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument};
use uuid::Uuid;
use wasmtime::Linker;

use esbuild_mcp_common::{LoadError, RuntimeConfig};
use esbuild_mcp_core::{
    Bundler, CompiledModule, EngineContext, EngineLoader, EngineManager, GuestSession,
    ModuleSource, WasmBundler, WasmEngine, create_store,
};

use crate::fetch::ModuleFetcher;
use crate::linker::create_linker;

/// Loads engine modules into wasmtime instances.
pub struct WasmLoader {
    engine: WasmEngine,
    linker: Linker<EngineContext>,
    fetcher: ModuleFetcher,
}

impl WasmLoader {
    /// Create a loader for `engine` with the default HTTP client.
    pub fn new(engine: WasmEngine) -> Result<Self, LoadError> {
        Self::with_fetcher(engine, ModuleFetcher::new()?)
    }

    /// Create a loader that downloads remote modules with `fetcher`.
    pub fn with_fetcher(engine: WasmEngine, fetcher: ModuleFetcher) -> Result<Self, LoadError> {
        let linker = create_linker(&engine)?;
        Ok(Self {
            engine,
            linker,
            fetcher,
        })
    }

    async fn resolve(&self, source: ModuleSource) -> Result<CompiledModule, LoadError> {
        match source {
            ModuleSource::Compiled(module) => Ok(module),
            ModuleSource::Remote(url) => {
                let bytes = self.fetcher.fetch(&url).await?;
                self.compile(bytes).await
            }
            ModuleSource::Default => {
                let path = &self.engine.config().engine.default_module_path;
                let bytes = read_module(path).await?;
                self.compile(bytes).await
            }
        }
    }

    async fn compile(&self, bytes: Vec<u8>) -> Result<CompiledModule, LoadError> {
        let engine = self.engine.inner().clone();
        tokio::task::spawn_blocking(move || CompiledModule::from_bytes(&engine, &bytes))
            .await
            .map_err(|e| LoadError::compilation(format!("Compilation task failed: {e}")))?
    }
}

#[async_trait]
impl EngineLoader for WasmLoader {
    #[instrument(skip(self, source), fields(source = source.kind()))]
    async fn initialize(
        &self,
        source: ModuleSource,
        use_worker: bool,
    ) -> Result<Arc<dyn Bundler>, LoadError> {
        let module = self.resolve(source).await?;
        let missing = module.missing_exports();
        if !missing.is_empty() {
            return Err(LoadError::initialization(format!(
                "Engine module is missing required exports: {}",
                missing.join(", ")
            )));
        }

        let session_id = Uuid::new_v4().to_string();
        let store = create_store(&self.engine, session_id.clone())?;
        let max_fuel = self
            .engine
            .is_fuel_enabled()
            .then_some(self.engine.config().execution.max_fuel);

        let session = GuestSession::start(&self.linker, &module, store, max_fuel).await?;
        info!(
            session_id = %session_id,
            version = session.version(),
            content_hash = module.content_hash(),
            size_bytes = module.size_bytes(),
            wasi = module.imports_wasi(),
            "Engine session started"
        );

        Ok(Arc::new(WasmBundler::new(session, use_worker)))
    }
}

impl std::fmt::Debug for WasmLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmLoader")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

async fn read_module(path: &Path) -> Result<Vec<u8>, LoadError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| LoadError::module_read(path.display().to_string(), &e))
}

/// Build an [`EngineManager`] backed by a [`WasmLoader`] for `config`.
pub fn engine_manager(config: &RuntimeConfig) -> Result<EngineManager, LoadError> {
    let engine = WasmEngine::new(config)?;
    let loader = WasmLoader::new(engine.clone())?;
    Ok(EngineManager::new(engine, Arc::new(loader)))
}
