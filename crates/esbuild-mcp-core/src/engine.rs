//! Wasmtime engine configuration and creation.
//!
//! The [`WasmEngine`] compiles engine modules and backs every store that runs
//! them. It is:
//! - Thread-safe and shared by the lifecycle manager and the loader
//! - Configured for async calls so a busy engine never blocks the runtime
//! - Optionally set up with fuel metering to bound each call

use std::sync::Arc;

use tracing::info;
use wasmtime::{Config, Engine, OptLevel};

use esbuild_mcp_common::{LoadError, RuntimeConfig};

/// Thread-safe WebAssembly engine wrapper.
///
/// A module compiled with one `WasmEngine` can only be instantiated by the
/// same engine, so the lifecycle manager and the loader must share a clone.
#[derive(Clone)]
pub struct WasmEngine {
    engine: Arc<Engine>,
    config: RuntimeConfig,
}

impl WasmEngine {
    /// Create a new WebAssembly engine with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the Wasmtime configuration is rejected.
    pub fn new(config: &RuntimeConfig) -> Result<Self, LoadError> {
        let mut wasmtime_config = Config::new();

        // Engine calls are awaited, never run on a blocking thread
        wasmtime_config.async_support(true);

        if config.execution.fuel_metering {
            wasmtime_config.consume_fuel(true);
        }

        wasmtime_config.cranelift_opt_level(if config.engine.cranelift_opt {
            OptLevel::Speed
        } else {
            OptLevel::None
        });

        let engine = Engine::new(&wasmtime_config).map_err(|e| {
            LoadError::initialization(format!("Failed to create Wasmtime engine: {e}"))
        })?;

        info!(
            fuel_metering = config.execution.fuel_metering,
            cranelift_opt = config.engine.cranelift_opt,
            "Wasmtime engine initialized"
        );

        Ok(Self {
            engine: Arc::new(engine),
            config: config.clone(),
        })
    }

    /// Get a reference to the inner Wasmtime engine.
    pub fn inner(&self) -> &Engine {
        &self.engine
    }

    /// Get the runtime configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Check if fuel metering is enabled.
    pub fn is_fuel_enabled(&self) -> bool {
        self.config.execution.fuel_metering
    }
}

impl std::fmt::Debug for WasmEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmEngine")
            .field("fuel_metering", &self.config.execution.fuel_metering)
            .field("default_module_path", &self.config.engine.default_module_path)
            .finish_non_exhaustive()
    }
}
