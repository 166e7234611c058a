//! Engine store context.
//!
//! This module provides:
//! - [`EngineContext`]: State owned by the store that runs the engine module
//! - [`LogLevel`]: Severity of log lines emitted by the engine
//! - [`SessionMetrics`]: Counters for one running engine instance

use wasmtime::{Store, StoreLimits, StoreLimitsBuilder};
use wasmtime_wasi::WasiCtxBuilder;
use wasmtime_wasi::preview1::WasiP1Ctx;

use crate::WasmEngine;
use esbuild_mcp_common::LoadError;

/// State owned by the store of one engine instance.
///
/// Unlike a per-request context, this lives as long as the loaded engine:
/// the bundler keeps one instance and serializes calls into it.
pub struct EngineContext {
    /// WASI preview1 context (stderr only).
    wasi: WasiP1Ctx,

    /// Resource limits enforced by the store.
    limits: StoreLimits,

    /// Identifier used to correlate guest logs with the load that created it.
    pub session_id: String,

    /// Counters for this instance.
    pub metrics: SessionMetrics,
}

/// Log level for guest logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug-level messages.
    Debug,
    /// Informational messages.
    Info,
    /// Warning messages.
    Warn,
    /// Error messages.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Counters for one engine instance.
#[derive(Debug, Clone, Default)]
pub struct SessionMetrics {
    /// Calls completed (successfully or not).
    pub calls: u64,

    /// Log lines emitted by the guest.
    pub guest_log_lines: u64,
}

impl EngineContext {
    /// Create a new context for the engine instance `session_id`.
    pub fn new(session_id: String, max_memory_bytes: usize) -> Self {
        // The engine gets stderr for panics and nothing else
        let wasi = WasiCtxBuilder::new().inherit_stderr().build_p1();

        let limits = StoreLimitsBuilder::new()
            .memory_size(max_memory_bytes)
            .instances(1)
            .build();

        Self {
            wasi,
            limits,
            session_id,
            metrics: SessionMetrics::default(),
        }
    }

    /// Access the WASI context for linker registration.
    pub fn wasi_mut(&mut self) -> &mut WasiP1Ctx {
        &mut self.wasi
    }
}

/// Create a new Wasmtime store for one engine instance.
///
/// # Errors
///
/// Returns an error if fuel cannot be set on the store.
pub fn create_store(
    engine: &WasmEngine,
    session_id: String,
) -> Result<Store<EngineContext>, LoadError> {
    let execution = &engine.config().execution;
    let context = EngineContext::new(session_id, execution.max_memory_bytes());
    let mut store = Store::new(engine.inner(), context);
    store.limiter(|ctx| &mut ctx.limits);

    if engine.is_fuel_enabled() {
        store
            .set_fuel(execution.max_fuel)
            .map_err(|e| LoadError::initialization(format!("Failed to set fuel: {e}")))?;
    }

    Ok(store)
}

/// Get remaining fuel from a store.
pub fn get_remaining_fuel(store: &Store<EngineContext>) -> Option<u64> {
    store.get_fuel().ok()
}

/// Calculate fuel consumed.
pub fn calculate_fuel_consumed(initial_fuel: u64, store: &Store<EngineContext>) -> u64 {
    let remaining = get_remaining_fuel(store).unwrap_or(0);
    initial_fuel.saturating_sub(remaining)
}
