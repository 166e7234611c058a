//! Shared application state.
//!
//! This module provides [`AppState`], which holds shared resources
//! across all request handlers.

use std::sync::Arc;

use esbuild_mcp_common::{LoadError, RuntimeConfig};
use esbuild_mcp_core::EngineManager;
use esbuild_mcp_host::engine_manager;

/// Shared state across all request handlers.
///
/// This struct is cloned for each request, so it uses `Arc` for shared data.
#[derive(Clone)]
pub struct AppState {
    /// Engine lifecycle, shared by every tool.
    manager: Arc<EngineManager>,
}

impl AppState {
    /// Create state backed by the wasmtime loader.
    ///
    /// No engine is loaded yet; the first tool call or an explicit
    /// `esbuild_wasm_initialize` does that.
    pub fn new(config: &RuntimeConfig) -> Result<Self, LoadError> {
        Ok(Self::with_manager(Arc::new(engine_manager(config)?)))
    }

    /// Create state around an existing manager.
    pub fn with_manager(manager: Arc<EngineManager>) -> Self {
        Self { manager }
    }

    /// Get the engine manager.
    pub fn manager(&self) -> &EngineManager {
        &self.manager
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("engine", &self.manager.get_state().status)
            .finish()
    }
}
