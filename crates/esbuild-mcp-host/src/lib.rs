//! Host side of the esbuild-mcp engine.
//!
//! This crate provides what the engine module runs against and how it is
//! brought up:
//!
//! - [`linker`]: Imports linked into the engine (`env::log`, WASI preview1)
//! - [`logging`]: Forwarding of guest log lines to `tracing`
//! - [`fetch`]: Download of remote engine modules
//! - [`loader`]: The production [`EngineLoader`](esbuild_mcp_core::EngineLoader)
//!
//! # Capabilities
//!
//! The engine is granted stderr and nothing else: no filesystem, no network,
//! no environment. Inputs reach it only through the JSON call protocol.

pub mod fetch;
pub mod linker;
pub mod loader;
pub mod logging;

pub use fetch::ModuleFetcher;
pub use linker::create_linker;
pub use loader::{WasmLoader, engine_manager};
pub use logging::LoggingHost;
