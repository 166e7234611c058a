//! Engine runtime for esbuild-mcp.
//!
//! This crate owns everything between a tool request and the WebAssembly
//! bundler engine:
//! - [`WasmEngine`]: Configured Wasmtime engine
//! - [`CompiledModule`]: Compiled engine module
//! - [`GuestSession`]: One running engine instance and its JSON call protocol
//! - [`Bundler`]: The engine's callable surface, backed by [`WasmBundler`]
//! - [`EngineManager`]: Lifecycle state machine and lazy accessor
//! - [`normalize`]: Request-to-engine option mapping with [`Pattern`] compilation
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    EngineManager                        │
//! │  (One per process, owns EngineState)                    │
//! │  - Single-flight loads                                  │
//! │  - get_engine() for tool handlers                       │
//! └─────────────────────────────────────────────────────────┘
//!                            │ EngineLoader
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                 WasmBundler (dyn Bundler)               │
//! │  - Inline: async mutex around the session               │
//! │  - Worker: dedicated task fed over a channel            │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │          GuestSession = Store<EngineContext> + Instance │
//! │  - alloc / invoke / version exports                     │
//! │  - Optional per-call fuel budget                        │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod bundler;
pub mod engine;
pub mod instance;
pub mod lifecycle;
pub mod loader;
pub mod module;
pub mod normalize;
pub mod pattern;
pub mod store;

pub use bundler::{
    AnalyzeOptions, BuildContext, BuildResult, Bundler, EngineOptions, FormatOptions,
    MessageKind, OutputFile, TransformResult, WasmBundler,
};
pub use engine::WasmEngine;
pub use instance::GuestSession;
pub use lifecycle::{EngineManager, EngineState, EngineStatus};
pub use loader::{EngineLoader, ModuleSource, parse_remote_url};
pub use module::CompiledModule;
pub use normalize::{Normalized, NormalizedOptions, normalize};
pub use pattern::Pattern;
pub use store::{EngineContext, LogLevel, SessionMetrics, create_store};
