//! Common types, errors, and configuration for esbuild-mcp.
//!
//! This crate provides shared functionality used across the esbuild-mcp workspace:
//! - Error types using `thiserror` for the whole failure taxonomy
//! - Engine diagnostics and load options as they appear on the wire
//! - Configuration structures and the TOML config file

pub mod config;
pub mod config_file;
pub mod diagnostic;
pub mod error;
pub mod options;

pub use config::{EngineConfig, ExecutionConfig, RuntimeConfig};
pub use config_file::{ConfigFile, ConfigFileError, ServerConfigFile};
pub use diagnostic::{Diagnostic, DiagnosticSet, Location};
pub use error::{EngineError, LoadError, PatternError, ToolError};
pub use options::{LoadOptions, ModuleRequest};
