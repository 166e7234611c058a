//! JSON-RPC tool server for esbuild-mcp.
//!
//! This crate exposes the esbuild engine as a set of tools over HTTP. It
//! handles:
//!
//! - JSON-RPC routing (`initialize`, `tools/list`, `tools/call`)
//! - Argument normalization and per-tool defaults
//! - Translation of every failure into a uniform error response
//! - Health and readiness checks
//!
//! # Quick Start
//!
//! ```ignore
//! use esbuild_mcp_server::{McpServer, ServerConfig};
//! use esbuild_mcp_common::RuntimeConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = McpServer::new(&RuntimeConfig::default(), ServerConfig::default())?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod handler;
pub mod response;
pub mod router;
pub mod rpc;
pub mod schema;
pub mod server;
pub mod state;
pub mod tools;

pub use response::{Failure, ToolResponse, to_error_response};
pub use server::{McpServer, ServerConfig, ServerError, TestHandle};
pub use state::AppState;
pub use tools::call_tool;
