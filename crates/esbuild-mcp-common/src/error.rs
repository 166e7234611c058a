//! Error types for esbuild-mcp.
//!
//! This module defines the failure taxonomy using `thiserror`:
//! - [`LoadError`]: Lifecycle failures while loading the engine module
//! - [`EngineError`]: Failures reported by a running engine
//! - [`PatternError`]: Invalid user-supplied name patterns
//! - [`ToolError`]: Everything a tool handler can fail with

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diagnostic::DiagnosticSet;

/// Failures while loading, compiling, or initializing the engine module.
///
/// `LoadError` is `Clone` so that one outcome can be handed to every caller
/// that joined the same in-flight load.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The local module file could not be read.
    #[error("Failed to read engine module '{path}': {message}")]
    ModuleRead {
        /// Path that was read.
        path: String,
        /// OS error kind, kept for classification.
        kind: io::ErrorKind,
        /// OS error text.
        message: String,
    },

    /// The module bytes are not a valid WebAssembly module.
    #[error("Engine module compilation failed: {reason}")]
    Compilation {
        /// Description of the compilation failure.
        reason: String,
    },

    /// The remote module location is not a usable URL.
    #[error("Invalid engine module URL '{url}': {reason}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Fetching the remote module failed.
    #[error("Failed to fetch engine module from {url}: {message}")]
    Fetch {
        /// The URL being fetched.
        url: String,
        /// Transport or status error text.
        message: String,
    },

    /// The module was compiled but the engine refused to start.
    #[error("Engine initialization failed: {reason}")]
    Initialization {
        /// Description of the initialization failure.
        reason: String,
    },

    /// The load task panicked or was aborted before it finished.
    #[error("engine load was cancelled")]
    Cancelled,

    /// Any other failure, carried as plain text.
    #[error("{0}")]
    Other(String),
}

impl LoadError {
    /// Create a `ModuleRead` error from an I/O failure.
    pub fn module_read(path: impl Into<String>, err: &io::Error) -> Self {
        Self::ModuleRead {
            path: path.into(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    /// Create a new `Compilation` error.
    pub fn compilation(reason: impl Into<String>) -> Self {
        Self::Compilation {
            reason: reason.into(),
        }
    }

    /// Create a new `Initialization` error.
    pub fn initialization(reason: impl Into<String>) -> Self {
        Self::Initialization {
            reason: reason.into(),
        }
    }

    /// Returns `true` if the module file does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ModuleRead { kind, .. } if *kind == io::ErrorKind::NotFound)
    }
}

impl From<&str> for LoadError {
    fn from(message: &str) -> Self {
        Self::Other(message.to_string())
    }
}

impl From<String> for LoadError {
    fn from(message: String) -> Self {
        Self::Other(message)
    }
}

/// Failures reported by a running engine.
///
/// The engine tags every failure with an explicit `kind`, so a diagnostic
/// collection is never guessed from the shape of an arbitrary object.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EngineError {
    /// The engine ran and produced structured errors and warnings.
    #[error("{0}")]
    Diagnostics(DiagnosticSet),

    /// Any other engine failure.
    #[error("{message}")]
    Message {
        /// Failure description.
        message: String,
    },
}

impl EngineError {
    /// Create a new `Message` error.
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    /// Returns the diagnostic collection, if this failure carries one.
    pub fn diagnostics(&self) -> Option<&DiagnosticSet> {
        match self {
            Self::Diagnostics(set) => Some(set),
            Self::Message { .. } => None,
        }
    }
}

/// A user-supplied pattern that is not a valid regular expression.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid regular expression /{pattern}/: {reason}")]
pub struct PatternError {
    /// The rejected pattern source.
    pub pattern: String,
    /// Parser error text.
    pub reason: String,
}

/// Every failure a tool handler can produce.
#[derive(Error, Debug)]
pub enum ToolError {
    /// Malformed input detected before any engine call.
    #[error("{message}")]
    Validation {
        /// What was wrong with the input.
        message: String,
    },

    /// A pattern-bearing option did not compile.
    #[error("Invalid value for '{field}': {source}")]
    InvalidPattern {
        /// Option name carrying the pattern.
        field: String,
        /// Compilation failure.
        #[source]
        source: PatternError,
    },

    /// The engine could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The engine ran and failed.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl ToolError {
    /// Create a new `Validation` error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
