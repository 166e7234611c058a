//! Engine load options.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Configuration for one engine load.
///
/// Accepts the original tool's field names as aliases: `wasmURL`,
/// `wasmModule` and `worker`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadOptions {
    /// Fetch the compiled engine module from this URL.
    #[serde(
        rename = "remoteURL",
        alias = "wasmURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub remote_url: Option<String>,

    /// Read and compile the engine module from this path.
    #[serde(alias = "wasmModule", default, skip_serializing_if = "Option::is_none")]
    pub local_module_path: Option<PathBuf>,

    /// Run the engine on a dedicated task instead of the caller's.
    #[serde(alias = "worker", default)]
    pub use_worker: bool,
}

/// Where the engine module should come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleRequest<'a> {
    /// Read from the local filesystem.
    Local(&'a Path),
    /// Fetch from a remote location.
    Remote(&'a str),
    /// Use the configured default module.
    Default,
}

impl LoadOptions {
    /// Options that load the module at `path`.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            local_module_path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Options that fetch the module from `url`.
    pub fn remote(url: impl Into<String>) -> Self {
        Self {
            remote_url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Set the worker flag.
    #[must_use]
    pub fn with_worker(mut self, use_worker: bool) -> Self {
        self.use_worker = use_worker;
        self
    }

    /// Resolve which module source these options select.
    ///
    /// A local path takes precedence over a remote URL.
    pub fn module_request(&self) -> ModuleRequest<'_> {
        match (&self.local_module_path, &self.remote_url) {
            (Some(path), _) => ModuleRequest::Local(path),
            (None, Some(url)) => ModuleRequest::Remote(url),
            (None, None) => ModuleRequest::Default,
        }
    }

    /// Returns `true` if both a local path and a remote URL were given.
    pub fn is_ambiguous(&self) -> bool {
        self.local_module_path.is_some() && self.remote_url.is_some()
    }
}
