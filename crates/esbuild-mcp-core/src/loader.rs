//! The engine's initialization entry point.

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::CompiledModule;
use crate::bundler::Bundler;
use esbuild_mcp_common::LoadError;

/// A resolved engine module, ready to hand to an [`EngineLoader`].
#[derive(Debug, Clone)]
pub enum ModuleSource {
    /// Read from disk and compiled in-process.
    Compiled(CompiledModule),
    /// To be fetched by the loader.
    Remote(Url),
    /// The loader's bundled default module.
    Default,
}

impl ModuleSource {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Compiled(_) => "local",
            Self::Remote(_) => "remote",
            Self::Default => "default",
        }
    }
}

/// Starts an engine from a resolved module.
#[async_trait]
pub trait EngineLoader: Send + Sync {
    /// Initialize the engine and return its callable surface.
    async fn initialize(
        &self,
        source: ModuleSource,
        use_worker: bool,
    ) -> Result<Arc<dyn Bundler>, LoadError>;
}

/// Validate a remote module location.
///
/// Only absolute `http` and `https` URLs are accepted.
pub fn parse_remote_url(raw: &str) -> Result<Url, LoadError> {
    let url = Url::parse(raw).map_err(|e| LoadError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(LoadError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}
