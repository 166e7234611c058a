//! TOML configuration file.
//!
//! A config file has two tables, `[runtime]` (see [`RuntimeConfig`]) and
//! `[server]` (see [`ServerConfigFile`]). Every key is optional:
//!
//! ```toml
//! [runtime.engine]
//! default_module_path = "./vendor/esbuild.wasm"
//!
//! [runtime.execution]
//! fuel_metering = true
//! max_fuel = 10_000_000_000
//!
//! [server]
//! bind_addr = "127.0.0.1:8765"
//! request_timeout_secs = 60
//! preload = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::RuntimeConfig;

/// Parsed configuration file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default)]
    pub server: ServerConfigFile,
}

impl ConfigFile {
    /// Read, parse and validate `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigFileError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml(&content)
    }

    /// Parse and validate TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigFileError> {
        let file: Self = toml::from_str(content).map_err(|e| ConfigFileError::Parse {
            message: e.to_string(),
        })?;
        file.validate()?;
        Ok(file)
    }

    /// Reject values that parse but cannot work.
    pub fn validate(&self) -> Result<(), ConfigFileError> {
        let invalid = |field: &'static str, message: &str| {
            Err(ConfigFileError::Invalid {
                field,
                message: message.to_string(),
            })
        };

        if self.runtime.engine.default_module_path.as_os_str().is_empty() {
            return invalid("runtime.engine.default_module_path", "must not be empty");
        }
        if self.runtime.execution.max_memory_mb == 0 {
            return invalid("runtime.execution.max_memory_mb", "must be at least 1");
        }
        if self.runtime.execution.fuel_metering && self.runtime.execution.max_fuel == 0 {
            return invalid(
                "runtime.execution.max_fuel",
                "must be positive when fuel_metering is enabled",
            );
        }
        if self.server.request_timeout_secs == 0 {
            return invalid("server.request_timeout_secs", "must be at least 1");
        }
        Ok(())
    }
}

/// `[server]` table.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfigFile {
    /// `host:port` to listen on.
    #[serde(default = "defaults::bind_addr")]
    pub bind_addr: String,

    /// Bundling a large project on a cold engine can take a while.
    #[serde(default = "defaults::request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "defaults::graceful_shutdown")]
    pub graceful_shutdown: bool,

    /// Load the default engine module right after binding.
    #[serde(default)]
    pub preload: bool,
}

impl Default for ServerConfigFile {
    fn default() -> Self {
        Self {
            bind_addr: defaults::bind_addr(),
            request_timeout_secs: defaults::request_timeout_secs(),
            graceful_shutdown: defaults::graceful_shutdown(),
            preload: false,
        }
    }
}

/// Configuration file errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {message}")]
    Parse { message: String },

    #[error("Invalid value for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

mod defaults {
    pub fn bind_addr() -> String {
        "127.0.0.1:8765".to_string()
    }

    pub const fn request_timeout_secs() -> u64 {
        120
    }

    pub const fn graceful_shutdown() -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = ConfigFile::from_toml("").unwrap();

        assert_eq!(config.server.bind_addr, "127.0.0.1:8765");
        assert_eq!(config.server.request_timeout_secs, 120);
        assert!(config.server.graceful_shutdown);
        assert!(!config.server.preload);
        assert_eq!(
            config.runtime.engine.default_module_path,
            PathBuf::from("esbuild.wasm")
        );
    }

    #[test]
    fn test_full_file() {
        let toml = r#"
            [runtime.engine]
            default_module_path = "./vendor/esbuild.wasm"
            cranelift_opt = false

            [runtime.execution]
            fuel_metering = true
            max_fuel = 5_000_000
            max_memory_mb = 256

            [server]
            bind_addr = "0.0.0.0:9000"
            request_timeout_secs = 60
            graceful_shutdown = false
            preload = true
        "#;

        let config = ConfigFile::from_toml(toml).unwrap();

        assert_eq!(
            config.runtime.engine.default_module_path,
            PathBuf::from("./vendor/esbuild.wasm")
        );
        assert!(!config.runtime.engine.cranelift_opt);
        assert!(config.runtime.execution.fuel_metering);
        assert_eq!(config.runtime.execution.max_fuel, 5_000_000);
        assert_eq!(config.runtime.execution.max_memory_mb, 256);
        assert_eq!(config.server.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.server.request_timeout_secs, 60);
        assert!(!config.server.graceful_shutdown);
        assert!(config.server.preload);
    }

    #[test]
    fn test_unknown_table_rejected() {
        let err = ConfigFile::from_toml("[admin]\nenabled = true\n").unwrap_err();
        assert!(matches!(err, ConfigFileError::Parse { .. }));
    }

    #[test]
    fn test_validation() {
        let err = ConfigFile::from_toml("[server]\nrequest_timeout_secs = 0\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid value for server.request_timeout_secs: must be at least 1"
        );

        let err = ConfigFile::from_toml(
            "[runtime.execution]\nfuel_metering = true\nmax_fuel = 0\n",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigFileError::Invalid {
                field: "runtime.execution.max_fuel",
                ..
            }
        ));

        // Zero fuel is fine while metering is off
        assert!(ConfigFile::from_toml("[runtime.execution]\nmax_fuel = 0\n").is_ok());
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigFile::from_file("/nonexistent/esbuild-mcp.toml").unwrap_err();
        assert!(matches!(err, ConfigFileError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/esbuild-mcp.toml"));
    }
}
