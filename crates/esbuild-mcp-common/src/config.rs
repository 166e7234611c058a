//! Configuration structures for esbuild-mcp.
//!
//! This module defines configuration options for the engine host:
//! - [`RuntimeConfig`]: Top-level configuration containing all settings
//! - [`EngineConfig`]: Wasmtime engine settings and the default module
//! - [`ExecutionConfig`]: Limits applied to every engine call

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RuntimeConfig {
    /// Wasmtime engine configuration.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Per-call execution configuration.
    #[serde(default)]
    pub execution: ExecutionConfig,
}

/// Wasmtime engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Module used when a load request names neither a path nor a URL.
    #[serde(default = "defaults::default_module_path")]
    pub default_module_path: PathBuf,

    /// Compile with Cranelift speed optimizations.
    ///
    /// Disabling this shortens compilation of large engine modules at the
    /// cost of slower calls.
    #[serde(default = "defaults::cranelift_opt")]
    pub cranelift_opt: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_module_path: defaults::default_module_path(),
            cranelift_opt: defaults::cranelift_opt(),
        }
    }
}

/// Limits applied to every engine call.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutionConfig {
    /// Enable fuel metering.
    #[serde(default)]
    pub fuel_metering: bool,

    /// Fuel granted to each call when metering is enabled.
    #[serde(default = "defaults::max_fuel")]
    pub max_fuel: u64,

    /// Maximum linear memory of the engine instance in megabytes.
    #[serde(default = "defaults::max_memory_mb")]
    pub max_memory_mb: u32,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            fuel_metering: false,
            max_fuel: defaults::max_fuel(),
            max_memory_mb: defaults::max_memory_mb(),
        }
    }
}

impl ExecutionConfig {
    /// Memory limit in bytes.
    pub fn max_memory_bytes(&self) -> usize {
        (self.max_memory_mb as usize) * 1024 * 1024
    }
}

/// Default value functions for serde.
mod defaults {
    use std::path::PathBuf;

    pub fn default_module_path() -> PathBuf {
        PathBuf::from("esbuild.wasm")
    }

    pub const fn cranelift_opt() -> bool {
        true
    }

    pub const fn max_fuel() -> u64 {
        50_000_000_000
    }

    pub const fn max_memory_mb() -> u32 {
        1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RuntimeConfig::default();

        assert_eq!(config.engine.default_module_path, PathBuf::from("esbuild.wasm"));
        assert!(config.engine.cranelift_opt);
        assert!(!config.execution.fuel_metering);
        assert_eq!(config.execution.max_memory_mb, 1024);
    }

    #[test]
    fn test_partial_deserialization() {
        let json = r#"{"execution": {"fuel_metering": true, "max_fuel": 1000}}"#;
        let config: RuntimeConfig = serde_json::from_str(json).unwrap();

        assert!(config.execution.fuel_metering);
        assert_eq!(config.execution.max_fuel, 1000);
        // Defaults for unspecified fields
        assert_eq!(config.execution.max_memory_mb, 1024);
        assert!(config.engine.cranelift_opt);
    }

    #[test]
    fn test_max_memory_bytes() {
        let config = ExecutionConfig {
            max_memory_mb: 2,
            ..Default::default()
        };
        assert_eq!(config.max_memory_bytes(), 2 * 1024 * 1024);
    }
}
