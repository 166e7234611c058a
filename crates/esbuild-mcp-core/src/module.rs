//! Engine module compilation.
//!
//! [`CompiledModule`] wraps a Wasmtime [`Module`] holding an engine binary.
//! Compiling a full bundler build is expensive (hundreds of milliseconds), so
//! callers run [`CompiledModule::from_bytes`] on a blocking thread.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::Instant;

use tracing::{info, instrument};
use wasmtime::{Engine, ExternType, Module};

use esbuild_mcp_common::LoadError;

/// Exports every engine module must provide.
pub const REQUIRED_EXPORTS: [&str; 4] = ["memory", "alloc", "invoke", "version"];

const WASI_MODULE: &str = "wasi_snapshot_preview1";

/// A compiled engine module.
///
/// Cloning is cheap; the Wasmtime module is reference counted.
#[derive(Clone)]
pub struct CompiledModule {
    inner: Module,
    content_hash: String,
    size_bytes: usize,
}

impl CompiledModule {
    /// Compile an engine binary.
    ///
    /// Text format is rejected here; only `\0asm` binaries are accepted from
    /// files and the network.
    #[instrument(skip_all, fields(size_bytes = bytes.len()))]
    pub fn from_bytes(engine: &Engine, bytes: &[u8]) -> Result<Self, LoadError> {
        let start = Instant::now();
        check_magic(bytes)?;

        let inner =
            Module::new(engine, bytes).map_err(|e| LoadError::compilation(format!("{e:#}")))?;
        let module = Self {
            inner,
            content_hash: content_hash(bytes),
            size_bytes: bytes.len(),
        };

        info!(
            content_hash = %module.content_hash,
            duration_ms = start.elapsed().as_millis(),
            "Engine module compiled"
        );
        Ok(module)
    }

    /// Compile a module from WAT source. Used by tests.
    pub fn from_wat(engine: &Engine, wat: &str) -> Result<Self, LoadError> {
        let inner = Module::new(engine, wat)
            .map_err(|e| LoadError::compilation(format!("WAT compilation failed: {e:#}")))?;

        Ok(Self {
            inner,
            content_hash: content_hash(wat.as_bytes()),
            size_bytes: wat.len(),
        })
    }

    /// Short hex digest of the source bytes, for logs.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Required exports the module lacks, in [`REQUIRED_EXPORTS`] order.
    ///
    /// `memory` must be a memory and the rest functions; an export of the
    /// wrong kind counts as missing.
    pub fn missing_exports(&self) -> Vec<&'static str> {
        REQUIRED_EXPORTS
            .into_iter()
            .filter(|name| {
                let found = self.inner.get_export(name);
                !match (*name, found) {
                    ("memory", Some(ExternType::Memory(_))) => true,
                    ("memory", _) => false,
                    (_, Some(ExternType::Func(_))) => true,
                    _ => false,
                }
            })
            .collect()
    }

    /// Whether the module imports any WASI preview1 function.
    pub fn imports_wasi(&self) -> bool {
        self.inner.imports().any(|import| import.module() == WASI_MODULE)
    }

    pub fn as_module(&self) -> &Module {
        &self.inner
    }
}

impl std::fmt::Debug for CompiledModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledModule")
            .field("content_hash", &self.content_hash)
            .field("size_bytes", &self.size_bytes)
            .finish_non_exhaustive()
    }
}

fn check_magic(bytes: &[u8]) -> Result<(), LoadError> {
    match bytes.get(..4) {
        Some(b"\0asm") if bytes.len() >= 8 => Ok(()),
        Some(b"\0asm") | None => Err(LoadError::compilation(format!(
            "not a WebAssembly binary ({} bytes)",
            bytes.len()
        ))),
        Some(_) => Err(LoadError::compilation(
            "not a WebAssembly binary (missing \\0asm header)",
        )),
    }
}

fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WasmEngine;
    use esbuild_mcp_common::RuntimeConfig;

    const EMPTY_MODULE: &[u8] = b"\0asm\x01\0\0\0";

    fn engine() -> WasmEngine {
        WasmEngine::new(&RuntimeConfig::default()).unwrap()
    }

    #[test]
    fn test_rejects_non_wasm() {
        let short = check_magic(b"\0as").unwrap_err();
        assert!(short.to_string().contains("3 bytes"));

        let html = check_magic(b"<!DOCTYPE html>").unwrap_err();
        assert!(html.to_string().contains("\\0asm"));
        assert!(matches!(html, LoadError::Compilation { .. }));

        assert!(check_magic(EMPTY_MODULE).is_ok());
    }

    #[test]
    fn test_from_bytes() {
        let module = CompiledModule::from_bytes(engine().inner(), EMPTY_MODULE).unwrap();

        assert_eq!(module.size_bytes(), 8);
        assert_eq!(module.content_hash().len(), 16);
        assert_eq!(module.missing_exports(), REQUIRED_EXPORTS.to_vec());
        assert!(!module.imports_wasi());
    }

    #[test]
    fn test_content_hash_tracks_bytes() {
        assert_eq!(content_hash(b"a"), content_hash(b"a"));
        assert_ne!(content_hash(b"a"), content_hash(b"b"));
    }

    #[test]
    fn test_export_kinds() {
        let module = CompiledModule::from_wat(
            engine().inner(),
            r#"(module
                (import "wasi_snapshot_preview1" "proc_exit" (func (param i32)))
                (func (export "memory"))
                (func (export "alloc"))
                (global (export "invoke") i32 (i32.const 0))
                (func (export "version")))"#,
        )
        .unwrap();

        assert_eq!(module.missing_exports(), vec!["memory", "invoke"]);
        assert!(module.imports_wasi());
    }

    #[test]
    fn test_invalid_wat() {
        let result = CompiledModule::from_wat(engine().inner(), "(module (func (export");
        assert!(matches!(result, Err(LoadError::Compilation { .. })));
    }
}
