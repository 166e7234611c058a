//! Linker setup for engine modules.
//!
//! The engine module may import:
//! - `env::log(level: i32, ptr: i32, len: i32)` for guest logging
//! - WASI preview1, limited to an inherited stderr

use esbuild_mcp_common::LoadError;
use esbuild_mcp_core::{EngineContext, WasmEngine};
use tracing::warn;
use wasmtime::{Caller, Linker};

use crate::logging::{LoggingHost, level_from_i32};

/// Create a linker with every import an engine module may use.
pub fn create_linker(engine: &WasmEngine) -> Result<Linker<EngineContext>, LoadError> {
    let mut linker = Linker::new(engine.inner());
    register_all(&mut linker)?;
    Ok(linker)
}

/// Register WASI and the `env` host functions on `linker`.
pub fn register_all(linker: &mut Linker<EngineContext>) -> Result<(), LoadError> {
    wasmtime_wasi::preview1::add_to_linker_async(linker, EngineContext::wasi_mut)
        .map_err(|e| LoadError::initialization(format!("Failed to link WASI: {e}")))?;
    register_logging(linker)?;
    Ok(())
}

/// Register `env::log`.
///
/// The guest passes a level (0=debug, 1=info, 2=warn, 3=error) and a UTF-8
/// message in its own memory. Out-of-bounds messages are dropped with a
/// warning rather than trapping the engine.
pub fn register_logging(linker: &mut Linker<EngineContext>) -> Result<(), LoadError> {
    linker
        .func_wrap(
            "env",
            "log",
            |mut caller: Caller<'_, EngineContext>, level: i32, ptr: i32, len: i32| {
                if ptr < 0 || len < 0 {
                    warn!(ptr, len, "Guest log with negative pointer or length");
                    return;
                }

                let Some(memory) = caller
                    .get_export("memory")
                    .and_then(wasmtime::Extern::into_memory)
                else {
                    warn!("Guest log without an exported memory");
                    return;
                };

                // Owned copy, so the context can be borrowed mutably below
                #[allow(clippy::cast_sign_loss)]
                let message = {
                    let data = memory.data(&caller);
                    let start = ptr as usize;
                    let Some(bytes) = start
                        .checked_add(len as usize)
                        .and_then(|end| data.get(start..end))
                    else {
                        warn!(ptr, len, memory_size = data.len(), "Guest log out of bounds");
                        return;
                    };
                    String::from_utf8_lossy(bytes).into_owned()
                };

                LoggingHost::log(caller.data_mut(), level_from_i32(level), &message);
            },
        )
        .map_err(|e| LoadError::initialization(format!("Failed to register env::log: {e}")))?;

    Ok(())
}
