//! Engine instance lifecycle and the JSON call protocol.
//!
//! A [`GuestSession`] owns one instantiated engine module and its store.
//! Every engine operation is a single `invoke` call that exchanges JSON:
//!
//! 1. The host asks the guest to `alloc` room for the request
//! 2. The request `{"op": .., "payload": ..}` is written into guest memory
//! 3. `invoke(ptr, len)` returns `(ptr << 32) | len` of the JSON reply
//! 4. The reply is either `{"ok": ..}` or `{"error": {"kind": ..}}`
//!
//! The guest may also export `dealloc(ptr, len)`; when present both buffers
//! are released after each call.

use std::time::Instant;

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};
use wasmtime::{Instance, Linker, Memory, Store, Trap, TypedFunc};

use crate::CompiledModule;
use crate::store::{EngineContext, calculate_fuel_consumed, get_remaining_fuel};
use esbuild_mcp_common::{EngineError, LoadError};

/// Reply envelope written by the guest.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Reply {
    Ok(Value),
    Error(EngineError),
}

/// One running engine instance.
pub struct GuestSession {
    store: Store<EngineContext>,
    memory: Memory,
    alloc: TypedFunc<i32, i32>,
    dealloc: Option<TypedFunc<(i32, i32), ()>>,
    invoke: TypedFunc<(i32, i32), i64>,
    version: String,
    max_fuel: Option<u64>,
}

impl GuestSession {
    /// Instantiate `module` and run its initialization entry point.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Instantiation fails (missing imports, start trap)
    /// - A required export is missing
    /// - `_initialize` or `version` traps
    #[instrument(skip_all, fields(session_id = %store.data().session_id))]
    pub async fn start(
        linker: &Linker<EngineContext>,
        module: &CompiledModule,
        mut store: Store<EngineContext>,
        max_fuel: Option<u64>,
    ) -> Result<Self, LoadError> {
        let start = Instant::now();

        let instance = linker
            .instantiate_async(&mut store, module.as_module())
            .await
            .map_err(|e| LoadError::initialization(format!("Instantiation failed: {e:#}")))?;

        let memory = instance
            .get_memory(&mut store, "memory")
            .ok_or_else(|| missing_export("memory"))?;
        let alloc = typed_export::<i32, i32>(&instance, &mut store, "alloc")?;
        let invoke = typed_export::<(i32, i32), i64>(&instance, &mut store, "invoke")?;
        let version_fn = typed_export::<(), i64>(&instance, &mut store, "version")?;
        let dealloc = instance
            .get_typed_func::<(i32, i32), ()>(&mut store, "dealloc")
            .ok();

        if let Ok(init) = instance.get_typed_func::<(), ()>(&mut store, "_initialize") {
            debug!("Running engine _initialize");
            init.call_async(&mut store, ()).await.map_err(|e| {
                LoadError::initialization(format!("Engine _initialize trapped: {e:#}"))
            })?;
        }

        let packed = version_fn
            .call_async(&mut store, ())
            .await
            .map_err(|e| LoadError::initialization(format!("Engine version() trapped: {e:#}")))?;
        let bytes = read_packed(&memory, &store, packed)
            .map_err(|e| LoadError::initialization(format!("Unreadable engine version: {e}")))?;
        let version = String::from_utf8(bytes)
            .map_err(|_| LoadError::initialization("Engine version is not valid UTF-8"))?;

        debug!(
            version = %version,
            duration_ms = start.elapsed().as_millis(),
            "Engine instance started"
        );

        Ok(Self {
            store,
            memory,
            alloc,
            dealloc,
            invoke,
            version,
            max_fuel,
        })
    }

    /// Build identifier reported by the engine.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Identifier of the load that created this session.
    pub fn session_id(&self) -> &str {
        &self.store.data().session_id
    }

    /// Perform one engine operation.
    #[instrument(skip(self, payload), fields(session_id = %self.store.data().session_id))]
    pub async fn call(&mut self, op: &str, payload: Value) -> Result<Value, EngineError> {
        let start = Instant::now();

        if let Some(fuel) = self.max_fuel {
            self.store
                .set_fuel(fuel)
                .map_err(|e| EngineError::message(format!("Failed to set fuel: {e}")))?;
        }
        let initial_fuel = get_remaining_fuel(&self.store).unwrap_or(0);

        let request = serde_json::to_vec(&json!({ "op": op, "payload": payload }))
            .map_err(|e| EngineError::message(format!("Failed to encode request: {e}")))?;
        let result = self.exchange(&request).await;

        let fuel_consumed = calculate_fuel_consumed(initial_fuel, &self.store);
        let metrics = &mut self.store.data_mut().metrics;
        metrics.calls += 1;

        debug!(
            op,
            duration_ms = start.elapsed().as_millis(),
            fuel_consumed,
            call = metrics.calls,
            guest_log_lines = metrics.guest_log_lines,
            ok = result.is_ok(),
            "Engine call finished"
        );

        let reply: Reply = serde_json::from_slice(&result?)
            .map_err(|e| EngineError::message(format!("Malformed engine reply: {e}")))?;

        match reply {
            Reply::Ok(value) => Ok(value),
            Reply::Error(err) => Err(err),
        }
    }

    async fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>, EngineError> {
        let len = i32::try_from(request.len())
            .map_err(|_| EngineError::message("Request too large for engine memory"))?;

        let ptr = self
            .alloc
            .call_async(&mut self.store, len)
            .await
            .map_err(trap_to_engine_error)?;

        #[allow(clippy::cast_sign_loss)]
        let offset = ptr as u32 as usize;
        self.memory
            .write(&mut self.store, offset, request)
            .map_err(|e| EngineError::message(format!("Engine allocation out of bounds: {e}")))?;

        let packed = self
            .invoke
            .call_async(&mut self.store, (ptr, len))
            .await
            .map_err(trap_to_engine_error)?;

        let reply = read_packed(&self.memory, &self.store, packed).map_err(EngineError::message);

        if let Some(dealloc) = &self.dealloc {
            let (out_ptr, out_len) = unpack(packed);
            for (p, l) in [(ptr, len), (out_ptr, out_len)] {
                if let Err(e) = dealloc.call_async(&mut self.store, (p, l)).await {
                    warn!(error = %e, "Engine dealloc failed");
                }
            }
        }

        reply
    }
}

impl std::fmt::Debug for GuestSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuestSession")
            .field("version", &self.version)
            .field("session_id", &self.store.data().session_id)
            .finish_non_exhaustive()
    }
}

fn typed_export<P, R>(
    instance: &Instance,
    store: &mut Store<EngineContext>,
    name: &str,
) -> Result<TypedFunc<P, R>, LoadError>
where
    P: wasmtime::WasmParams,
    R: wasmtime::WasmResults,
{
    instance
        .get_typed_func::<P, R>(&mut *store, name)
        .map_err(|e| LoadError::initialization(format!("Engine export '{name}' unusable: {e}")))
}

fn missing_export(name: &str) -> LoadError {
    LoadError::initialization(format!("Engine module does not export '{name}'"))
}

/// Split a packed `(ptr << 32) | len` value.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn unpack(packed: i64) -> (i32, i32) {
    let bits = packed as u64;
    ((bits >> 32) as u32 as i32, bits as u32 as i32)
}

fn read_packed(
    memory: &Memory,
    store: &Store<EngineContext>,
    packed: i64,
) -> Result<Vec<u8>, String> {
    let (ptr, len) = unpack(packed);
    #[allow(clippy::cast_sign_loss)]
    let (start, len) = (ptr as u32 as usize, len as u32 as usize);

    let data = memory.data(store);
    let end = start
        .checked_add(len)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| format!("reply [{start}, +{len}) outside of {} bytes", data.len()))?;

    Ok(data[start..end].to_vec())
}

/// Map a trap raised inside the engine to an engine failure.
fn trap_to_engine_error(error: wasmtime::Error) -> EngineError {
    if is_out_of_fuel(&error) {
        return EngineError::message("Engine call exceeded its fuel budget");
    }
    EngineError::message(format!("Engine trapped: {error:#}"))
}

/// Check if an error is due to fuel exhaustion.
fn is_out_of_fuel(error: &wasmtime::Error) -> bool {
    error
        .downcast_ref::<Trap>()
        .is_some_and(|trap| *trap == Trap::OutOfFuel)
}
