//! Guest log forwarding.
//!
//! The engine writes diagnostics about its own operation through `env::log`.
//! Those lines are re-emitted through `tracing`, tagged so they can be told
//! apart from host logs.

use esbuild_mcp_core::{EngineContext, LogLevel};
use tracing::{debug, error, info, warn};

/// Host side of the engine's logging import.
pub struct LoggingHost;

impl LoggingHost {
    /// Emit one guest log line at `level`.
    pub fn log(ctx: &mut EngineContext, level: LogLevel, message: &str) {
        ctx.metrics.guest_log_lines += 1;

        let session_id = ctx.session_id.as_str();
        match level {
            LogLevel::Debug => debug!(session_id, guest_log = true, "{}", message),
            LogLevel::Info => info!(session_id, guest_log = true, "{}", message),
            LogLevel::Warn => warn!(session_id, guest_log = true, "{}", message),
            LogLevel::Error => error!(session_id, guest_log = true, "{}", message),
        }
    }
}

/// Convert a numeric log level from the engine.
///
/// 0=debug, 1=info, 2=warn, 3=error; anything else is treated as info.
pub fn level_from_i32(level: i32) -> LogLevel {
    match level {
        0 => LogLevel::Debug,
        2 => LogLevel::Warn,
        3 => LogLevel::Error,
        _ => LogLevel::Info,
    }
}

/// Convert a [`LogLevel`] to the engine's numeric value.
pub fn level_to_i32(level: LogLevel) -> i32 {
    match level {
        LogLevel::Debug => 0,
        LogLevel::Info => 1,
        LogLevel::Warn => 2,
        LogLevel::Error => 3,
    }
}
