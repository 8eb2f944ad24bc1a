//! Structured logging utilities for Tessera components.
//!
//! Every macro tags its event with a `component` field so region, world and
//! codec traffic can be filtered apart.
//!
//! # Usage
//!
//! ```ignore
//! use tessera_config::{log_region_debug, log_world_info};
//!
//! log_region_debug!("Chunk placed", x = 3, z = 7, sector = 12);
//! log_world_info!("Region created", file = "r.0.0.mca");
//! ```

use std::fmt;
use std::str::FromStr;

/// Component identifiers for log filtering
pub struct Component;

impl Component {
    pub const REGION: &'static str = "REGION";
    pub const WORLD: &'static str = "WORLD";
    pub const CODEC: &'static str = "CODEC";
    pub const CONFIG: &'static str = "CONFIG";
}

/// Log levels for runtime configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

// === REGION logging macros ===

#[macro_export]
macro_rules! log_region_warn {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::warn!(component = "REGION", $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_region_info {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::info!(component = "REGION", $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_region_debug {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::debug!(component = "REGION", $($key = $value,)* $msg)
    };
}

// === WORLD logging macros ===

#[macro_export]
macro_rules! log_world_info {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::info!(component = "WORLD", $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_world_debug {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::debug!(component = "WORLD", $($key = $value,)* $msg)
    };
}

// === CODEC logging macros ===

#[macro_export]
macro_rules! log_codec_debug {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::debug!(component = "CODEC", $($key = $value,)* $msg)
    };
}

/// Initialize logging with the given level filter.
///
/// `RUST_LOG` wins over `level` when set. A second call is a no-op, so
/// tests may call this freely.
pub fn init_logging(level: LogLevel) {
    use tracing_subscriber::EnvFilter;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}
