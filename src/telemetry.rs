//! Tracing subscriber setup for binaries
//!
//! The library only emits events through `tracing`; installing a subscriber
//! is left to the application, which can call [`init`] once at startup.

use crate::config::LoggingConfig;
use crate::core::error::{ApiError, ApiResult};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Build the filter for a logging configuration; `RUST_LOG` takes precedence
pub fn env_filter(config: &LoggingConfig) -> ApiResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level)
        .map_err(|e| ApiError::configuration(format!("invalid log level '{}': {}", config.level, e)))
}

/// Install the global subscriber described by `config`
pub fn init(config: &LoggingConfig) -> ApiResult<()> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let installed = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| ApiError::configuration(format!("cannot open log file {path}: {e}")))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
        }
        None => builder.try_init(),
    };

    installed.map_err(|e| ApiError::configuration(format!("logging already initialized: {e}")))
}
