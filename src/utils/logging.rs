//! Logging
//!
//! tracing-subscriber setup. Logs go to stderr so stdout stays free for
//! event frames and results. `RUST_LOG` overrides the configured level.

use tracing_subscriber::EnvFilter;

use crate::models::settings::LogFormat;
use crate::utils::error::{AppError, AppResult};

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(format: LogFormat, default_level: &str) -> AppResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| AppError::config(format!("invalid log level '{}': {}", default_level, e)))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| AppError::internal(format!("failed to install logger: {}", e)))
}
