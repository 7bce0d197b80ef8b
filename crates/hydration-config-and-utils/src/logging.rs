//! Logging initialization.
//!
//! Installs a `tracing` subscriber that writes to stderr, either compact
//! human-readable lines or one JSON object per line. `RUST_LOG` takes
//! precedence over the configured level.

use crate::{Config, CoreError, CoreResult, LogFormat};
use std::io;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global tracing subscriber from `config`.
///
/// # Example
///
/// ```ignore
/// init_logging(&Config::default())?;
/// tracing::info!("ready");
/// ```
pub fn init_logging(config: &Config) -> CoreResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let compact_layer = (config.log_format == LogFormat::Compact).then(|| {
        fmt::layer()
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(io::stderr)
    });

    let json_layer = (config.log_format == LogFormat::Json).then(|| {
        fmt::layer()
            .json()
            .with_current_span(false)
            .with_writer(io::stderr)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(compact_layer)
        .with(json_layer)
        .try_init()
        .map_err(|e| CoreError::Config(format!("failed to install log subscriber: {e}")))?;

    tracing::debug!(
        level = %config.log_level,
        format = %config.log_format,
        "logging initialized"
    );
    Ok(())
}
