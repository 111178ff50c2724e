//! Logging setup and configuration.
//!
//! The crate itself only emits `log` records. Applications that have no logger of
//! their own can call [`setup_logging`] once at startup to route those records to
//! the console and, optionally, to daily rolling files.

use tracing_appender::rolling::RollingFileAppender;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize rolling file appender at '{path}': {msg}")]
    FileAppender { path: String, msg: String },

    #[error("A global logger is already installed: {msg}")]
    AlreadyInitialized { msg: String },
}

/// Sets up console logging, plus file output when `logs_path` is configured.
///
/// `RUST_LOG` takes precedence over [`LoggingConfig::default_filter`].
pub fn setup_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));
    let console = fmt::layer().with_writer(std::io::stdout).with_ansi(true);

    let file = match &config.logs_path {
        Some(logs_path) => {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("blackboard")
                .filename_suffix("log")
                .max_log_files(config.max_log_files)
                .build(logs_path)
                .map_err(|e| LoggingError::FileAppender {
                    path: logs_path.to_string_lossy().to_string(),
                    msg: e.to_string(),
                })?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // Leak the guard to prevent it from being dropped
            std::mem::forget(guard);

            Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized { msg: e.to_string() })
}
