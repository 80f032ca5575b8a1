///! Logging configuration module
///! Structured console logging with an optional rolling JSON file

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use std::io;

use crate::config::LoggingConfig;

/// Keeps the file writer flushing; hold it until shutdown
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

impl LoggingConfig {
    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }

    /// Initialize logging based on configuration
    pub fn init(&self) -> Result<LoggingGuard, Box<dyn std::error::Error>> {
        let console_layer = if self.json_format {
            fmt::layer()
                .with_target(true)
                .with_writer(io::stdout)
                .json()
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_ansi(true)
                .with_writer(io::stdout)
                .boxed()
        };

        let (file_layer, guard) = if self.file_logging_enabled {
            std::fs::create_dir_all(&self.log_dir)?;

            let file_appender = rolling::daily(&self.log_dir, "warden.log");
            let (writer, guard) = non_blocking(file_appender);

            let layer = fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
                .with_writer(writer);

            (Some(layer), Some(guard))
        } else {
            (None, None)
        };

        tracing_subscriber::registry()
            .with(self.env_filter())
            .with(console_layer)
            .with(file_layer)
            .try_init()?;

        tracing::info!(
            level = %self.level,
            file_logging = self.file_logging_enabled,
            "Logging initialized"
        );

        Ok(LoggingGuard { _file: guard })
    }
}
