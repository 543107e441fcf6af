//! Logging configuration and setup.

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter,
};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format.
    #[default]
    Pretty,
    /// Compact single-line format.
    Compact,
    /// JSON format for structured logging.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level used when neither `filter` nor `RUST_LOG` is set.
    pub level: Level,
    /// Output format.
    pub format: LogFormat,
    /// Include source file location.
    pub include_location: bool,
    /// Include span events (enter, exit).
    pub include_span_events: bool,
    /// Write to the test harness's captured output instead of stdout.
    pub test_writer: bool,
    /// Custom filter string (e.g., "headless_gl=trace").
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Pretty,
            include_location: false,
            include_span_events: false,
            test_writer: false,
            filter: None,
        }
    }
}

impl LogConfig {
    /// Create a debug configuration.
    pub fn debug() -> Self {
        Self {
            level: Level::DEBUG,
            include_location: true,
            include_span_events: true,
            ..Default::default()
        }
    }

    /// Compact output captured per test; quiet unless `RUST_LOG` asks.
    pub fn test() -> Self {
        Self {
            level: Level::WARN,
            format: LogFormat::Compact,
            test_writer: true,
            ..Default::default()
        }
    }

    /// JSON lines for machine consumption.
    pub fn production() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Json,
            ..Default::default()
        }
    }

    /// Set a custom filter.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    fn env_filter(&self) -> EnvFilter {
        let fallback = || EnvFilter::new(self.level.to_string());
        match self.filter {
            Some(ref custom) => EnvFilter::try_new(custom).unwrap_or_else(|_| fallback()),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback()),
        }
    }
}

/// Errors raised while installing the global subscriber.
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("a global tracing subscriber is already installed: {0}")]
    AlreadyInitialized(#[from] TryInitError),
}

/// Install the global subscriber, failing if one is already set.
pub fn try_init_logging(config: LogConfig) -> Result<(), LoggingError> {
    let filter = config.env_filter();
    let span_events = if config.include_span_events {
        FmtSpan::ENTER | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    match (config.format, config.test_writer) {
        (LogFormat::Pretty, false) => {
            let fmt_layer = fmt::layer()
                .with_target(true)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_span_events(span_events);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;
        }
        (LogFormat::Pretty, true) => {
            let fmt_layer = fmt::layer()
                .with_test_writer()
                .with_target(true)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_span_events(span_events);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;
        }
        (LogFormat::Compact, false) => {
            let fmt_layer = fmt::layer()
                .compact()
                .with_target(true)
                .with_span_events(span_events);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;
        }
        (LogFormat::Compact, true) => {
            let fmt_layer = fmt::layer()
                .compact()
                .with_test_writer()
                .with_target(true)
                .with_span_events(span_events);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;
        }
        (LogFormat::Json, _) => {
            let fmt_layer = fmt::layer().json().with_span_events(span_events);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;
        }
    }
    Ok(())
}

/// Install the global subscriber. A second call is a no-op.
pub fn init_logging(config: LogConfig) {
    if let Err(err) = try_init_logging(config) {
        tracing::debug!(%err, "logging already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(!config.include_location);
    }

    #[test]
    fn test_log_config_test_profile() {
        let config = LogConfig::test();
        assert_eq!(config.level, Level::WARN);
        assert!(config.test_writer);
    }

    #[test]
    fn test_log_config_with_filter() {
        let config = LogConfig::default().with_filter("headless_gl=debug");
        assert_eq!(config.filter.as_deref(), Some("headless_gl=debug"));
    }

    #[test]
    fn test_second_init_is_an_error() {
        let _ = try_init_logging(LogConfig::test());
        assert!(matches!(
            try_init_logging(LogConfig::test()),
            Err(LoggingError::AlreadyInitialized(_))
        ));
    }
}
