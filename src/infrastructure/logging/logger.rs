use anyhow::Result;
use std::io;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::domain::models::LoggingConfig;

/// Handle returned by [`init_logging`]
///
/// Keeps the non-blocking file writer alive; dropping it flushes any
/// buffered log lines. Hold it for the lifetime of the process.
pub struct LogHandle {
    _guard: Option<WorkerGuard>,
}

/// Initialize the global tracing subscriber from configuration
///
/// Stderr always gets a layer in the configured format, keeping stdout
/// free for command output. When `dir` is non-empty, a daily-rotated
/// JSON file layer is added alongside it so chain runs leave a
/// structured transcript on disk.
///
/// # Errors
/// Returns an error if the level string cannot be parsed.
pub fn init_logging(config: &LoggingConfig) -> Result<LogHandle> {
    let default_level = parse_log_level(&config.level)?;

    // EnvFilter is not Clone, so each layer builds its own.
    let env_filter = || {
        EnvFilter::builder()
            .with_default_directive(default_level.into())
            .from_env_lossy()
    };

    let guard = if config.dir.is_empty() {
        match config.format.as_str() {
            "json" => {
                let console_layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(io::stderr)
                    .with_current_span(true)
                    .with_target(true)
                    .with_filter(env_filter());

                tracing_subscriber::registry().with(console_layer).init();
            }
            _ => {
                let console_layer = tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(io::stderr)
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_filter(env_filter());

                tracing_subscriber::registry().with(console_layer).init();
            }
        }

        None
    } else {
        let file_appender = rolling::daily(&config.dir, "colloquy.log");
        let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

        // File output stays JSON regardless of the console format.
        let file_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(non_blocking_file)
            .with_ansi(false)
            .with_current_span(true)
            .with_target(true)
            .with_filter(env_filter());

        match config.format.as_str() {
            "json" => {
                let console_layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(io::stderr)
                    .with_current_span(true)
                    .with_target(true)
                    .with_filter(env_filter());

                tracing_subscriber::registry()
                    .with(file_layer)
                    .with(console_layer)
                    .init();
            }
            _ => {
                let console_layer = tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(io::stderr)
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_filter(env_filter());

                tracing_subscriber::registry()
                    .with(file_layer)
                    .with(console_layer)
                    .init();
            }
        }

        Some(guard)
    };

    tracing::info!(
        level = %config.level,
        format = %config.format,
        file_output = !config.dir.is_empty(),
        "logger initialized"
    );

    Ok(LogHandle { _guard: guard })
}

/// Parse log level string to Level
fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!("Invalid log level: {level}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert!(matches!(parse_log_level("trace"), Ok(Level::TRACE)));
        assert!(matches!(parse_log_level("debug"), Ok(Level::DEBUG)));
        assert!(matches!(parse_log_level("info"), Ok(Level::INFO)));
        assert!(matches!(parse_log_level("warn"), Ok(Level::WARN)));
        assert!(matches!(parse_log_level("error"), Ok(Level::ERROR)));
        assert!(matches!(parse_log_level("WARN"), Ok(Level::WARN)));
        assert!(parse_log_level("verbose").is_err());
    }

    #[test]
    fn test_init_console_only() {
        let config = LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
            dir: String::new(),
            retention_days: 30,
        };

        // Installs the global subscriber; no other test in this module
        // may call init_logging.
        let handle = init_logging(&config).expect("console-only init should succeed");
        assert!(handle._guard.is_none());
    }

    #[test]
    fn test_bad_level_is_rejected_before_install() {
        let config = LoggingConfig {
            level: "shouting".to_string(),
            format: "pretty".to_string(),
            dir: String::new(),
            retention_days: 30,
        };

        assert!(init_logging(&config).is_err());
    }
}
