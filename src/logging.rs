//! Logging setup.
//!
//! The console owns the terminal, so TUI mode writes to
//! `<state>/logs/backoffice-{timestamp}.log`. Every other command logs to stderr.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

/// Keep alive until exit so buffered lines reach the file
pub struct LoggingHandle {
    pub _guard: Option<WorkerGuard>,
    /// Set only when logging to a file
    pub log_file_path: Option<PathBuf>,
}

/// Where log output goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    File,
    Stderr,
}

impl LogTarget {
    pub fn choose(config: &Config, is_tui_mode: bool) -> Self {
        if is_tui_mode && config.logging.to_file {
            LogTarget::File
        } else {
            LogTarget::Stderr
        }
    }
}

pub fn log_file_name(now: DateTime<Utc>) -> String {
    format!("backoffice-{}.log", now.format("%Y%m%dT%H%M%SZ"))
}

/// `RUST_LOG` wins, then `--debug`, then the configured level
fn filter_directive(config: &Config, debug_override: bool, rust_log: Option<String>) -> String {
    match rust_log {
        Some(directive) if !directive.trim().is_empty() => directive,
        _ if debug_override => "debug".to_string(),
        _ => config.logging.level.clone(),
    }
}

pub fn init_logging(
    config: &Config,
    is_tui_mode: bool,
    debug_override: bool,
) -> Result<LoggingHandle> {
    let directive = filter_directive(config, debug_override, std::env::var("RUST_LOG").ok());
    let filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("Invalid log filter '{}'", directive))?;

    match LogTarget::choose(config, is_tui_mode) {
        LogTarget::File => {
            let logs_dir = config.logs_path();
            std::fs::create_dir_all(&logs_dir)
                .with_context(|| format!("Failed to create {}", logs_dir.display()))?;

            let log_filename = log_file_name(Utc::now());
            let log_file_path = logs_dir.join(&log_filename);

            let file_appender = tracing_appender::rolling::never(&logs_dir, &log_filename);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(non_blocking),
                )
                .init();

            Ok(LoggingHandle {
                _guard: Some(guard),
                log_file_path: Some(log_file_path),
            })
        }
        LogTarget::Stderr => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(false)
                        .with_writer(std::io::stderr),
                )
                .init();

            Ok(LoggingHandle {
                _guard: None,
                log_file_path: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.paths.state = temp_dir.path().to_string_lossy().to_string();
        config
    }

    #[test]
    fn test_logs_live_under_state() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let logs_dir = config.logs_path();
        assert!(logs_dir.ends_with("logs"));
        assert!(logs_dir.starts_with(temp_dir.path()));
    }

    #[test]
    fn test_log_file_name() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 5).unwrap();
        assert_eq!(log_file_name(at), "backoffice-20260301T093005Z.log");
    }

    #[test]
    fn test_target_selection() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&temp_dir);

        assert_eq!(LogTarget::choose(&config, true), LogTarget::File);
        assert_eq!(LogTarget::choose(&config, false), LogTarget::Stderr);

        config.logging.to_file = false;
        assert_eq!(LogTarget::choose(&config, true), LogTarget::Stderr);
    }

    #[test]
    fn test_filter_precedence() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&temp_dir);
        config.logging.level = "warn".into();

        assert_eq!(filter_directive(&config, false, None), "warn");
        assert_eq!(filter_directive(&config, true, None), "debug");
        assert_eq!(
            filter_directive(&config, true, Some("backoffice=trace".into())),
            "backoffice=trace"
        );
        assert_eq!(filter_directive(&config, false, Some("  ".into())), "warn");
    }
}
