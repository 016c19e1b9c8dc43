//! Logging utilities for CLI commands and the host

use std::path::PathBuf;

use editbridge::config::Config;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE_NAME: &str = "editbridge.log";

/// Directory host log files are written to
pub fn log_dir() -> PathBuf {
  editbridge::dirs::default_data_dir()
}

/// Initialize logging for CLI commands (stderr only).
///
/// Defaults to warnings so helper output stays clean; `RUST_LOG` overrides.
pub fn init_cli_logging() {
  let env_filter = EnvFilter::builder()
    .with_default_directive(tracing::Level::WARN.into())
    .from_env_lossy();

  tracing_subscriber::fmt()
    .with_env_filter(env_filter)
    .with_writer(std::io::stderr)
    .init();
}

/// Parse log level from config string
fn parse_log_level(level: &str) -> tracing_subscriber::filter::LevelFilter {
  use tracing_subscriber::filter::LevelFilter;

  match level.to_lowercase().as_str() {
    "off" => LevelFilter::OFF,
    "error" => LevelFilter::ERROR,
    "warn" => LevelFilter::WARN,
    "info" => LevelFilter::INFO,
    "debug" => LevelFilter::DEBUG,
    "trace" => LevelFilter::TRACE,
    _ => LevelFilter::INFO,
  }
}

/// Initialize logging for the host with config-driven settings.
///
/// On the console: colored output to stderr.
/// With `log_file`: rolling file in the data directory (no ANSI).
///
/// Returns the guard that must be kept alive for the duration of the program
pub fn init_host_logging(log_file: bool) -> Option<WorkerGuard> {
  let config = Config::load();
  let level = parse_log_level(&config.log.level);

  // Build env filter (allows RUST_LOG override)
  let env_filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

  if !log_file {
    tracing_subscriber::fmt()
      .with_env_filter(env_filter)
      .with_target(true)
      .with_ansi(true)
      .with_writer(std::io::stderr)
      .init();
    return None;
  }

  let log_dir = log_dir();
  if std::fs::create_dir_all(&log_dir).is_err() {
    // Fall back to console-only logging
    init_cli_logging();
    return None;
  }

  let file_appender = match config.log.rotation.as_str() {
    "hourly" => tracing_appender::rolling::hourly(&log_dir, LOG_FILE_NAME),
    "never" => tracing_appender::rolling::never(&log_dir, LOG_FILE_NAME),
    _ => tracing_appender::rolling::daily(&log_dir, LOG_FILE_NAME),
  };

  let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

  tracing_subscriber::fmt()
    .with_env_filter(env_filter)
    .with_target(true)
    .with_ansi(false)
    .with_writer(file_writer)
    .init();

  Some(guard)
}
