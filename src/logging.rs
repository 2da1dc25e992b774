//! Structured logging setup

use std::env;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "running_plan_lib=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Pretty,
  Compact,
  Json,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
  /// `EnvFilter` directives, e.g. `running_plan_lib=debug`
  pub filter: String,
  pub format: LogFormat,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      filter: DEFAULT_FILTER.into(),
      format: LogFormat::Pretty,
    }
  }
}

impl LoggingConfig {
  pub fn from_env() -> Self {
    let filter = env::var("RUST_LOG")
      .ok()
      .filter(|value| !value.trim().is_empty())
      .unwrap_or_else(|| DEFAULT_FILTER.into());

    let format = match env::var("RUNNING_PLAN_LOG_FORMAT")
      .unwrap_or_default()
      .to_ascii_lowercase()
      .as_str()
    {
      "json" => LogFormat::Json,
      "compact" => LogFormat::Compact,
      _ => LogFormat::Pretty,
    };

    Self { filter, format }
  }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(config: &LoggingConfig) {
  let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
  let registry = tracing_subscriber::registry().with(filter);

  let result = match config.format {
    LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
    LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
  };

  if result.is_ok() {
    tracing::debug!(filter = %config.filter, format = ?config.format, "Logging initialised");
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  #[serial]
  fn test_from_env_defaults() {
    temp_env::with_vars(
      [("RUST_LOG", None::<&str>), ("RUNNING_PLAN_LOG_FORMAT", None)],
      || {
        let config = LoggingConfig::from_env();
        assert_eq!(config.filter, DEFAULT_FILTER);
        assert_eq!(config.format, LogFormat::Pretty);
      },
    );
  }

  #[test]
  #[serial]
  fn test_from_env_reads_format_and_filter() {
    temp_env::with_vars(
      [
        ("RUST_LOG", Some("running_plan_lib=debug")),
        ("RUNNING_PLAN_LOG_FORMAT", Some("JSON")),
      ],
      || {
        let config = LoggingConfig::from_env();
        assert_eq!(config.filter, "running_plan_lib=debug");
        assert_eq!(config.format, LogFormat::Json);
      },
    );
  }

  #[test]
  fn test_init_logging_twice_is_harmless() {
    let config = LoggingConfig::default();
    init_logging(&config);
    init_logging(&config);
  }
}
