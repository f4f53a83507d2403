//! Tracing subscriber setup for the `yarn-prune` binary.

use std::io;

use tracing::Level;
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum LogFormat {
  /// Multi-line human readable output
  Pretty,
  /// Single line per event
  #[default]
  Compact,
  /// One JSON object per event
  Json,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum LogLevel {
  Trace,
  Debug,
  Info,
  #[default]
  Warn,
  Error,
}

impl From<LogLevel> for Level {
  fn from(level: LogLevel) -> Self {
    match level {
      LogLevel::Trace => Self::TRACE,
      LogLevel::Debug => Self::DEBUG,
      LogLevel::Info => Self::INFO,
      LogLevel::Warn => Self::WARN,
      LogLevel::Error => Self::ERROR,
    }
  }
}

/// Install the global subscriber. `RUST_LOG` overrides `level` when set.
pub fn init(level: LogLevel, format: LogFormat) -> miette::Result<()> {
  let env_filter = EnvFilter::try_from_default_env()
    .or_else(|_| {
      let level = Level::from(level).to_string().to_ascii_lowercase();
      EnvFilter::try_new(format!("yarn_prune={level},prune_core={level}"))
    })
    .map_err(|e| miette::miette!("failed to create tracing filter: {e}"))?;

  let registry = tracing_subscriber::registry().with(env_filter);

  match format {
    LogFormat::Pretty => {
      let layer = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(io::stderr)
        .with_target(true);
      registry.with(layer).init();
    }
    LogFormat::Compact => {
      let layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(io::stderr)
        .with_target(false);
      registry.with(layer).init();
    }
    LogFormat::Json => {
      let layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(io::stderr)
        .with_current_span(true)
        .with_span_list(true);
      registry.with(layer).init();
    }
  }

  Ok(())
}
