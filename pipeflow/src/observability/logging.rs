//! Subscriber setup for applications embedding pipeflow.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How [`init_tracing`] formats and filters log records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub filter: String,
    /// Emit one JSON object per record instead of human-readable lines.
    pub json: bool,
    /// Include the record's target module.
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
            with_target: true,
        }
    }
}

impl LoggingConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the filter directives.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Switches JSON output on or off.
    #[must_use]
    pub const fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Resolves the filter: `RUST_LOG` wins, then the configured directives.
    pub fn env_filter(&self) -> Result<EnvFilter, ConfigError> {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.filter))
            .map_err(|e| ConfigError::log_filter(&self.filter, e))
    }
}

/// Installs a global `tracing` subscriber.
///
/// Returns `Ok(false)` if a global subscriber was already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<bool, ConfigError> {
    let filter = config.env_filter()?;

    let installed = if config.json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_target(config.with_target))
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(config.with_target))
            .with(filter)
            .try_init()
    };

    Ok(installed.is_ok())
}
