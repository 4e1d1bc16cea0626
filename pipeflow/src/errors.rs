//! Error types for the pipeflow crate.
//!
//! The core recognises very few failure modes. Invalid configuration is
//! reported when a stage is constructed, never mid-stream. Per-element
//! failures belong to caller-supplied stages, routing misses are silent and
//! cancellation is a clean, partial termination rather than an error.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub use tokio::sync::mpsc::error::{SendError, TrySendError};

/// The main error type for pipeflow operations.
#[derive(Debug, Error)]
pub enum PipeflowError {
    /// A stage or combinator was configured with an unusable value.
    #[error("{0}")]
    InvalidConfig(#[from] ConfigError),

    /// A background task panicked or returned an error.
    #[error("Task '{name}' failed: {reason}")]
    TaskFailed {
        /// The task name.
        name: String,
        /// What went wrong.
        reason: String,
    },
}

impl PipeflowError {
    /// Creates a task failure error.
    #[must_use]
    pub fn task_failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TaskFailed {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if this error came from construction-time validation.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::InvalidConfig(_))
    }
}

/// Error raised when a stage is constructed with an invalid configuration.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ConfigError {
    /// Stable error code (e.g., "CONFIG-PARALLEL-SIZE").
    pub code: String,
    /// Human readable message.
    pub message: String,
    /// Hint for fixing the configuration.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Error for a parallel worker count below one.
    #[must_use]
    pub fn parallel_size(size: usize) -> Self {
        Self::new(
            codes::PARALLEL_SIZE,
            format!("parallelize size must be greater than 0, got {size}"),
        )
        .with_fix_hint("Use a worker count of at least 1; a count of 1 disables replication.")
        .with_context_entry("size", size.to_string())
    }

    /// Error for a chunk size below one.
    #[must_use]
    pub fn chunk_size(size: usize) -> Self {
        Self::new(
            codes::CHUNK_SIZE,
            format!("chunk size must be greater than 0, got {size}"),
        )
        .with_fix_hint("Use a chunk size of at least 1.")
        .with_context_entry("size", size.to_string())
    }

    /// Error for a tracing filter directive that does not parse.
    #[must_use]
    pub fn log_filter(filter: &str, reason: impl std::fmt::Display) -> Self {
        Self::new(codes::LOG_FILTER, format!("invalid log filter '{filter}': {reason}"))
            .with_fix_hint("Use EnvFilter directives such as \"info\" or \"pipeflow=debug\".")
            .with_context_entry("filter", filter)
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("code".to_string(), serde_json::json!(self.code));
        map.insert("message".to_string(), serde_json::json!(self.message));
        if let Some(ref hint) = self.fix_hint {
            map.insert("fix_hint".to_string(), serde_json::json!(hint));
        }
        if !self.context.is_empty() {
            map.insert("context".to_string(), serde_json::json!(self.context));
        }
        map
    }
}

/// Stable configuration error codes.
pub mod codes {
    /// Parallel worker count below one.
    pub const PARALLEL_SIZE: &str = "CONFIG-PARALLEL-SIZE";
    /// Chunk size below one.
    pub const CHUNK_SIZE: &str = "CONFIG-CHUNK-SIZE";
    /// Unparseable tracing filter.
    pub const LOG_FILTER: &str = "CONFIG-LOG-FILTER";
}

/// Convenience result alias.
pub type Result<T, E = PipeflowError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_creation() {
        let err = ConfigError::new("TEST-001", "Test error")
            .with_fix_hint("Fix this by doing that")
            .with_context_entry("stage", "batch");

        assert_eq!(err.code, "TEST-001");
        assert_eq!(err.to_string(), "Test error");
        assert_eq!(err.fix_hint, Some("Fix this by doing that".to_string()));
        assert_eq!(err.context.get("stage"), Some(&"batch".to_string()));
    }

    #[test]
    fn test_parallel_size_error() {
        let err = ConfigError::parallel_size(0);
        assert_eq!(err.code, codes::PARALLEL_SIZE);
        assert!(err.to_string().contains("greater than 0"));

        let dict = err.to_dict();
        assert_eq!(dict.get("code").unwrap(), codes::PARALLEL_SIZE);
        assert_eq!(dict["context"]["size"], "0");
    }

    #[test]
    fn test_pipeflow_error_from_config() {
        let err: PipeflowError = ConfigError::chunk_size(0).into();
        assert!(err.is_config());
        assert!(err.to_string().contains("chunk size"));
    }

    #[test]
    fn test_task_failed_display() {
        let err = PipeflowError::task_failed("worker-1", "panicked");
        assert_eq!(err.to_string(), "Task 'worker-1' failed: panicked");
        assert!(!err.is_config());
    }
}
