use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while running a guard hook.
///
/// Hooks never turn these into a block: the dispatcher logs them and lets
/// the tool call through.
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to load config {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` timed out after {timeout_ms}ms")]
    Timeout { program: String, timeout_ms: u64 },

    #[error("unknown hook: {0}")]
    UnknownHook(String),
}

impl GuardError {
    pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        GuardError::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    /// True when the external tool could not be found or did not finish.
    pub fn is_tool_unavailable(&self) -> bool {
        matches!(self, GuardError::Spawn { .. } | GuardError::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, GuardError>;
