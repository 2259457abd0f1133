//! Core error types for focusroom-core.
//!
//! The session state machine itself has no failure modes: every command is a
//! total function over its state space. Errors here come from building a
//! session (validation), loading configuration, constructing tokio-backed
//! components, and from the external blocking collaborator.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for focusroom-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A tokio-backed component was created outside of a runtime.
    #[error("No async runtime available: {0}")]
    Runtime(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Home/config directory could not be prepared
    #[error("Configuration directory unavailable: {0}")]
    DirectoryUnavailable(String),
}

/// Validation errors for session values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Only flow sessions may be open-ended.
    #[error("focus duration must be greater than zero for {mode} sessions")]
    ZeroFocusDuration { mode: String },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Failures reported by the external app-blocking collaborator.
///
/// These are caught at the coordinator boundary and never reach the state
/// machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockingError {
    /// Screen-time authorization has not been granted.
    #[error("app blocking is not authorized")]
    Unauthorized,

    /// The platform rejected the blocking request.
    #[error("app blocking failed: {0}")]
    Platform(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_converts_into_core_error() {
        let err: CoreError = ValidationError::ZeroFocusDuration {
            mode: "pomodoro".into(),
        }
        .into();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(
            err.to_string(),
            "Validation error: focus duration must be greater than zero for pomodoro sessions"
        );
    }

    #[test]
    fn blocking_error_messages() {
        assert_eq!(
            BlockingError::Unauthorized.to_string(),
            "app blocking is not authorized"
        );
        assert_eq!(
            BlockingError::Platform("shield denied".into()).to_string(),
            "app blocking failed: shield denied"
        );
    }
}
