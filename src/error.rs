//! Custom error types for frame-key-sender.
//!
//! This module provides structured error types using `thiserror` for better
//! error handling and more informative error messages.

use std::io;
use thiserror::Error;

/// Main error type for frame-key-sender operations.
#[derive(Error, Debug)]
pub enum FksError {
    /// None of the configured target processes is currently running.
    #[error("no target process found (tried: {tried})")]
    ProcessNotFound { tried: String },

    /// A key name could not be resolved to a virtual-key code.
    #[error("cannot resolve key name '{key}'")]
    UnknownKey { key: String },

    /// A macro token did not match the token grammar.
    #[error("invalid macro token '{token}'")]
    InvalidToken { token: String },

    /// The frame-time source could not be opened or read.
    #[error("frame time source unavailable: {0}")]
    FrameSource(String),

    /// Error installing or running the keyboard hook.
    #[error("keyboard hook error: {0}")]
    Hook(String),

    /// Configuration validation error.
    #[error("configuration error: {0}")]
    ConfigValidation(String),

    /// Error reading or parsing configuration file.
    #[error("failed to load config from '{path}': {reason}")]
    ConfigLoad { path: String, reason: String },

    /// Error writing configuration file.
    #[error("failed to save config to '{path}': {reason}")]
    ConfigSave { path: String, reason: String },

    /// Error parsing duration string.
    #[error("invalid duration '{value}': {reason}")]
    InvalidDuration { value: String, reason: String },

    /// Platform-specific operation is not supported.
    #[error("operation not supported on this platform: {0}")]
    UnsupportedPlatform(String),

    /// Error adjusting the process priority class.
    #[error("failed to set process priority: {0}")]
    Priority(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for frame-key-sender operations.
pub type Result<T> = std::result::Result<T, FksError>;

impl FksError {
    /// Create a new ProcessNotFound error from the candidate list.
    pub fn process_not_found(candidates: &[String]) -> Self {
        Self::ProcessNotFound {
            tried: candidates.join(", "),
        }
    }

    /// Create a new UnknownKey error.
    pub fn unknown_key(key: impl Into<String>) -> Self {
        Self::UnknownKey { key: key.into() }
    }

    /// Create a new InvalidToken error.
    pub fn invalid_token(token: impl Into<String>) -> Self {
        Self::InvalidToken {
            token: token.into(),
        }
    }

    /// Create a new FrameSource error.
    pub fn frame_source(message: impl Into<String>) -> Self {
        Self::FrameSource(message.into())
    }

    /// Create a new Hook error.
    pub fn hook(message: impl Into<String>) -> Self {
        Self::Hook(message.into())
    }

    /// Create a new ConfigValidation error.
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation(message.into())
    }

    /// Create a new ConfigLoad error.
    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new ConfigSave error.
    pub fn config_save(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigSave {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new InvalidDuration error.
    pub fn invalid_duration(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDuration {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a new UnsupportedPlatform error.
    pub fn unsupported_platform(message: impl Into<String>) -> Self {
        Self::UnsupportedPlatform(message.into())
    }

    /// Create a new Priority error.
    pub fn priority(message: impl Into<String>) -> Self {
        Self::Priority(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FksError::process_not_found(&["GTA5.exe".to_string(), "game.exe".to_string()]);
        assert_eq!(
            err.to_string(),
            "no target process found (tried: GTA5.exe, game.exe)"
        );

        let err = FksError::unknown_key("xyz");
        assert_eq!(err.to_string(), "cannot resolve key name 'xyz'");

        let err = FksError::invalid_token("m  down");
        assert_eq!(err.to_string(), "invalid macro token 'm  down'");

        let err = FksError::config_validation("target_processes cannot be empty");
        assert_eq!(
            err.to_string(),
            "configuration error: target_processes cannot be empty"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let fks_err: FksError = io_err.into();
        assert!(matches!(fks_err, FksError::Io(_)));
    }

    #[test]
    fn test_frame_source_error_display() {
        let err = FksError::frame_source("could not open RTSS shared memory");
        assert!(err.to_string().contains("frame time source unavailable"));
        assert!(err.to_string().contains("RTSS"));
    }
}
