//! Error types and handling for Metron
//!
//! This module defines the error types used throughout the application,
//! providing consistent error handling and reporting.

use thiserror::Error;

/// Result type alias for Metron operations
pub type Result<T> = std::result::Result<T, MetronError>;

/// Main error type for Metron
#[derive(Debug, Error)]
pub enum MetronError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Authentication/authorization errors (bad credentials, rejected token)
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// Metering API errors (non-success responses, malformed payloads)
    #[error("API error: {message}")]
    Api { message: String },

    /// Network-related errors
    #[error("Network error: {message}")]
    Network { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Generic errors with context
    #[error("Error: {message}")]
    Generic { message: String },
}

impl MetronError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        MetronError::Config {
            message: message.into(),
        }
    }

    /// Create a new auth error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        MetronError::Auth {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        MetronError::Api {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        MetronError::Network {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        MetronError::Io {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        MetronError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        MetronError::Generic {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for MetronError {
    fn from(err: std::io::Error) -> Self {
        MetronError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for MetronError {
    fn from(err: serde_yaml::Error) -> Self {
        MetronError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for MetronError {
    fn from(err: serde_json::Error) -> Self {
        MetronError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for MetronError {
    fn from(err: reqwest::Error) -> Self {
        MetronError::network(err.to_string())
    }
}

impl From<chrono::ParseError> for MetronError {
    fn from(err: chrono::ParseError) -> Self {
        MetronError::validation("datetime", &err.to_string())
    }
}
