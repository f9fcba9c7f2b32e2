//! Layered error definitions
//!
//! Categorized by source: config / connection / streaming / serialization / cancellation

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Backend Errors =====
    /// Failed to open a backend connection
    #[error("connection error for destination '{destination}': {message}")]
    Connection {
        destination: String,
        message: String,
    },

    /// Batch-level streaming failure (write/commit/begin); retriable
    #[error("streaming error for destination '{destination}': {message}")]
    Streaming {
        destination: String,
        message: String,
    },

    /// Record-level serialization failure; never retried
    #[error("serialization error: {message}")]
    Serialization { message: String },

    // ===== Lifecycle =====
    /// Shutdown signal observed mid-operation; unwinds without retry
    #[error("operation cancelled by shutdown")]
    Cancelled,

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create connection error
    pub fn connection(destination: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            destination: destination.into(),
            message: message.into(),
        }
    }

    /// Create streaming error
    pub fn streaming(destination: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Streaming {
            destination: destination.into(),
            message: message.into(),
        }
    }

    /// Create serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Record-level serialization class; logged and swallowed by the writer
    pub fn is_serialization(&self) -> bool {
        matches!(self, Self::Serialization { .. })
    }

    /// Cancellation class; propagates out of retry loops without further attempts
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(ContractError::serialization("bad field").is_serialization());
        assert!(!ContractError::streaming("orders", "broken pipe").is_serialization());
        assert!(ContractError::Cancelled.is_cancelled());
        assert!(!ContractError::connection("orders", "refused").is_cancelled());
    }

    #[test]
    fn test_error_display() {
        let err = ContractError::streaming("orders", "broken pipe");
        assert_eq!(
            err.to_string(),
            "streaming error for destination 'orders': broken pipe"
        );
    }
}
