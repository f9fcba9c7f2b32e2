//! Writer error types

use thiserror::Error;

/// Writer-specific errors
#[derive(Debug, Error)]
pub enum WriterError {
    /// Destination writer creation error
    #[error("failed to start writer for destination '{name}': {message}")]
    WriterCreation { name: String, message: String },

    /// Contract error (from the sink capability)
    #[error("contract error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl WriterError {
    /// Create a writer creation error
    pub fn writer_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WriterCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
