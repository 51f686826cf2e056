//! Export pipeline error types.

use mediaforge_core::error::Error as CoreError;
use thiserror::Error;

/// Export pipeline error type.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Core error.
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Event delivered to a session that has already failed.
    #[error("Asset load session already failed: {0}")]
    SessionFailed(String),

    /// Load session aborted by the orchestrator.
    #[error("Load session aborted: {0}")]
    Aborted(String),

    /// Downstream consumer rejected a sample or format.
    #[error("Consumer error: {0}")]
    Consumer(String),
}

impl ExportError {
    /// Create a protocol violation error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        ExportError::Core(CoreError::Protocol(msg.into()))
    }

    /// Check if this error is a protocol violation.
    #[must_use]
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, ExportError::Core(CoreError::Protocol(_)))
    }
}

/// Export result type.
pub type Result<T> = std::result::Result<T, ExportError>;
