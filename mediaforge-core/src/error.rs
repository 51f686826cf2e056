//! Error types for the Mediaforge library.
//!
//! This module provides the error hierarchy shared by all components of the library.

use thiserror::Error;

/// Main error type for the Mediaforge library.
#[derive(Error, Debug)]
pub enum Error {
    /// Container format errors (parsing/demuxing).
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration rejected at build time.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unsupported feature or format.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Callback protocol violated (event observed out of order).
    #[error("Protocol violation: {0}")]
    Protocol(String),
}

/// Container format errors.
#[derive(Error, Debug)]
pub enum ContainerError {
    /// Invalid or corrupted container structure.
    #[error("Invalid container structure: {0}")]
    InvalidStructure(String),

    /// Unknown or unrecognizable container format.
    #[error("Unknown container format")]
    UnknownFormat,

    /// Missing required atom/box/element.
    #[error("Missing required element: {0}")]
    MissingElement(String),

    /// Invalid atom/box size.
    #[error("Invalid element size at offset {offset}: {message}")]
    InvalidSize { offset: u64, message: String },

    /// Generic container error message.
    #[error("{0}")]
    Other(String),
}

impl From<String> for ContainerError {
    fn from(s: String) -> Self {
        ContainerError::Other(s)
    }
}

impl From<&str> for ContainerError {
    fn from(s: &str) -> Self {
        ContainerError::Other(s.to_string())
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create an unsupported error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Error::Unsupported(msg.into())
    }

    /// Check if this error indicates a malformed container.
    #[must_use]
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Error::Container(_) | Error::Io(_))
    }

    /// Check if this error indicates a readable but wrong container type.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::Unsupported(_))
    }
}
