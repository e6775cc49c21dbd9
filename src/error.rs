//! Unified error handling for the comet-scraper crate
//!
//! Domain-specific errors ([`DriverError`], [`StoreError`]) live next to the
//! code that produces them; this module wraps them into a single [`Error`]
//! enum usable across module boundaries. The delivery layer matches [`Error`]
//! variants directly for its HTTP status mapping; [`ErrorCategory`] is the
//! coarser classification for logging and handling strategies.

use std::io;
use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::driver::DriverError;
pub use crate::store::StoreError;

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Page-automation driver errors (navigation, waits, element lookup)
    Driver,
    /// Persistent store errors
    Storage,
    /// Cache errors
    Cache,
    /// Malformed request input
    Validation,
    /// Unknown session ID
    NotFound,
    /// Configuration and startup errors
    Config,
    /// Other/unknown errors
    Other,
}

/// Unified error type for the comet-scraper crate
#[derive(Error, Debug)]
pub enum Error {
    /// Page driver errors, treated uniformly as infrastructure failures
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Persistent store errors other than a missing record
    #[error("Store error: {0}")]
    Store(StoreError),

    /// Session ID unknown to the store
    #[error("Session not found")]
    NotFound,

    /// Malformed request input; field name and reason
    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// I/O errors (selector schema file, sockets)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error for one field
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get the error category for handling strategies
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Driver(_) => ErrorCategory::Driver,
            Self::Store(_) => ErrorCategory::Storage,
            Self::NotFound => ErrorCategory::NotFound,
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::Config(_) => ErrorCategory::Config,
            Self::Io(_) => ErrorCategory::Storage,
            Self::Json(_) => ErrorCategory::Other,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

// A missing record is its own variant so the read path can report it
// synchronously; everything else from the store is an internal failure.
impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound,
            other => Self::Store(other),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: err.to_string(),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
