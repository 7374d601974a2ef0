//! Unified error handling for the autopost crate
//!
//! Domain-specific errors live next to their modules (`SelectError`,
//! `PublishError`, `SourceError`); this module wraps them into a single
//! `Error` enum for use across module boundaries, with a coarse category
//! and a recoverability hint for the per-tick handling policy. Nothing in
//! the engine is fatal to the process: every variant is recovered locally
//! by logging and skipping the affected account until its next due tick.

use std::io;
use thiserror::Error;

pub use crate::publisher::PublishError;
pub use crate::selector::SelectError;
pub use crate::source::SourceError;

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Candidate selection outcomes (empty stages, consistency defects)
    Selection,
    /// Publish transport and throttling
    Publishing,
    /// Store and I/O
    Storage,
    /// Configuration and validation
    Config,
    /// Other/unknown
    Other,
}

/// Unified error type for the autopost crate
#[derive(Error, Debug)]
pub enum Error {
    /// Candidate selection errors
    #[error("selection error: {0}")]
    Select(#[from] SelectError),

    /// Publish transport errors, including throttling
    #[error("publish error: {0}")]
    Publish(#[from] PublishError),

    /// Store errors
    #[error("store error: {0}")]
    Source(#[from] SourceError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration errors
    #[error("config error: {0}")]
    Config(String),

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

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Get the error category for handling strategies
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Select(_) => ErrorCategory::Selection,
            Self::Publish(_) | Self::Http(_) => ErrorCategory::Publishing,
            Self::Source(_) | Self::Io(_) => ErrorCategory::Storage,
            Self::Json(_) => ErrorCategory::Storage,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }

    /// Whether the same attempt is expected to succeed on a later tick
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Empty stages clear as the backlog ages; a consistency defect
            // needs operator attention first
            Self::Select(e) => !e.is_defect(),
            Self::Publish(e) => !matches!(e, PublishError::DryRun),
            Self::Source(_) | Self::Io(_) | Self::Http(_) => true,
            Self::Json(_) | Self::Config(_) | Self::Other { .. } => false,
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
