//! Error types for the image layer.

use std::path::PathBuf;
use tapir_resolver::ResolutionFailure;
use thiserror::Error;

/// Errors raised while querying a repository.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    /// The location does not name a usable repository.
    #[error("repository '{location}' is unavailable: {message}")]
    Unavailable {
        /// Repository location.
        location: String,
        /// Error message.
        message: String,
    },
    /// The query did not finish in time.
    #[error("repository '{location}' timed out after {secs}s")]
    Timeout {
        /// Repository location.
        location: String,
        /// Timeout in seconds.
        secs: u64,
    },
    /// The query failed.
    #[error("query against '{location}' failed: {message}")]
    Query {
        /// Repository location.
        location: String,
        /// Error message.
        message: String,
    },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read config file {path}: {message}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
    },
    /// The configuration file is not valid JSON for the config schema.
    #[error("invalid config file {path}: {message}")]
    Parse {
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
    },
    /// A setting has an unusable value.
    #[error("invalid value '{value}' for {key}")]
    InvalidValue {
        /// Setting or variable name.
        key: String,
        /// Offending value.
        value: String,
    },
}

/// Errors returned by [`crate::ImageBuilder`].
#[derive(Debug, Error)]
pub enum ImageError {
    /// No consistent package set exists.
    #[error("image cannot be resolved: {message}")]
    Unresolvable {
        /// Structured failure.
        failure: ResolutionFailure,
        /// Human-readable description.
        message: String,
    },
    /// Resolution was cancelled or timed out.
    #[error("image resolution cancelled")]
    Cancelled,
    /// Repository error.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    /// Parse error in request data.
    #[error(transparent)]
    Core(#[from] tapir_core::Error),
    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The request is structurally invalid.
    #[error("invalid image request: {0}")]
    InvalidRequest(String),
    /// The resolver thread panicked or was aborted.
    #[error("resolver task failed: {0}")]
    Join(String),
}

impl ImageError {
    /// The resolution failure, when the image was unresolvable.
    #[must_use]
    pub const fn failure(&self) -> Option<&ResolutionFailure> {
        match self {
            Self::Unresolvable { failure, .. } => Some(failure),
            _ => None,
        }
    }
}

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, ImageError>;
