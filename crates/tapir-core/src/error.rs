//! Error types for Tapir core parsing.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for core types.
#[derive(Error, Debug)]
pub enum Error {
    /// Version string is not `major.minor.patch[-prerelease][+build]`.
    #[error("invalid version '{input}'")]
    InvalidVersion {
        /// The offending string.
        input: String,
    },

    /// Version specifier string could not be parsed.
    #[error("invalid version specifier '{input}'")]
    InvalidSpecifier {
        /// The offending string.
        input: String,
    },

    /// Unknown CPU architecture name.
    #[error("invalid architecture '{input}'")]
    InvalidArchitecture {
        /// The offending string.
        input: String,
    },

    /// Invalid image request.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// JSON error.
    #[error("json error: {0}")]
    Json(#[from] sonic_rs::Error),

    /// IO error.
    #[error("io error at {path}: {message}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
    },
}

impl Error {
    /// Create an IO error with context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn version(input: &str) -> Self {
        Self::InvalidVersion {
            input: input.to_string(),
        }
    }

    pub(crate) fn specifier(input: &str) -> Self {
        Self::InvalidSpecifier {
            input: input.to_string(),
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;
