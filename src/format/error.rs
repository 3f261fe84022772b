//! Error types for dataset file operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing dataset files.
#[derive(Error, Debug)]
pub enum FormatError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing or serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Image decoding or encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Invalid format structure or content
    #[error("Invalid format: {message}")]
    InvalidFormat {
        /// Description of the format error
        message: String,
    },

    /// Class name already present in the taxonomy
    #[error("Class '{name}' already exists")]
    DuplicateClass {
        /// The rejected name
        name: String,
    },

    /// Class name not present in the taxonomy
    #[error("Class '{name}' not found")]
    UnknownClass {
        /// The name that was looked up
        name: String,
    },

    /// A dataset directory that must exist is absent
    #[error("Missing directory: {path:?}")]
    MissingDirectory {
        /// Path where the directory was expected
        path: PathBuf,
    },
}

impl FormatError {
    /// Create an invalid format error with a message.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Create a duplicate class error.
    pub fn duplicate_class(name: impl Into<String>) -> Self {
        Self::DuplicateClass { name: name.into() }
    }

    /// Create an unknown class error.
    pub fn unknown_class(name: impl Into<String>) -> Self {
        Self::UnknownClass { name: name.into() }
    }
}
