//! Error types for DMARC attachment extraction.

use std::path::PathBuf;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Invalid disposition pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Errors that abort an extraction run (or the branch that raised them).
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Target directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("No matching attachment found in {}", source_file.display())]
    NoAttachmentFound { source_file: PathBuf },

    #[error("Unreadable archive {}: {reason}", path.display())]
    ArchiveFormat { path: PathBuf, reason: String },

    #[error("No route for staged file {}", path.display())]
    UnroutableAttachment { path: PathBuf },

    #[error("Refusing to write unsafe file name {name:?}")]
    UnsafeFileName { name: String },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExtractError {
    /// Wrap an IO error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn archive(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ArchiveFormat {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// A disposition header without a recoverable file name.
///
/// Recovered locally: the candidate is dropped and decoding continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilenameError {
    #[error("No filename parameter in disposition header")]
    MissingKey,

    #[error("Filename parameter has no alphabetic content")]
    Empty,

    #[error("Filename {0:?} escapes the target directory")]
    Unsafe(String),
}

/// Why a decompressed payload is not a DMARC aggregate report.
///
/// Recovered locally: the payload is omitted from the result.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Payload is not UTF-8: {0}")]
    NotUtf8(#[from] std::str::Utf8Error),

    #[error("Malformed XML: {0}")]
    Malformed(#[from] roxmltree::Error),

    #[error("Missing element <{0}>")]
    MissingElement(&'static str),

    #[error("Empty <org_name>")]
    EmptyOrgName,
}

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractError>;
