//! Error types for discovery operations.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while configuring or running an artifact source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Invalid source configuration.
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// The layout could not be parsed into concrete alternatives.
    #[error("Invalid layout pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// A layout or custom sub-pattern failed to compile.
    #[error("Failed to compile pattern '{pattern}': {message}")]
    PatternCompile { pattern: String, message: String },

    /// The artifact no longer exists.
    #[error("{name}: unable to obtain file info")]
    NotFound {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The artifact exists but cannot be read.
    #[error("{name}: unable to open file")]
    Unreadable {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SourceError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an error for a failed stat of an artifact.
    pub fn not_found(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        Self::NotFound {
            name: file_name(&path),
            path,
            source,
        }
    }

    /// Create an error for an artifact that could not be opened.
    pub fn unreadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        Self::Unreadable {
            name: file_name(&path),
            path,
            source,
        }
    }

    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(path, source),
            std::io::ErrorKind::PermissionDenied => Self::unreadable(path, source),
            _ => Self::Io { path, source },
        }
    }

    /// Whether this error aborts a whole discovery run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::InvalidPattern { .. } | Self::PatternCompile { .. }
        )
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Non-fatal failure encountered while walking one root path.
///
/// The walk of that root stops; other roots are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct TraversalError {
    /// Path where the failure occurred.
    pub path: PathBuf,
    /// Human-readable message, without operation prefix or OS error code.
    pub message: String,
}

impl TraversalError {
    /// Create a new traversal error.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a traversal error from an OS error.
    pub fn from_io(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        let path = path.into();
        let reason = strip_os_error_code(&error.to_string()).to_lowercase();
        Self {
            message: format!("{}: {reason}", path.display()),
            path,
        }
    }
}

/// Remove the trailing `(os error N)` that std appends to OS errors.
pub fn strip_os_error_code(message: &str) -> &str {
    match message.rfind(" (os error ") {
        Some(idx) if message.ends_with(')') => &message[..idx],
        _ => message,
    }
}
