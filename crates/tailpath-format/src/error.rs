//! Error types for line formats and row reading.

use std::path::PathBuf;

use tailpath_layout::LayoutError;
use thiserror::Error;

/// Errors raised while validating formats or turning lines into rows.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The format or table configuration is incomplete or inconsistent.
    #[error("{message}")]
    Invalid { message: String },

    /// A grok layout or regular expression failed to compile.
    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// A delimited line could not be split into columns.
    #[error("delimited parse error: {0}")]
    Csv(#[from] csv::Error),

    /// The artifact could not be opened or read.
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line did not match the table's format.
    #[error("{path}:{line}: line does not match {format} format")]
    LineMismatch {
        path: PathBuf,
        line: u64,
        format: &'static str,
    },
}

impl FormatError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Check if this error only affects a single line.
    ///
    /// Row readers keep going after a line error; every other error ends
    /// the read.
    pub fn is_line_error(&self) -> bool {
        matches!(self, Self::LineMismatch { .. } | Self::Csv(_))
    }
}
