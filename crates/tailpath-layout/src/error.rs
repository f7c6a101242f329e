//! Error types for layout expansion and grok compilation.

use tailpath_core::SourceError;
use thiserror::Error;

/// Errors raised while expanding or compiling a pattern.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// The pattern text is structurally malformed.
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// A `%{NAME}` token refers to a pattern that is not registered.
    #[error("unknown grok pattern '%{{{name}}}' in '{pattern}'")]
    UnknownPattern { name: String, pattern: String },

    /// A named pattern refers to itself, directly or indirectly.
    #[error("grok pattern '{name}' is recursive")]
    RecursivePattern { name: String },

    /// The expanded regular expression failed to compile.
    #[error("failed to compile '{pattern}': {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl LayoutError {
    pub(crate) fn invalid(pattern: &str, message: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            message: message.into(),
        }
    }

    /// The pattern text this error refers to.
    pub fn pattern(&self) -> &str {
        match self {
            Self::InvalidPattern { pattern, .. }
            | Self::UnknownPattern { pattern, .. }
            | Self::Regex { pattern, .. } => pattern,
            Self::RecursivePattern { name } => name,
        }
    }
}

impl From<LayoutError> for SourceError {
    fn from(err: LayoutError) -> Self {
        match err {
            LayoutError::InvalidPattern { pattern, message } => {
                SourceError::InvalidPattern { pattern, message }
            }
            other => SourceError::PatternCompile {
                pattern: other.pattern().to_string(),
                message: other.to_string(),
            },
        }
    }
}
