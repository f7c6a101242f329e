//! Line format configurations.

mod custom;
mod delimited;
mod grok;
mod regex;

pub use custom::CustomFormat;
pub use delimited::DelimitedFormat;
pub use grok::GrokFormat;
pub use regex::RegexFormat;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::FormatError;
use crate::mapper::LineMapper;

/// The kinds of line format, named by their identifiers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr, AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum FormatKind {
    Grok,
    Custom,
    Regex,
    Delimited,
}

/// How each line of an artifact is parsed.
///
/// Deserializes from a table tagged by `type`:
///
/// ```toml
/// type = "grok"
/// layout = "%{COMMONAPACHELOG}"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LineFormat {
    Grok(GrokFormat),
    Custom(CustomFormat),
    Regex(RegexFormat),
    Delimited(DelimitedFormat),
}

impl LineFormat {
    pub fn kind(&self) -> FormatKind {
        match self {
            Self::Grok(_) => FormatKind::Grok,
            Self::Custom(_) => FormatKind::Custom,
            Self::Regex(_) => FormatKind::Regex,
            Self::Delimited(_) => FormatKind::Delimited,
        }
    }

    /// The format identifier, such as `grok` or `delimited`.
    pub fn identifier(&self) -> &'static str {
        self.kind().into()
    }

    /// Check the format can build a mapper.
    pub fn validate(&self) -> Result<(), FormatError> {
        match self {
            Self::Grok(format) => format.validate(),
            Self::Custom(format) => format.validate(),
            Self::Regex(format) => format.validate(),
            Self::Delimited(format) => format.validate(),
        }
    }

    /// Build a fresh mapper for one artifact.
    pub fn mapper(&self) -> Result<Box<dyn LineMapper>, FormatError> {
        Ok(match self {
            Self::Grok(format) => Box::new(format.mapper()?),
            Self::Custom(format) => Box::new(format.mapper()?),
            Self::Regex(format) => Box::new(format.mapper()?),
            Self::Delimited(format) => Box::new(format.mapper()?),
        })
    }
}

impl From<GrokFormat> for LineFormat {
    fn from(format: GrokFormat) -> Self {
        Self::Grok(format)
    }
}

impl From<CustomFormat> for LineFormat {
    fn from(format: CustomFormat) -> Self {
        Self::Custom(format)
    }
}

impl From<RegexFormat> for LineFormat {
    fn from(format: RegexFormat) -> Self {
        Self::Regex(format)
    }
}

impl From<DelimitedFormat> for LineFormat {
    fn from(format: DelimitedFormat) -> Self {
        Self::Delimited(format)
    }
}
