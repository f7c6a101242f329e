use serde::{Deserialize, Serialize};
use tailpath_layout::GrokPattern;

use crate::error::FormatError;
use crate::mapper::PatternMapper;

/// Lines parsed with a plain regular expression; named groups become fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexFormat {
    pub layout: String,
}

impl RegexFormat {
    pub fn new(layout: impl Into<String>) -> Self {
        Self {
            layout: layout.into(),
        }
    }

    pub fn validate(&self) -> Result<(), FormatError> {
        let mapper = self.mapper()?;
        if mapper.pattern().field_names().is_empty() {
            return Err(FormatError::invalid(format!(
                "regex format '{}' has no named groups",
                self.layout
            )));
        }
        Ok(())
    }

    pub fn mapper(&self) -> Result<PatternMapper, FormatError> {
        if self.layout.is_empty() {
            return Err(FormatError::invalid("regex format requires a layout"));
        }
        Ok(PatternMapper::new(GrokPattern::from_regex(&self.layout)?))
    }
}
