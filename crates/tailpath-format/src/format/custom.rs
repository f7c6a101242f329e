use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tailpath_layout::GrokRegistry;

use crate::error::FormatError;
use crate::mapper::PatternMapper;

/// A user-defined layout that must describe the whole line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFormat {
    pub layout: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub patterns: IndexMap<String, String>,
}

impl CustomFormat {
    pub fn new(layout: impl Into<String>) -> Self {
        Self {
            layout: layout.into(),
            patterns: IndexMap::new(),
        }
    }

    pub fn with_pattern(mut self, name: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.patterns.insert(name.into(), pattern.into());
        self
    }

    pub fn validate(&self) -> Result<(), FormatError> {
        if self.layout.is_empty() {
            return Err(FormatError::invalid("custom format requires a layout"));
        }
        self.mapper().map(|_| ())
    }

    pub fn mapper(&self) -> Result<PatternMapper, FormatError> {
        let mut registry = GrokRegistry::new();
        registry.add_patterns(&self.patterns)?;
        Ok(PatternMapper::new(registry.compile_anchored(&self.layout)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::{LineMapper, Mapped};

    #[test]
    fn test_requires_layout() {
        let err = CustomFormat::default().validate().unwrap_err();
        assert_eq!(err.to_string(), "custom format requires a layout");
    }

    #[test]
    fn test_whole_line_must_match() {
        let mut mapper = CustomFormat::new("%{LEVEL:level}: %{GREEDYDATA:message}")
            .with_pattern("LEVEL", "(?:DEBUG|INFO|WARN|ERROR)")
            .mapper()
            .unwrap();

        assert!(matches!(mapper.map_line("WARN: disk low").unwrap(), Mapped::Row(_)));
        assert_eq!(mapper.map_line("x WARN: disk low").unwrap(), Mapped::Unmatched);
    }
}
