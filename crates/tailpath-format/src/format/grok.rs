use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tailpath_layout::GrokRegistry;

use crate::error::FormatError;
use crate::mapper::PatternMapper;

/// Lines parsed with a grok expression, matched anywhere in the line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrokFormat {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub layout: String,
    /// Extra named sub-patterns usable from `layout`.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub patterns: IndexMap<String, String>,
}

impl GrokFormat {
    pub fn new(layout: impl Into<String>) -> Self {
        Self {
            layout: layout.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_pattern(mut self, name: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.patterns.insert(name.into(), pattern.into());
        self
    }

    pub fn validate(&self) -> Result<(), FormatError> {
        if self.layout.trim().is_empty() {
            return Err(FormatError::invalid("grok format requires a layout"));
        }
        self.registry()?.compile(&self.layout)?;
        Ok(())
    }

    /// Descriptive properties: the layout, then one entry per custom pattern.
    pub fn properties(&self) -> IndexMap<String, String> {
        let mut properties = IndexMap::with_capacity(self.patterns.len() + 1);
        properties.insert("layout".to_string(), self.layout.clone());
        for (name, pattern) in &self.patterns {
            properties.insert(format!("pattern: {name}"), pattern.clone());
        }
        properties
    }

    /// The regular expression the layout expands to.
    pub fn regex(&self) -> Result<String, FormatError> {
        Ok(self.registry()?.to_regex(&self.layout)?)
    }

    pub fn mapper(&self) -> Result<PatternMapper, FormatError> {
        Ok(PatternMapper::new(self.registry()?.compile(&self.layout)?))
    }

    fn registry(&self) -> Result<GrokRegistry, FormatError> {
        let mut registry = GrokRegistry::new();
        registry.add_patterns(&self.patterns)?;
        Ok(registry)
    }
}
