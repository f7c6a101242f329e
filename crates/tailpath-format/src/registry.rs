//! Named format presets and table configuration.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::FormatError;
use crate::format::{DelimitedFormat, GrokFormat, LineFormat};
use crate::table::LogTable;

/// Line formats registered under a name, so tables can refer to them
/// instead of spelling out a layout.
#[derive(Debug, Clone, Default)]
pub struct FormatRegistry {
    presets: IndexMap<String, LineFormat>,
}

impl FormatRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in presets.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(
            "apache_common",
            GrokFormat::new("%{COMMONAPACHELOG}")
                .with_name("apache_common")
                .with_description("Apache common log format"),
        );
        registry.register(
            "apache_combined",
            GrokFormat::new("%{COMBINEDAPACHELOG}")
                .with_name("apache_combined")
                .with_description("Apache combined log format"),
        );
        registry.register(
            "syslog",
            GrokFormat::new(
                "%{SYSLOGTIMESTAMP:timestamp} %{SYSLOGHOST:host} %{SYSLOGPROG}: %{GREEDYDATA:message}",
            )
            .with_name("syslog")
            .with_description("BSD syslog lines"),
        );
        registry.register(
            "csv",
            DelimitedFormat {
                header: Some(true),
                ..DelimitedFormat::default()
            },
        );
        registry
    }

    /// Register a preset, replacing any existing one with the same name.
    pub fn register(&mut self, name: impl Into<String>, format: impl Into<LineFormat>) {
        self.presets.insert(name.into(), format.into());
    }

    pub fn get(&self, name: &str) -> Option<&LineFormat> {
        self.presets.get(name)
    }

    /// Preset names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }

    /// Turn a reference into a concrete format.
    pub fn resolve(&self, format: &FormatRef) -> Result<LineFormat, FormatError> {
        match format {
            FormatRef::Preset(name) => self.get(name).cloned().ok_or_else(|| {
                FormatError::invalid(format!(
                    "unknown format preset '{name}' (known: {})",
                    self.names().collect::<Vec<_>>().join(", ")
                ))
            }),
            FormatRef::Inline(format) => Ok(format.clone()),
        }
    }
}

/// A format given either by preset name or inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormatRef {
    Preset(String),
    Inline(LineFormat),
}

/// Table configuration as written in a config file.
///
/// ```toml
/// [table]
/// name = "access_log"
/// format = "apache_combined"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    #[serde(default)]
    pub name: String,
    pub format: Option<FormatRef>,
}

impl TableConfig {
    /// Resolve the format and build a validated table.
    pub fn build(&self, registry: &FormatRegistry) -> Result<LogTable, FormatError> {
        let format = self
            .format
            .as_ref()
            .ok_or_else(|| FormatError::invalid("source format is required"))?;
        let table = LogTable::new(self.name.clone(), registry.resolve(format)?);
        table.validate()?;
        Ok(table)
    }
}
