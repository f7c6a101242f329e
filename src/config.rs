//! Collection configuration file.
//!
//! ```toml
//! [source]
//! type = "file"
//! paths = ["/var/log/aws"]
//! file_layout = "AWSLogs/(%{WORD:org}/)?%{WORD:account_id}/CloudTrail/%{DATA}.log"
//!
//! [table]
//! name = "access_log"
//! format = "apache_combined"
//! ```

use std::path::{Path, PathBuf};

use color_eyre::eyre::{Context, Result, eyre};
use indexmap::IndexMap;
use serde::Deserialize;
use tailpath_core::FileSourceConfig;
use tailpath_format::{FormatRegistry, LogTable, TableConfig};
use tailpath_scan::{FILE_SOURCE_IDENTIFIER, FileSource, SourceRegistry};

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionConfig {
    pub source: SourceBlock,
    #[serde(default)]
    pub table: Option<TableConfig>,
}

/// The `[source]` block: a source type plus that source's options.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceBlock {
    #[serde(rename = "type", default = "default_source_type")]
    pub source_type: String,
    #[serde(flatten)]
    pub config: FileSourceConfig,
}

fn default_source_type() -> String {
    FILE_SOURCE_IDENTIFIER.to_string()
}

/// Source settings given on the command line.
#[derive(Debug, Clone, Default)]
pub struct SourceOverrides {
    pub source_type: Option<String>,
    pub paths: Vec<PathBuf>,
    pub layout: Option<String>,
    pub extensions: Vec<String>,
    pub patterns: IndexMap<String, String>,
}

impl CollectionConfig {
    /// Read a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// A config holding only command-line source settings.
    pub fn from_overrides(overrides: &SourceOverrides) -> Self {
        let mut config = Self {
            source: SourceBlock {
                source_type: default_source_type(),
                config: FileSourceConfig::new(Vec::<PathBuf>::new()),
            },
            table: None,
        };
        config.apply(overrides);
        config
    }

    /// Overlay command-line settings; anything given replaces the file's value.
    pub fn apply(&mut self, overrides: &SourceOverrides) {
        let source = &mut self.source;
        if let Some(source_type) = &overrides.source_type {
            source.source_type = source_type.clone();
        }
        if !overrides.paths.is_empty() {
            source.config.paths = overrides.paths.clone();
        }
        if let Some(layout) = &overrides.layout {
            source.config.file_layout = Some(layout.clone());
        }
        if !overrides.extensions.is_empty() {
            source.config.extensions = overrides.extensions.clone();
        }
        source.config.patterns.extend(
            overrides
                .patterns
                .iter()
                .map(|(name, pattern)| (name.clone(), pattern.clone())),
        );
    }

    pub fn build_source(&self, registry: &SourceRegistry) -> Result<FileSource> {
        registry
            .create(&self.source.source_type, self.source.config.clone())
            .wrap_err("Invalid source configuration")
    }

    pub fn build_table(&self, registry: &FormatRegistry) -> Result<LogTable> {
        let table = self
            .table
            .as_ref()
            .ok_or_else(|| eyre!("custom table is required: add a [table] block"))?;
        table.build(registry).wrap_err("Invalid table configuration")
    }
}

/// Parse a `NAME=PATTERN` command-line pair.
pub fn parse_pattern(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .filter(|(name, _)| !name.is_empty())
        .map(|(name, pattern)| (name.to_string(), pattern.to_string()))
        .ok_or_else(|| format!("expected NAME=PATTERN, got '{s}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tailpath_format::LineFormat;
    use tempfile::TempDir;

    #[test]
    fn test_load_full_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("collect.toml");
        fs::write(
            &path,
            format!(
                r#"
                [source]
                type = "file"
                paths = ["{}"]
                file_layout = "%{{WORD:app}}/%{{DATA}}.log"
                extensions = [".log"]

                [source.patterns]
                APP = "[a-z]+"

                [table]
                name = "app_log"

                [table.format]
                type = "delimited"
                delimiter = "|"
                header = true
                "#,
                temp.path().display()
            ),
        )
        .unwrap();

        let config = CollectionConfig::load(&path).unwrap();
        assert_eq!(config.source.source_type, "file");
        assert_eq!(config.source.config.layout(), Some("%{WORD:app}/%{DATA}.log"));
        assert_eq!(config.source.config.patterns["APP"], "[a-z]+");
        assert!(config.source.config.include_hidden);

        config.build_source(&SourceRegistry::with_defaults()).unwrap();
        let table = config.build_table(&FormatRegistry::with_defaults()).unwrap();
        let LineFormat::Delimited(delimited) = &table.format else {
            panic!("expected delimited format");
        };
        assert_eq!(delimited.csv_options(), ["delimiter='|'", "header=true"]);
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let temp = TempDir::new().unwrap();
        let mut config: CollectionConfig = toml::from_str(
            r#"
            [source]
            paths = ["/nonexistent"]
            file_layout = "%{DATA}"
            "#,
        )
        .unwrap();
        assert_eq!(config.source.source_type, "file");

        config.apply(&SourceOverrides {
            source_type: Some("file_system".to_string()),
            paths: vec![temp.path().to_path_buf()],
            ..SourceOverrides::default()
        });
        assert_eq!(config.source.config.paths, [temp.path()]);

        // file_system sources take no layout.
        assert!(config.build_source(&SourceRegistry::with_defaults()).is_err());
        config.source.config.file_layout = None;
        let source = config.build_source(&SourceRegistry::with_defaults()).unwrap();
        assert_eq!(source.identifier(), "file_system");
    }

    #[test]
    fn test_missing_table() {
        let config = CollectionConfig::from_overrides(&SourceOverrides::default());
        let err = config.build_table(&FormatRegistry::with_defaults()).unwrap_err();
        assert!(err.to_string().starts_with("custom table is required"));
    }

    #[test]
    fn test_parse_pattern() {
        assert_eq!(
            parse_pattern("ACCOUNT=[0-9]{12}").unwrap(),
            ("ACCOUNT".to_string(), "[0-9]{12}".to_string())
        );
        assert_eq!(parse_pattern("A=b=c").unwrap().1, "b=c");
        assert!(parse_pattern("=x").is_err());
        assert!(parse_pattern("nope").is_err());
    }
}
