//! File source configuration types.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;

/// Configuration for a filesystem artifact source.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct FileSourceConfig {
    /// Root directories to walk.
    pub paths: Vec<PathBuf>,

    /// Layout pattern describing where artifacts live (None = extension filtering only).
    #[builder(default, setter(into, strip_option))]
    #[serde(default)]
    pub file_layout: Option<String>,

    /// Allowed file extensions, e.g. `.log` (empty = any extension).
    #[builder(default)]
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Custom named sub-patterns available to the layout.
    #[builder(default)]
    #[serde(default)]
    pub patterns: IndexMap<String, String>,

    /// Follow symbolic links.
    #[builder(default = "false")]
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Include hidden files (starting with .).
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub include_hidden: bool,

    /// Walk root paths concurrently.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub parallel_roots: bool,
}

fn default_true() -> bool {
    true
}

impl FileSourceConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.paths {
            Some(ref paths) if paths.is_empty() => {
                return Err("required field: paths can not be empty".to_string());
            }
            None => return Err("required field: paths can not be empty".to_string()),
            Some(_) => {}
        }
        if let Some(ref extensions) = self.extensions {
            if let Some(bad) = extensions.iter().find(|e| !is_valid_extension(e)) {
                return Err(format!("invalid extension '{bad}'"));
            }
        }
        Ok(())
    }
}

impl FileSourceConfig {
    /// Create a new config builder.
    pub fn builder() -> FileSourceConfigBuilder {
        FileSourceConfigBuilder::default()
    }

    /// Create a simple config walking the given paths.
    pub fn new(paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            file_layout: None,
            extensions: Vec::new(),
            patterns: IndexMap::new(),
            follow_symlinks: false,
            include_hidden: true,
            parallel_roots: true,
        }
    }

    /// Set the file layout.
    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        self.file_layout = Some(layout.into());
        self
    }

    /// Set the extension allow-list.
    pub fn with_extensions(mut self, extensions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Add a custom named sub-pattern.
    pub fn with_pattern(mut self, name: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.patterns.insert(name.into(), pattern.into());
        self
    }

    /// The configured layout, ignoring blank values.
    pub fn layout(&self) -> Option<&str> {
        self.file_layout
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }

    /// Validate the configuration against the filesystem.
    pub fn validate(&self) -> Result<(), SourceError> {
        if self.paths.is_empty() {
            return Err(SourceError::config("required field: paths can not be empty"));
        }

        for path in &self.paths {
            if !path.is_dir() {
                return Err(SourceError::config(format!(
                    "path {} is not a directory or does not exist",
                    path.display()
                )));
            }
        }

        if let Some(bad) = self.extensions.iter().find(|e| !is_valid_extension(e)) {
            return Err(SourceError::config(format!(
                "invalid extension '{bad}': extensions must match ^\\.[A-Za-z0-9]+$"
            )));
        }

        for name in self.patterns.keys() {
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(SourceError::config(format!("invalid pattern name '{name}'")));
            }
        }

        Ok(())
    }

    /// Check whether a file passes the extension allow-list.
    pub fn allows_extension(&self, path: &Path) -> bool {
        extension_allowed(&self.extensions, path)
    }
}

/// Check a path against an extension allow-list; an empty list allows everything.
pub fn extension_allowed(extensions: &[String], path: &Path) -> bool {
    if extensions.is_empty() {
        return true;
    }
    match path.extension() {
        Some(ext) => {
            let ext = ext.to_string_lossy();
            extensions.iter().any(|e| e.strip_prefix('.') == Some(&*ext))
        }
        None => false,
    }
}

/// Check that an extension is a dot followed by ASCII letters and digits.
pub fn is_valid_extension(extension: &str) -> bool {
    extension
        .strip_prefix('.')
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = FileSourceConfig::builder()
            .paths(vec![PathBuf::from("/var/log")])
            .file_layout("AWSLogs/%{WORD:org}/%{DATA}")
            .extensions(vec![".log".to_string()])
            .parallel_roots(false)
            .build()
            .unwrap();

        assert_eq!(config.paths, vec![PathBuf::from("/var/log")]);
        assert_eq!(config.layout(), Some("AWSLogs/%{WORD:org}/%{DATA}"));
        assert!(!config.parallel_roots);
        assert!(config.include_hidden);
    }

    #[test]
    fn test_builder_rejects_empty_paths() {
        let result = FileSourceConfig::builder().paths(Vec::<PathBuf>::new()).build();
        assert!(result.is_err());

        let result = FileSourceConfig::builder().build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_rejects_bad_extension() {
        let result = FileSourceConfig::builder()
            .paths(vec![PathBuf::from("/tmp")])
            .extensions(vec!["log".to_string()])
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_is_valid_extension() {
        assert!(is_valid_extension(".log"));
        assert!(is_valid_extension(".GZ2"));
        assert!(!is_valid_extension("log"));
        assert!(!is_valid_extension("."));
        assert!(!is_valid_extension(".tar.gz"));
        assert!(!is_valid_extension(".j-son"));
    }

    #[test]
    fn test_blank_layout_is_none() {
        let config = FileSourceConfig::new(["/tmp"]).with_layout("   ");
        assert_eq!(config.layout(), None);
    }

    #[test]
    fn test_allows_extension() {
        let config = FileSourceConfig::new(["/tmp"]).with_extensions([".log", ".gz"]);
        assert!(config.allows_extension(Path::new("/a/b.log")));
        assert!(config.allows_extension(Path::new("/a/b.log.gz")));
        assert!(!config.allows_extension(Path::new("/a/b.json")));
        assert!(!config.allows_extension(Path::new("/a/README")));

        let open = FileSourceConfig::new(["/tmp"]);
        assert!(open.allows_extension(Path::new("/a/README")));
    }
}
