//! Explicit registry of artifact source constructors.

use indexmap::IndexMap;
use tailpath_core::{FileSourceConfig, SourceError};

use crate::source::{FILE_SOURCE_IDENTIFIER, FILE_SYSTEM_SOURCE_IDENTIFIER, FileSource};

/// Builds a source from its configuration.
pub type SourceFactory = fn(FileSourceConfig) -> Result<FileSource, SourceError>;

/// Maps source identifiers to constructors.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    factories: IndexMap<&'static str, SourceFactory>,
}

impl SourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the `file` and `file_system` sources.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(FILE_SOURCE_IDENTIFIER, file_source);
        registry.register(FILE_SYSTEM_SOURCE_IDENTIFIER, file_system_source);
        registry
    }

    /// Register a constructor, replacing any existing one for the identifier.
    pub fn register(&mut self, identifier: &'static str, factory: SourceFactory) {
        self.factories.insert(identifier, factory);
    }

    /// Check if an identifier is registered.
    pub fn contains(&self, identifier: &str) -> bool {
        self.factories.contains_key(identifier)
    }

    /// Registered identifiers in registration order.
    pub fn identifiers(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }

    /// Validate `config` and build the source registered as `identifier`.
    pub fn create(&self, identifier: &str, config: FileSourceConfig) -> Result<FileSource, SourceError> {
        let factory = self.factories.get(identifier).ok_or_else(|| {
            SourceError::config(format!("unknown source type '{identifier}'"))
        })?;
        config.validate()?;
        factory(config)
    }
}

fn file_source(config: FileSourceConfig) -> Result<FileSource, SourceError> {
    FileSource::new(config)
}

fn file_system_source(config: FileSourceConfig) -> Result<FileSource, SourceError> {
    if config.layout().is_some() {
        return Err(SourceError::config(
            "file_layout is not supported by the file_system source",
        ));
    }
    Ok(FileSource::new(config)?.with_identifier(FILE_SYSTEM_SOURCE_IDENTIFIER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_identifiers() {
        let registry = SourceRegistry::with_defaults();
        assert_eq!(
            registry.identifiers().collect::<Vec<_>>(),
            vec!["file", "file_system"]
        );
        assert!(registry.contains("file"));
        assert!(!registry.contains("s3"));
    }

    #[test]
    fn test_create_sources() {
        let temp = TempDir::new().unwrap();
        let registry = SourceRegistry::with_defaults();

        let source = registry
            .create("file_system", FileSourceConfig::new([temp.path()]))
            .unwrap();
        assert_eq!(source.identifier(), "file_system");

        let source = registry
            .create("file", FileSourceConfig::new([temp.path()]).with_layout("%{DATA}"))
            .unwrap();
        assert_eq!(source.identifier(), "file");
    }

    #[test]
    fn test_create_rejects_bad_input() {
        let temp = TempDir::new().unwrap();
        let registry = SourceRegistry::with_defaults();

        assert!(registry.create("s3", FileSourceConfig::new([temp.path()])).is_err());
        assert!(registry
            .create("file_system", FileSourceConfig::new([temp.path()]).with_layout("%{DATA}"))
            .is_err());
        assert!(registry
            .create("file", FileSourceConfig::new([temp.path().join("missing")]))
            .is_err());
    }
}
