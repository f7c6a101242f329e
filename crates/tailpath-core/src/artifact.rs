//! Artifact descriptors handed to observers.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Named fields extracted from a path or a line, in capture order.
pub type Fields = IndexMap<String, String>;

/// Enrichment a source attaches to every artifact it discovers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEnrichment {
    /// Identifier of the source that found the artifact.
    pub source_type: String,
    /// Where the artifact lives.
    pub source_location: String,
    /// Fields captured from the artifact path by the file layout.
    #[serde(default)]
    pub fields: Fields,
}

impl SourceEnrichment {
    /// Create enrichment for an artifact found by `source_type`.
    pub fn new(source_type: impl Into<String>, source_location: impl Into<String>) -> Self {
        Self {
            source_type: source_type.into(),
            source_location: source_location.into(),
            fields: Fields::new(),
        }
    }

    /// Attach path-derived fields.
    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }
}

/// A discovered artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactInfo {
    /// Absolute path of the artifact.
    pub name: PathBuf,
    /// Source-derived enrichment.
    pub source_enrichment: SourceEnrichment,
}

impl ArtifactInfo {
    /// Create a new artifact descriptor.
    pub fn new(name: impl Into<PathBuf>, source_enrichment: SourceEnrichment) -> Self {
        Self {
            name: name.into(),
            source_enrichment,
        }
    }

    /// Look up a field captured from the path.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.source_enrichment.fields.get(name).map(String::as_str)
    }
}

/// An artifact that has been confirmed ready for reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadedArtifactInfo {
    /// The discovered artifact.
    pub info: ArtifactInfo,
    /// Local path the content can be read from.
    pub local_path: PathBuf,
    /// Size of the local file in bytes.
    pub size_bytes: u64,
}

impl DownloadedArtifactInfo {
    /// Create a new downloaded artifact descriptor.
    pub fn new(info: ArtifactInfo, local_path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        Self {
            info,
            local_path: local_path.into(),
            size_bytes,
        }
    }

    /// Original artifact name.
    pub fn name(&self) -> &Path {
        &self.info.name
    }
}
