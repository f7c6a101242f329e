//! Filesystem artifact source.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::Serialize;
use tailpath_core::{
    ArtifactInfo, DiscoveryEvent, DownloadedArtifactInfo, Fields, FileSourceConfig, Observer,
    Observers, SourceEnrichment, SourceError, TraversalError, is_valid_extension,
};
use tailpath_layout::{CompiledSet, GrokRegistry, expand};
use tokio_util::sync::CancellationToken;

use crate::rules::MatchRules;
use crate::walker::{DirectoryWalker, WalkNode, WalkStats};

/// Identifier of the layout-driven source.
pub const FILE_SOURCE_IDENTIFIER: &str = "file";

/// Identifier of the extension-only source.
pub const FILE_SYSTEM_SOURCE_IDENTIFIER: &str = "file_system";

/// Summary of one discovery run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryStats {
    pub roots_walked: u64,
    pub roots_failed: u64,
    pub dirs_visited: u64,
    pub dirs_pruned: u64,
    pub files_matched: u64,
    pub files_skipped: u64,
    pub cancelled: bool,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

impl DiscoveryStats {
    /// Add one root's counters; `completed` is false when the walk of that
    /// root ended with a traversal error.
    fn record_walk(&mut self, walk: &WalkStats, completed: bool) {
        if completed {
            self.roots_walked += 1;
        } else {
            self.roots_failed += 1;
        }
        self.dirs_visited += walk.dirs_visited;
        self.dirs_pruned += walk.dirs_pruned;
        self.files_matched += walk.files_matched;
        self.files_skipped += walk.files_skipped;
        self.cancelled |= walk.cancelled;
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }
}

/// Discovers artifacts below a set of local root directories.
///
/// With a `file_layout` configured, directories are pruned by prefix match
/// and files must fully match a layout alternative; fields captured from
/// the path travel with each artifact. Without one, every directory is read
/// and files are filtered by extension only.
#[derive(Debug)]
pub struct FileSource {
    identifier: &'static str,
    config: FileSourceConfig,
    paths: Vec<PathBuf>,
    observers: Observers,
}

impl FileSource {
    /// Create a source, resolving every root to an absolute path.
    pub fn new(config: FileSourceConfig) -> Result<Self, SourceError> {
        if config.paths.is_empty() {
            return Err(SourceError::config("required field: paths can not be empty"));
        }
        if let Some(bad) = config.extensions.iter().find(|e| !is_valid_extension(e)) {
            return Err(SourceError::config(format!("invalid extension '{bad}'")));
        }

        let paths = config
            .paths
            .iter()
            .map(|p| {
                std::path::absolute(p).map_err(|e| {
                    SourceError::config(format!(
                        "error getting absolute path for {}: {e}",
                        p.display()
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            identifier: FILE_SOURCE_IDENTIFIER,
            config,
            paths,
            observers: Observers::new(),
        })
    }

    /// Report artifacts under a different source identifier.
    pub fn with_identifier(mut self, identifier: &'static str) -> Self {
        self.identifier = identifier;
        self
    }

    /// The source identifier attached to every artifact.
    pub fn identifier(&self) -> &'static str {
        self.identifier
    }

    /// The source configuration.
    pub fn config(&self) -> &FileSourceConfig {
        &self.config
    }

    /// Absolute root paths.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Register an observer. Observers must be added before discovery starts.
    pub fn add_observer(&mut self, observer: Arc<dyn Observer>) {
        self.observers.add(observer);
    }

    /// Expand and compile the configured layout and custom patterns.
    pub fn match_rules(&self) -> Result<MatchRules, SourceError> {
        let mut registry = GrokRegistry::new();
        registry.add_patterns(
            self.config
                .patterns
                .iter()
                .map(|(name, pattern)| (name.as_str(), pattern.as_str())),
        )?;

        let rules = match self.config.layout() {
            Some(layout) => {
                let expanded = expand(layout)?;
                tracing::info!(
                    layout,
                    alternatives = ?expanded.iter().map(|l| l.pattern()).collect::<Vec<_>>(),
                    "expanded file layout"
                );
                MatchRules::layout(CompiledSet::compile(&expanded, &registry)?)
            }
            None => MatchRules::any(),
        };

        Ok(rules.with_extensions(self.config.extensions.clone()))
    }

    /// Walk every root and notify observers of each matching file.
    ///
    /// A root that cannot be walked is reported as a
    /// [`DiscoveryEvent::Error`] and the remaining roots still run. Only a
    /// malformed layout or custom pattern fails the call.
    pub fn discover_artifacts(&self, cancel: &CancellationToken) -> Result<DiscoveryStats, SourceError> {
        let start = Instant::now();
        let rules = Arc::new(self.match_rules()?);
        let walker = DirectoryWalker::new(rules)
            .follow_symlinks(self.config.follow_symlinks)
            .include_hidden(self.config.include_hidden);

        tracing::info!(
            source = self.identifier,
            roots = self.paths.len(),
            parallel = self.config.parallel_roots,
            "discovering artifacts"
        );

        let outcomes: Vec<(WalkStats, Result<(), TraversalError>)> =
            if self.config.parallel_roots && self.paths.len() > 1 {
                self.paths
                    .par_iter()
                    .map(|root| self.walk_root(&walker, root, cancel))
                    .collect()
            } else {
                self.paths
                    .iter()
                    .map(|root| self.walk_root(&walker, root, cancel))
                    .collect()
            };

        let mut stats = DiscoveryStats::default();
        for (walk, result) in &outcomes {
            stats.record_walk(walk, result.is_ok());
        }
        stats.cancelled |= cancel.is_cancelled();
        stats.duration = start.elapsed();

        tracing::info!(
            matched = stats.files_matched,
            pruned = stats.dirs_pruned,
            failed_roots = stats.roots_failed,
            cancelled = stats.cancelled,
            "discovery complete"
        );
        Ok(stats)
    }

    fn walk_root(
        &self,
        walker: &DirectoryWalker,
        root: &Path,
        cancel: &CancellationToken,
    ) -> (WalkStats, Result<(), TraversalError>) {
        let mut stats = WalkStats::default();
        let result = walker.walk_into(root, cancel, &mut stats, |node, fields| {
            let info = self.artifact_info(node, fields);
            tracing::debug!(artifact = %info.name.display(), "discovered artifact");
            self.observers.notify(&DiscoveryEvent::ArtifactDiscovered(info));
        });

        if let Err(err) = &result {
            tracing::error!(path = %root.display(), error = %err, "error walking file path");
            self.observers.notify(&DiscoveryEvent::Error(err.clone()));
        }
        (stats, result)
    }

    fn artifact_info(&self, node: WalkNode, fields: Fields) -> ArtifactInfo {
        let location = node.absolute_path.display().to_string();
        ArtifactInfo::new(
            node.absolute_path,
            SourceEnrichment::new(self.identifier, location).with_fields(fields),
        )
    }

    /// Confirm a discovered artifact is still present and readable.
    ///
    /// The file is already local, so nothing is copied: it is stat'ed,
    /// opened and closed, and observers receive an
    /// [`DiscoveryEvent::ArtifactDownloaded`] carrying its size.
    pub fn download_artifact(&self, info: &ArtifactInfo) -> Result<DownloadedArtifactInfo, SourceError> {
        let local_path = &info.name;

        let metadata = std::fs::metadata(local_path).map_err(|e| {
            tracing::error!(file = %local_path.display(), error = %e, "error obtaining file info");
            SourceError::io(local_path, e)
        })?;

        File::open(local_path).map_err(|e| {
            tracing::error!(file = %local_path.display(), error = %e, "error opening file");
            SourceError::unreadable(local_path, e)
        })?;

        let downloaded = DownloadedArtifactInfo::new(info.clone(), local_path, metadata.len());
        self.observers
            .notify(&DiscoveryEvent::ArtifactDownloaded(downloaded.clone()));
        Ok(downloaded)
    }
}
