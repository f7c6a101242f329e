//! Artifact discovery for tailpath.
//!
//! This crate walks root directories with jwalk, pruning every subtree
//! whose path can no longer satisfy the configured layout, and reports
//! matching files to observers.
//!
//! # Overview
//!
//! - **Pruning walker**: directory decisions are made in jwalk's read-dir
//!   hook, so pruned subtrees are never read
//! - **Parallel roots** via rayon; one root is always walked in sorted order
//! - **Non-fatal root failures** reported as [`DiscoveryEvent::Error`]
//! - **Async delivery** through [`start_discovery`]
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tailpath_scan::{EventLog, FileSource, FileSourceConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = FileSourceConfig::new(["/var/log/aws"])
//!     .with_layout("AWSLogs/%{WORD:org}/%{WORD:account_id}/CloudTrail/%{DATA}.log");
//! let mut source = FileSource::new(config).unwrap();
//! let log = Arc::new(EventLog::new());
//! source.add_observer(log.clone());
//!
//! let stats = source.discover_artifacts(&CancellationToken::new()).unwrap();
//! println!("{} artifacts, {} directories pruned", stats.files_matched, stats.dirs_pruned);
//! ```

mod channel;
mod registry;
mod rules;
mod source;
mod walker;

pub use channel::{
    ChannelObserver, DISCOVERY_CHANNEL_SIZE, start_discovery, start_discovery_with_capacity,
};
pub use registry::{SourceFactory, SourceRegistry};
pub use rules::{MatchRules, PathRule, Visit};
pub use source::{
    DiscoveryStats, FILE_SOURCE_IDENTIFIER, FILE_SYSTEM_SOURCE_IDENTIFIER, FileSource,
};
pub use walker::{DirectoryWalker, WalkNode, WalkStats, normalize_walk_error, relative_path};

// Re-export core types for convenience
pub use tailpath_core::{
    ArtifactInfo, DiscoveryEvent, DownloadedArtifactInfo, EventLog, FileSourceConfig, Observer,
    SourceError, TraversalError,
};
