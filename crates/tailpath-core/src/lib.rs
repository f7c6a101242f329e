//! Core types and traits for tailpath.
//!
//! This crate provides the fundamental data structures shared by the
//! discovery engine and the row pipeline: source configuration, artifact
//! descriptors, discovery events and the observer plumbing used to deliver
//! them.

mod artifact;
mod config;
mod error;
mod event;

pub use artifact::{ArtifactInfo, DownloadedArtifactInfo, Fields, SourceEnrichment};
pub use config::{FileSourceConfig, FileSourceConfigBuilder, extension_allowed, is_valid_extension};
pub use error::{SourceError, TraversalError, strip_os_error_code};
pub use event::{DiscoveryEvent, EventLog, Observer, Observers};
