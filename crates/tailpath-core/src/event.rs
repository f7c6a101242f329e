//! Discovery events and the observers that receive them.

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::artifact::{ArtifactInfo, DownloadedArtifactInfo};
use crate::error::TraversalError;

/// Events emitted by an artifact source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiscoveryEvent {
    /// A file matched the source's layout or extension filter.
    ArtifactDiscovered(ArtifactInfo),
    /// An artifact passed the readiness check.
    ArtifactDownloaded(DownloadedArtifactInfo),
    /// A root path could not be walked.
    Error(TraversalError),
}

/// Receives discovery events.
///
/// Observers may be called from several root walks at once; the
/// [`Observers`] set serializes delivery so an implementation only ever sees
/// one event at a time.
pub trait Observer: Send + Sync {
    /// Handle an event.
    fn notify(&self, event: &DiscoveryEvent);
}

impl<F> Observer for F
where
    F: Fn(&DiscoveryEvent) + Send + Sync,
{
    fn notify(&self, event: &DiscoveryEvent) {
        self(event)
    }
}

/// The observers registered on a source.
#[derive(Default)]
pub struct Observers {
    observers: Vec<Arc<dyn Observer>>,
    gate: Mutex<()>,
}

impl Observers {
    /// Create an empty observer set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer.
    pub fn add(&mut self, observer: Arc<dyn Observer>) {
        self.observers.push(observer);
    }

    /// Deliver an event to every observer, one event at a time.
    pub fn notify(&self, event: &DiscoveryEvent) {
        let _guard = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        for observer in &self.observers {
            observer.notify(event);
        }
    }

    /// Number of registered observers.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Check if no observers are registered.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("count", &self.observers.len())
            .finish()
    }
}

/// Observer that records every event it receives.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<DiscoveryEvent>>,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events, in delivery order.
    pub fn events(&self) -> Vec<DiscoveryEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Discovered artifacts, in delivery order.
    pub fn artifacts(&self) -> Vec<ArtifactInfo> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DiscoveryEvent::ArtifactDiscovered(info) => Some(info),
                _ => None,
            })
            .collect()
    }

    /// Downloaded artifacts, in delivery order.
    pub fn downloads(&self) -> Vec<DownloadedArtifactInfo> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DiscoveryEvent::ArtifactDownloaded(info) => Some(info),
                _ => None,
            })
            .collect()
    }

    /// Traversal errors, in delivery order.
    pub fn errors(&self) -> Vec<TraversalError> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DiscoveryEvent::Error(err) => Some(err),
                _ => None,
            })
            .collect()
    }

    /// Drop all recorded events.
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Observer for EventLog {
    fn notify(&self, event: &DiscoveryEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
