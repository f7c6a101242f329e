//! Async delivery of discovery events.

use std::sync::Arc;

use tailpath_core::{DiscoveryEvent, Observer, SourceError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::source::{DiscoveryStats, FileSource};

/// Events buffered before the walk waits for the receiver.
pub const DISCOVERY_CHANNEL_SIZE: usize = 256;

/// Observer forwarding every event into a bounded mpsc channel.
///
/// Sending blocks the calling thread while the channel is full, so it must
/// only be notified from blocking code, never from inside the runtime.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::Sender<DiscoveryEvent>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::Sender<DiscoveryEvent>) -> Self {
        Self { tx }
    }
}

impl Observer for ChannelObserver {
    fn notify(&self, event: &DiscoveryEvent) {
        // Receiver dropped means nobody is listening any more.
        let _ = self.tx.blocking_send(event.clone());
    }
}

/// Run discovery on a blocking task and stream its events.
///
/// The receiver closes once discovery finishes and the source is dropped.
/// The join handle yields the run's summary.
pub fn start_discovery(
    source: FileSource,
    cancel: CancellationToken,
) -> (
    mpsc::Receiver<DiscoveryEvent>,
    JoinHandle<Result<DiscoveryStats, SourceError>>,
) {
    start_discovery_with_capacity(source, cancel, DISCOVERY_CHANNEL_SIZE)
}

/// [`start_discovery`] with a chosen channel capacity.
pub fn start_discovery_with_capacity(
    mut source: FileSource,
    cancel: CancellationToken,
    capacity: usize,
) -> (
    mpsc::Receiver<DiscoveryEvent>,
    JoinHandle<Result<DiscoveryStats, SourceError>>,
) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    source.add_observer(Arc::new(ChannelObserver::new(tx)));
    let handle = tokio::task::spawn_blocking(move || source.discover_artifacts(&cancel));
    (rx, handle)
}
