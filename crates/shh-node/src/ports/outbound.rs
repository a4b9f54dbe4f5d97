//! Outbound (Driven) ports for the shh node.
//!
//! These traits define the collaborators the node drives: a clock, the
//! filter/watcher hub that decrypts and matches envelopes, and an optional
//! mail server for historic replay.

use crate::domain::{
    Envelope, FilterId, MessageCode, MessageSink, Peer, ReceivedMessage, Timestamp,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Time source for admission and expiry decisions.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    /// Returns the current time in seconds since the UNIX epoch.
    fn now(&self) -> Timestamp;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Manually driven clock for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    time: AtomicU64,
}

impl ManualTimeSource {
    pub fn new(initial: Timestamp) -> Self {
        Self {
            time: AtomicU64::new(initial),
        }
    }

    pub fn advance(&self, secs: u64) {
        self.time.fetch_add(secs, Ordering::SeqCst);
    }

    pub fn set(&self, time: Timestamp) {
        self.time.store(time, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Timestamp {
        self.time.load(Ordering::SeqCst)
    }
}

/// A watch registration's matching rule.
pub trait Filter: Send + Sync {
    /// Whether a decrypted message belongs to this watch.
    fn matches_message(&self, message: &ReceivedMessage) -> bool;
}

/// Filter registry and the decryption/matching stage.
///
/// `notify_watchers` runs on a dispatch unit, never on the admission path.
/// Implementations store decrypted results through the supplied sink, which
/// may be called concurrently from many units.
#[async_trait]
pub trait WatcherHub: Send + Sync {
    /// Registers a filter and returns its id.
    fn install(&self, filter: Arc<dyn Filter>) -> FilterId;

    /// Looks up a registered filter.
    fn get(&self, id: FilterId) -> Option<Arc<dyn Filter>>;

    /// Removes a filter. Returns whether it was registered.
    fn uninstall(&self, id: FilterId) -> bool;

    /// Tries every filter against a newly accepted envelope.
    async fn notify_watchers(&self, envelope: Arc<Envelope>, code: MessageCode, sink: MessageSink);
}

/// Archive and replay service for expired envelopes.
///
/// The node only calls [`deliver_mail`](Self::deliver_mail), after its trust
/// gate passes. Archiving is driven by the layer that owns the mail server.
pub trait MailServer: Send + Sync {
    /// Stores an envelope for later replay. Not called by [`ShhNode`](crate::ShhNode).
    fn archive(&self, envelope: &Envelope);

    /// Serves historic envelopes to a trusted peer.
    fn deliver_mail(&self, peer: &Peer, request: &Envelope);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_time_source() {
        let clock = ManualTimeSource::new(100);
        assert_eq!(clock.now(), 100);
        clock.advance(5);
        assert_eq!(clock.now(), 105);
        clock.set(7);
        assert_eq!(clock.now(), 7);
    }

    #[test]
    fn test_system_time_is_seconds() {
        // Well past 2020 and not in milliseconds.
        let now = SystemTimeSource.now();
        assert!(now > 1_577_836_800);
        assert!(now < 100_000_000_000);
    }
}
