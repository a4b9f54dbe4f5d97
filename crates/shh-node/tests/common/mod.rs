//! Shared collaborators and builders for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shh_node::{
    Envelope, EnvelopeParams, Filter, FilterId, MailServer, ManualTimeSource, MessageCode,
    MessageSink, Peer, PeerId, ReceivedMessage, ShhConfig, ShhNode,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

pub const NOW: u64 = 1_700_000_000;

// =============================================================================
// COLLABORATORS
// =============================================================================

/// Matches messages by topic.
pub struct TopicFilter(pub [u8; 4]);

impl Filter for TopicFilter {
    fn matches_message(&self, message: &ReceivedMessage) -> bool {
        message.topic == self.0
    }
}

/// Watcher hub that "decrypts" by copying the payload and records every call.
#[derive(Default)]
pub struct RecordingHub {
    next_id: AtomicU32,
    filters: RwLock<HashMap<FilterId, Arc<dyn Filter>>>,
    pub notified: AtomicUsize,
    pub codes: Mutex<Vec<MessageCode>>,
}

impl RecordingHub {
    pub fn notified(&self) -> usize {
        self.notified.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl shh_node::WatcherHub for RecordingHub {
    fn install(&self, filter: Arc<dyn Filter>) -> FilterId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.filters.write().insert(id, filter);
        id
    }

    fn get(&self, id: FilterId) -> Option<Arc<dyn Filter>> {
        self.filters.read().get(&id).cloned()
    }

    fn uninstall(&self, id: FilterId) -> bool {
        self.filters.write().remove(&id).is_some()
    }

    async fn notify_watchers(&self, envelope: Arc<Envelope>, code: MessageCode, sink: MessageSink) {
        self.codes.lock().push(code);
        sink.deliver(ReceivedMessage {
            envelope_hash: envelope.hash(),
            topic: envelope.topic(),
            payload: envelope.data().to_vec(),
            sent: envelope.expiry() - envelope.ttl(),
            ttl: envelope.ttl(),
            src: None,
        });
        self.notified.fetch_add(1, Ordering::SeqCst);
    }
}

/// Mail server that records which peers were served.
#[derive(Default)]
pub struct RecordingMailServer {
    pub archived: AtomicUsize,
    pub served: Mutex<Vec<PeerId>>,
}

impl MailServer for RecordingMailServer {
    fn archive(&self, _envelope: &Envelope) {
        self.archived.fetch_add(1, Ordering::SeqCst);
    }

    fn deliver_mail(&self, peer: &Peer, _request: &Envelope) {
        self.served.lock().push(peer.id());
    }
}

// =============================================================================
// BUILDERS
// =============================================================================

pub struct Harness {
    pub node: ShhNode,
    pub hub: Arc<RecordingHub>,
    pub clock: Arc<ManualTimeSource>,
}

pub fn harness(config: ShhConfig) -> Harness {
    let hub = Arc::new(RecordingHub::default());
    let clock = Arc::new(ManualTimeSource::new(NOW));
    let node = ShhNode::new(config, hub.clone())
        .expect("valid config")
        .with_time_source(clock.clone());
    Harness { node, hub, clock }
}

pub fn test_harness() -> Harness {
    harness(ShhConfig::for_testing())
}

/// Envelope sent at `sent` living `ttl` seconds, made unique by `nonce`.
pub fn envelope_at(sent: u64, ttl: u32, nonce: u64) -> Envelope {
    Envelope::new(EnvelopeParams {
        version: vec![0],
        expiry: sent as u32 + ttl,
        ttl,
        topic: [0xAB, 0xCD, 0, 0],
        salt: vec![0x11; 12],
        aes_nonce: vec![0x22; 12],
        data: nonce.to_be_bytes().to_vec(),
        env_nonce: 0,
    })
}

pub fn envelope(nonce: u64) -> Envelope {
    envelope_at(NOW, 60, nonce)
}

pub fn peer_id(n: u8) -> PeerId {
    PeerId([n; 64])
}

/// Polls until `done` holds or a second passes.
pub async fn eventually(mut done: impl FnMut() -> bool) {
    for _ in 0..200 {
        if done() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert!(done(), "condition not reached in time");
}
