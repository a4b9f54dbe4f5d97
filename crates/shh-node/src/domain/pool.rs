//! # Envelope/Expiration Pool
//!
//! Content-addressed envelope storage with a time index for bulk removal.
//!
//! ## Data Structures
//!
//! - `envelopes`: hash -> envelope
//! - `messages`: hash -> decrypted message, keyed by the originating envelope
//! - `expirations`: expiry second -> hashes expiring then
//!
//! Every pooled hash is listed in exactly one bucket, the one matching its
//! envelope's expiry. A single `RwLock` guards all three maps and no I/O
//! happens while it is held.

use super::entities::{EnvelopeHash, ReceivedMessage, Timestamp};
use super::envelope::Envelope;
use super::value_objects::SweepReport;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Default)]
struct PoolState {
    envelopes: HashMap<EnvelopeHash, Arc<Envelope>>,
    messages: HashMap<EnvelopeHash, ReceivedMessage>,
    expirations: HashMap<u32, HashSet<EnvelopeHash>>,
}

/// Shared envelope pool.
#[derive(Debug, Default)]
pub struct EnvelopePool {
    state: RwLock<PoolState>,
}

impl EnvelopePool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an envelope under its hash.
    ///
    /// Returns `false` without touching anything if the hash is already
    /// pooled.
    pub fn insert(&self, hash: EnvelopeHash, envelope: Arc<Envelope>) -> bool {
        let mut state = self.state.write();
        if state.envelopes.contains_key(&hash) {
            return false;
        }
        let expiry = envelope.expiry();
        state.envelopes.insert(hash, envelope);
        state.expirations.entry(expiry).or_default().insert(hash);
        true
    }

    /// Whether an envelope with this hash is pooled.
    pub fn contains(&self, hash: &EnvelopeHash) -> bool {
        self.state.read().envelopes.contains_key(hash)
    }

    /// Looks up a pooled envelope.
    pub fn get(&self, hash: &EnvelopeHash) -> Option<Arc<Envelope>> {
        self.state.read().envelopes.get(hash).cloned()
    }

    /// Stores a decrypted message next to its envelope.
    ///
    /// Messages whose envelope is no longer pooled are discarded, so the
    /// message map never outlives the sweep of its envelope.
    pub fn add_decrypted_message(&self, message: ReceivedMessage) -> bool {
        let mut state = self.state.write();
        if !state.envelopes.contains_key(&message.envelope_hash) {
            return false;
        }
        state.messages.insert(message.envelope_hash, message);
        true
    }

    /// Removes every envelope whose expiry is at or before `now`.
    ///
    /// Processed buckets are emptied but kept for later envelopes with the
    /// same expiry.
    pub fn expire(&self, now: Timestamp) -> SweepReport {
        let mut report = SweepReport::default();
        let mut guard = self.state.write();
        let state = &mut *guard;

        for (then, hashes) in state.expirations.iter_mut() {
            if u64::from(*then) > now || hashes.is_empty() {
                continue;
            }
            report.buckets_cleared += 1;
            for hash in hashes.drain() {
                if state.envelopes.remove(&hash).is_some() {
                    report.envelopes_removed += 1;
                }
                if state.messages.remove(&hash).is_some() {
                    report.messages_removed += 1;
                }
            }
        }
        report
    }

    /// Snapshot of every pooled envelope.
    pub fn envelopes(&self) -> Vec<Arc<Envelope>> {
        self.state.read().envelopes.values().cloned().collect()
    }

    /// Snapshot of the decrypted messages accepted by `predicate`.
    pub fn messages_matching<F>(&self, predicate: F) -> Vec<ReceivedMessage>
    where
        F: Fn(&ReceivedMessage) -> bool,
    {
        self.state
            .read()
            .messages
            .values()
            .filter(|m| predicate(m))
            .cloned()
            .collect()
    }

    /// Number of pooled envelopes.
    pub fn len(&self) -> usize {
        self.state.read().envelopes.len()
    }

    /// Whether the pool holds no envelopes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of pooled decrypted messages.
    pub fn message_count(&self) -> usize {
        self.state.read().messages.len()
    }

    /// Number of expiry buckets, including emptied ones.
    pub fn bucket_count(&self) -> usize {
        self.state.read().expirations.len()
    }

    /// Envelope and message counts read under one lock acquisition.
    pub fn counts(&self) -> (usize, usize, usize) {
        let state = self.state.read();
        (
            state.envelopes.len(),
            state.messages.len(),
            state.expirations.len(),
        )
    }
}

/// Handle through which the decryption collaborator stores its results.
#[derive(Clone, Debug)]
pub struct MessageSink {
    pool: Arc<EnvelopePool>,
}

impl MessageSink {
    pub(crate) fn new(pool: Arc<EnvelopePool>) -> Self {
        Self { pool }
    }

    /// Stores a decrypted message. Returns `false` if its envelope has
    /// already been swept.
    pub fn deliver(&self, message: ReceivedMessage) -> bool {
        self.pool.add_decrypted_message(message)
    }
}
