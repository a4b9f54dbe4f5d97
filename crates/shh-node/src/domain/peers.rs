//! Peer registry.
//!
//! Active connections are few, so lookups scan a vector under the registry
//! lock. The trust flag lives on the peer itself and is read without the lock.

use super::entities::PeerId;
use super::errors::ShhError;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A connected peer.
#[derive(Debug)]
pub struct Peer {
    id: PeerId,
    trusted: AtomicBool,
}

impl Peer {
    fn new(id: PeerId) -> Self {
        Self {
            id,
            trusted: AtomicBool::new(false),
        }
    }

    /// Peer identifier.
    pub fn id(&self) -> PeerId {
        self.id
    }

    /// Whether the peer may request historic envelopes.
    pub fn is_trusted(&self) -> bool {
        self.trusted.load(Ordering::Acquire)
    }

    fn mark_trusted(&self) {
        self.trusted.store(true, Ordering::Release);
    }
}

/// Set of currently connected peers.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: RwLock<Vec<Arc<Peer>>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection. Registering a known id returns the existing
    /// peer unchanged.
    pub fn register(&self, id: PeerId) -> Arc<Peer> {
        let mut peers = self.peers.write();
        if let Some(existing) = peers.iter().find(|p| p.id == id) {
            return existing.clone();
        }
        let peer = Arc::new(Peer::new(id));
        peers.push(peer.clone());
        peer
    }

    /// Drops a connection. Returns whether it was registered.
    pub fn unregister(&self, id: &PeerId) -> bool {
        let mut peers = self.peers.write();
        let before = peers.len();
        peers.retain(|p| p.id != *id);
        peers.len() != before
    }

    pub fn get(&self, id: &PeerId) -> Option<Arc<Peer>> {
        self.peers.read().iter().find(|p| p.id == *id).cloned()
    }

    /// Marks a connected peer as trusted for historic replay.
    pub fn mark_trusted(&self, id: &PeerId) -> Result<(), ShhError> {
        let peer = self.get(id).ok_or(ShhError::PeerNotFound(*id))?;
        peer.mark_trusted();
        Ok(())
    }

    pub fn is_trusted(&self, id: &PeerId) -> bool {
        self.get(id).is_some_and(|p| p.is_trusted())
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
