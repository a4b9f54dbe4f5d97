//! # Inbound Port - ShhApi
//!
//! Driving port consumed by RPC and CLI layers above the node.
//!
//! | Method | Lock touched |
//! |--------|--------------|
//! | `add`, `list_envelopes`, `list_messages` | pool |
//! | `watch`, `unwatch` | none (watcher hub) |
//! | identity and symmetric key methods | key store |
//! | `mark_peer_trusted` | peer registry |

use crate::domain::{Admission, Envelope, FilterId, PeerId, ReceivedMessage, ShhError};
use crate::ports::outbound::Filter;
use shh_crypto::{IdentityKeyPair, SymmetricKey};
use std::sync::Arc;

/// Primary API of the shh node.
pub trait ShhApi: Send + Sync {
    /// Screens an envelope and pools it if acceptable.
    ///
    /// # Errors
    /// Protocol violations (`is_protocol_violation() == true`). The caller
    /// should drop the connection that delivered the envelope.
    fn add(&self, envelope: Envelope) -> Result<Admission, ShhError>;

    /// Snapshot of all pooled envelopes.
    fn list_envelopes(&self) -> Vec<Arc<Envelope>>;

    /// Snapshot of decrypted messages matching a watch. Empty for unknown ids.
    fn list_messages(&self, filter_id: FilterId) -> Vec<ReceivedMessage>;

    fn watch(&self, filter: Arc<dyn Filter>) -> FilterId;

    fn unwatch(&self, filter_id: FilterId) -> bool;

    /// Generates and stores a new identity.
    ///
    /// # Errors
    /// `KeyGenerationFailed` is fatal: the entropy source is broken.
    fn new_identity(&self) -> Result<IdentityKeyPair, ShhError>;

    fn has_identity(&self, pub_key: &str) -> bool;

    /// # Errors
    /// `UnknownKey` if no identity is stored for `pub_key`.
    fn get_identity(&self, pub_key: &str) -> Result<IdentityKeyPair, ShhError>;

    fn delete_identity(&self, pub_key: &str) -> bool;

    fn generate_sym_key(&self, name: &str) -> Result<(), ShhError>;

    fn add_sym_key(&self, name: &str, material: &[u8]) -> Result<(), ShhError>;

    fn has_sym_key(&self, name: &str) -> bool;

    /// # Errors
    /// `UnknownKey` if nothing is stored under `name`.
    fn get_sym_key(&self, name: &str) -> Result<SymmetricKey, ShhError>;

    fn delete_sym_key(&self, name: &str) -> bool;

    /// Authorizes a connected peer for historic replay.
    fn mark_peer_trusted(&self, peer_id: &PeerId) -> Result<(), ShhError>;
}
