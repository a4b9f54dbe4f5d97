//! Core domain entities for the shh node.

use shh_crypto::IdentityPublicKey;

/// Seconds since UNIX epoch.
pub type Timestamp = u64;

/// Identifier handed out by the filters collaborator for a watch registration.
pub type FilterId = u32;

/// Content hash of an envelope (Keccak-256), its stable identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnvelopeHash(pub [u8; 32]);

impl EnvelopeHash {
    /// Raw hash bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for EnvelopeHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Why an envelope is being handed to the watchers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageCode {
    /// Regular gossip accepted into the pool.
    Messages,
    /// Peer-to-peer delivery from a trusted peer (historic replay).
    Direct,
}

impl MessageCode {
    /// Wire code of the message kind.
    pub fn code(&self) -> u64 {
        match self {
            Self::Messages => 1,
            Self::Direct => 2,
        }
    }
}

/// A decrypted message produced by the matching/decryption collaborator.
///
/// Lives in the pool's message map under its envelope's hash and is swept
/// together with that envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceivedMessage {
    /// Hash of the envelope this message was decrypted from.
    pub envelope_hash: EnvelopeHash,
    /// Topic of the originating envelope.
    pub topic: [u8; 4],
    /// Decrypted payload.
    pub payload: Vec<u8>,
    /// Send time (expiry minus TTL) of the originating envelope.
    pub sent: u32,
    /// TTL of the originating envelope.
    pub ttl: u32,
    /// Signer recovered by the decryption layer, if the message was signed.
    pub src: Option<IdentityPublicKey>,
}

/// Peer identifier supplied by the connection-lifecycle collaborator.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(pub [u8; 64]);

impl PeerId {
    /// Create from a slice, which must be exactly 64 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Self)
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

impl std::fmt::Debug for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PeerId({})", self)
    }
}
