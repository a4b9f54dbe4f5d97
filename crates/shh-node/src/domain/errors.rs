//! Shh node error types.
//!
//! Protocol violations tell the caller the remote peer misbehaved and the
//! connection should be dropped. Silent drops are not errors at all; they are
//! reported through [`Admission`](super::Admission).

use super::config::ConfigError;
use super::entities::PeerId;
use shh_crypto::CryptoError;
use thiserror::Error;

/// Shh node error type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShhError {
    /// Send time lies beyond the tolerated clock skew.
    #[error("envelope created in the future: sent {sent}, now {now}")]
    CreatedInFuture { sent: u64, now: u64 },

    /// Expiry lies further in the past than twice the tolerated skew.
    #[error("very old message: expiry {expiry}, now {now}")]
    VeryOldMessage { expiry: u64, now: u64 },

    /// Payload exceeds the maximum message size.
    #[error("oversized payload: {size} bytes (max {max})")]
    OversizedPayload { size: usize, max: usize },

    /// Version tag exceeds the maximum length.
    #[error("oversized version: {size} bytes (max {max})")]
    OversizedVersion { size: usize, max: usize },

    /// Cipher nonce exceeds the maximum length.
    #[error("oversized nonce: {size} bytes (max {max})")]
    OversizedNonce { size: usize, max: usize },

    /// Salt exceeds the fixed length.
    #[error("oversized salt: {size} bytes (max {max})")]
    OversizedSalt { size: usize, max: usize },

    /// Key derivation requested with a version tag this node does not know.
    #[error("unknown key derivation version: {0}")]
    UnknownKdfVersion(u64),

    /// A key is already stored under this name.
    #[error("duplicate key name: {0}")]
    DuplicateKeyName(String),

    /// No key is stored under this name.
    #[error("unknown key: {0}")]
    UnknownKey(String),

    /// A random source produced an all-zero buffer.
    #[error("weak randomness from {0}")]
    WeakRandomness(&'static str),

    /// Identity generation failed twice. The entropy source is broken.
    #[error("identity generation failed after retry: {0}")]
    KeyGenerationFailed(String),

    /// No connected peer has this id.
    #[error("peer not found: {0}")]
    PeerNotFound(PeerId),

    /// Peer is connected but not authorized for historic replay.
    #[error("peer not trusted: {0}")]
    PeerNotTrusted(PeerId),

    /// Historic replay requested but no mail server is configured.
    #[error("no mail server configured")]
    MailServerUnavailable,

    /// The node was started outside a tokio runtime.
    #[error("no tokio runtime available: {0}")]
    RuntimeUnavailable(String),

    /// Key material could not be built or validated.
    #[error("crypto error: {0}")]
    Crypto(CryptoError),

    /// Configuration rejected by validation.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ShhError {
    /// Whether the error means the remote peer broke the protocol.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::CreatedInFuture { .. }
                | Self::VeryOldMessage { .. }
                | Self::OversizedPayload { .. }
                | Self::OversizedVersion { .. }
                | Self::OversizedNonce { .. }
                | Self::OversizedSalt { .. }
                | Self::UnknownKdfVersion(_)
        )
    }

    /// Whether the error is unrecoverable for this process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::KeyGenerationFailed(_))
    }

    /// Short label used for the violation metric.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::CreatedInFuture { .. } => "created_in_future",
            Self::VeryOldMessage { .. } => "very_old",
            Self::OversizedPayload { .. } => "oversized_payload",
            Self::OversizedVersion { .. } => "oversized_version",
            Self::OversizedNonce { .. } => "oversized_nonce",
            Self::OversizedSalt { .. } => "oversized_salt",
            Self::UnknownKdfVersion(_) => "unknown_kdf_version",
            Self::DuplicateKeyName(_) => "duplicate_key_name",
            Self::UnknownKey(_) => "unknown_key",
            Self::WeakRandomness(_) => "weak_randomness",
            Self::KeyGenerationFailed(_) => "key_generation_failed",
            Self::PeerNotFound(_) => "peer_not_found",
            Self::PeerNotTrusted(_) => "peer_not_trusted",
            Self::MailServerUnavailable => "mail_server_unavailable",
            Self::RuntimeUnavailable(_) => "runtime_unavailable",
            Self::Crypto(_) => "crypto",
            Self::Config(_) => "config",
        }
    }
}

impl From<CryptoError> for ShhError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::UnknownKdfVersion(v) => Self::UnknownKdfVersion(v),
            CryptoError::RandomSource { source_name, .. } => Self::WeakRandomness(source_name),
            other => Self::Crypto(other),
        }
    }
}
