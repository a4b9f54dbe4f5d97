//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Invalid key length
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length in bytes
        expected: usize,
        /// Actual key length in bytes
        actual: usize,
    },

    /// Invalid public key
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Invalid private key
    #[error("Invalid private key")]
    InvalidPrivateKey,

    /// A randomness source produced unusable output (all zeros or I/O failure)
    #[error("Random source {source_name} failed: {reason}")]
    RandomSource {
        /// Which source failed ("os" or "seeded")
        source_name: &'static str,
        /// What went wrong
        reason: String,
    },

    /// Key derivation produced an all-zero key
    #[error("Key derivation produced invalid key material")]
    InvalidDerivedKey,

    /// Key derivation requested for an unsupported version tag
    #[error("Unknown key derivation version: {0}")]
    UnknownKdfVersion(u64),
}
