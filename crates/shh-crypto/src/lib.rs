//! # Shh Crypto - Key Material and Derivation Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | Keccak-256 | Envelope identity, proof-of-work |
//! | `identity` | secp256k1 | Asymmetric identities held by the key store |
//! | `symmetric` | OS RNG xor seeded PRNG | Symmetric key material generation |
//! | `kdf` | PBKDF2-HMAC-SHA256 | Version-tagged key derivation |
//!
//! ## Security Properties
//!
//! - Generated identities are validated (non-zero scalar, non-degenerate point)
//! - Symmetric material mixes two independent sources, so it is never weaker
//!   than the OS source even if the seeded PRNG degenerates
//! - Secret material is zeroized on drop

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod identity;
pub mod kdf;
pub mod symmetric;

// Re-exports
pub use errors::CryptoError;
pub use hashing::{keccak256, keccak256_many, Hash};
pub use identity::{IdentityKeyPair, IdentityPublicKey};
pub use kdf::{derive_key_material, derive_one_time_key, KDF_VERSION};
pub use symmetric::{mixed_random_bytes, validate_key_bytes, SymmetricKey, AES_KEY_LENGTH};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
