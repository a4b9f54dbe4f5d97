//! # Asymmetric Identities (secp256k1)
//!
//! Key pairs held by the node's key store and consumed by the external
//! envelope encryption layer.
//!
//! ## Validation
//!
//! A usable identity has a non-zero private scalar and a public point whose
//! affine coordinates are both non-zero. Generation draws raw scalar bytes
//! from the supplied RNG and rejects anything `k256` refuses (zero or
//! out-of-range), so a broken entropy source surfaces as an error instead
//! of an endless retry loop.

use crate::CryptoError;
use k256::ecdsa::{SigningKey, VerifyingKey};
use rand::RngCore;
use zeroize::Zeroize;

/// Uncompressed SEC1 public key (65 bytes, `0x04 || X || Y`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IdentityPublicKey([u8; 65]);

impl IdentityPublicKey {
    /// Create from uncompressed SEC1 bytes, validating the point.
    pub fn from_bytes(bytes: [u8; 65]) -> Result<Self, CryptoError> {
        VerifyingKey::from_sec1_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        let key = Self(bytes);
        if !key.is_valid() {
            return Err(CryptoError::InvalidPublicKey);
        }
        Ok(key)
    }

    /// Get raw uncompressed bytes.
    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }

    /// `0x`-prefixed hex encoding, the key store's identity name.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Both affine coordinates are non-zero.
    pub fn is_valid(&self) -> bool {
        let x = &self.0[1..33];
        let y = &self.0[33..65];
        self.0[0] == 0x04 && x.iter().any(|b| *b != 0) && y.iter().any(|b| *b != 0)
    }
}

/// secp256k1 identity key pair.
#[derive(Clone)]
pub struct IdentityKeyPair {
    signing_key: SigningKey,
}

impl IdentityKeyPair {
    /// Generate a key pair from the thread-local CSPRNG.
    pub fn generate() -> Result<Self, CryptoError> {
        Self::generate_with(&mut rand::thread_rng())
    }

    /// Generate a key pair from caller-supplied entropy.
    ///
    /// # Errors
    ///
    /// `InvalidPrivateKey` if the drawn bytes are not a valid scalar.
    pub fn generate_with<R: RngCore + ?Sized>(rng: &mut R) -> Result<Self, CryptoError> {
        let mut bytes = [0u8; 32];
        rng.try_fill_bytes(&mut bytes)
            .map_err(|e| CryptoError::RandomSource {
                source_name: "os",
                reason: e.to_string(),
            })?;
        let result = Self::from_bytes(bytes);
        bytes.zeroize();
        result
    }

    /// Create from secret scalar bytes (32 bytes, big-endian).
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_bytes((&bytes).into()).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Get public key (uncompressed, 65 bytes).
    pub fn public_key(&self) -> IdentityPublicKey {
        let point = self.signing_key.verifying_key().to_encoded_point(false);
        let mut bytes = [0u8; 65];
        let encoded = point.as_bytes();
        // Uncompressed SEC1 points are always 65 bytes; anything else stays
        // zeroed and fails `is_valid`.
        if encoded.len() == 65 {
            bytes.copy_from_slice(encoded);
        }
        IdentityPublicKey(bytes)
    }

    /// Private scalar is non-zero and the public point is non-degenerate.
    pub fn is_valid(&self) -> bool {
        let mut scalar: [u8; 32] = self.signing_key.to_bytes().into();
        let nonzero = scalar.iter().any(|b| *b != 0);
        scalar.zeroize();
        nonzero && self.public_key().is_valid()
    }

    /// Get secret scalar bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes().into()
    }
}

impl std::fmt::Debug for IdentityKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityKeyPair")
            .field("public_key", &self.public_key().to_hex())
            .finish_non_exhaustive()
    }
}
