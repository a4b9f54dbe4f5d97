//! # Symmetric Key Material
//!
//! Named symmetric keys are 256-bit values produced either by key derivation
//! over caller-supplied material or by mixing two independent randomness
//! sources.
//!
//! ## Entropy Mixing
//!
//! Fresh material is `os ^ seeded`, where `os` comes from the operating
//! system CSPRNG and `seeded` from a PRNG seeded with the wall clock. The
//! result is at least as unpredictable as the OS source alone even if the
//! seeded source collapses to a constant. Both buffers must be non-zero.

use crate::CryptoError;
use rand::rngs::{OsRng, SmallRng};
use rand::{RngCore, SeedableRng};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// AES-256 key length in bytes.
pub const AES_KEY_LENGTH: usize = 32;

/// Symmetric key (256-bit).
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; AES_KEY_LENGTH]);

impl SymmetricKey {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; AES_KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, checking the length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; AES_KEY_LENGTH] =
            bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
                expected: AES_KEY_LENGTH,
                actual: bytes.len(),
            })?;
        Ok(Self(array))
    }

    /// Get inner bytes.
    pub fn as_bytes(&self) -> &[u8; AES_KEY_LENGTH] {
        &self.0
    }

    /// Key is non-empty and not all zeros.
    pub fn is_valid(&self) -> bool {
        validate_key_bytes(&self.0)
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey(..)")
    }
}

/// Returns false for empty or all-zero key material.
pub fn validate_key_bytes(bytes: &[u8]) -> bool {
    !bytes.is_empty() && bytes.iter().any(|b| *b != 0)
}

/// Draw `N` bytes from the OS CSPRNG xor a clock-seeded PRNG.
pub fn mixed_random_bytes<const N: usize>() -> Result<[u8; N], CryptoError> {
    let seed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    let mut seeded = SmallRng::seed_from_u64(seed);
    mix_from(&mut OsRng, &mut seeded)
}

/// Mix two sources into `N` bytes. Exposed for deterministic tests.
pub fn mix_from<const N: usize, S, W>(strong: &mut S, weak: &mut W) -> Result<[u8; N], CryptoError>
where
    S: RngCore + ?Sized,
    W: RngCore + ?Sized,
{
    let mut buf = [0u8; N];
    strong
        .try_fill_bytes(&mut buf)
        .map_err(|e| CryptoError::RandomSource {
            source_name: "os",
            reason: e.to_string(),
        })?;
    if !validate_key_bytes(&buf) {
        return Err(CryptoError::RandomSource {
            source_name: "os",
            reason: "produced all-zero output".to_string(),
        });
    }

    let mut buf2 = [0u8; N];
    weak.fill_bytes(&mut buf2);
    if !validate_key_bytes(&buf2) {
        buf.zeroize();
        return Err(CryptoError::RandomSource {
            source_name: "seeded",
            reason: "produced all-zero output".to_string(),
        });
    }

    for (dst, src) in buf.iter_mut().zip(buf2.iter()) {
        *dst ^= src;
    }
    buf2.zeroize();
    Ok(buf)
}
