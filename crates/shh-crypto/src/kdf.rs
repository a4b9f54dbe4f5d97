//! # Version-Tagged Key Derivation
//!
//! | Version | Function | Salt | Iterations |
//! |---------|----------|------|------------|
//! | 0 (password) | PBKDF2-HMAC-SHA256 | none | 65356 |
//! | 0 (one-time) | PBKDF2-HMAC-SHA256 | caller salt | 8 |
//!
//! The password variant is deliberately slow since it runs once per key
//! install. It carries no salt: name-scoped uniqueness is up to the caller.

use crate::symmetric::{SymmetricKey, AES_KEY_LENGTH};
use crate::CryptoError;
use sha2::Sha256;

/// The only derivation version currently understood.
pub const KDF_VERSION: u64 = 0;

/// Iterations for deriving keys from caller-supplied material.
pub const PASSWORD_ITERATIONS: u32 = 65_356;

/// Iterations for deriving keys from freshly generated random material.
pub const ONE_TIME_ITERATIONS: u32 = 8;

/// Derive a symmetric key from caller-supplied key material or a password.
///
/// # Errors
///
/// `UnknownKdfVersion` for any version other than [`KDF_VERSION`].
pub fn derive_key_material(key: &[u8], version: u64) -> Result<SymmetricKey, CryptoError> {
    if version != KDF_VERSION {
        return Err(CryptoError::UnknownKdfVersion(version));
    }
    let mut output = [0u8; AES_KEY_LENGTH];
    pbkdf2::pbkdf2_hmac::<Sha256>(key, &[], PASSWORD_ITERATIONS, &mut output);
    Ok(SymmetricKey::from_bytes(output))
}

/// Derive a single-use key from random key and salt halves.
///
/// # Errors
///
/// `UnknownKdfVersion` for any version other than [`KDF_VERSION`].
pub fn derive_one_time_key(
    key: &[u8],
    salt: &[u8],
    version: u64,
) -> Result<SymmetricKey, CryptoError> {
    if version != KDF_VERSION {
        return Err(CryptoError::UnknownKdfVersion(version));
    }
    let mut output = [0u8; AES_KEY_LENGTH];
    pbkdf2::pbkdf2_hmac::<Sha256>(key, salt, ONE_TIME_ITERATIONS, &mut output);
    Ok(SymmetricKey::from_bytes(output))
}
