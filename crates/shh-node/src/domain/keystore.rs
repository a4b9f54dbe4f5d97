//! # Key Store
//!
//! Asymmetric identities keyed by their hex public key, and named symmetric
//! keys. One `RwLock` guards both maps.
//!
//! Key derivation is slow (tens of thousands of PBKDF2 rounds), so it runs
//! outside the lock. Names are checked before deriving and again under the
//! write lock, which leaves exactly one winner when callers race on a name.

use super::errors::ShhError;
use parking_lot::RwLock;
use rand::rngs::OsRng;
use rand::RngCore;
use shh_crypto::symmetric::mix_from;
use shh_crypto::{
    derive_key_material, derive_one_time_key, mixed_random_bytes, IdentityKeyPair, SymmetricKey,
    AES_KEY_LENGTH, KDF_VERSION,
};
use std::collections::HashMap;
use tracing::{debug, error, warn};

#[derive(Default)]
struct KeyState {
    identities: HashMap<String, IdentityKeyPair>,
    sym_keys: HashMap<String, SymmetricKey>,
}

/// Identity and symmetric key storage.
pub struct KeyStore {
    state: RwLock<KeyState>,
    kdf_version: u64,
}

impl Default for KeyStore {
    fn default() -> Self {
        Self::new(KDF_VERSION)
    }
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("KeyStore")
            .field("identities", &state.identities.len())
            .field("sym_keys", &state.sym_keys.len())
            .field("kdf_version", &self.kdf_version)
            .finish()
    }
}

impl KeyStore {
    /// Creates an empty store deriving keys with the given version tag.
    pub fn new(kdf_version: u64) -> Self {
        Self {
            state: RwLock::new(KeyState::default()),
            kdf_version,
        }
    }

    // =========================================================================
    // IDENTITIES
    // =========================================================================

    /// Generates and stores a new identity from the OS entropy source.
    pub fn new_identity(&self) -> Result<IdentityKeyPair, ShhError> {
        self.new_identity_with_rng(&mut OsRng)
    }

    /// Generates and stores a new identity from `rng`.
    ///
    /// Generation is retried once. A second invalid key means the entropy
    /// source is broken and yields the fatal
    /// [`ShhError::KeyGenerationFailed`].
    pub fn new_identity_with_rng<R: RngCore + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<IdentityKeyPair, ShhError> {
        let key = match generate_valid(rng) {
            Ok(key) => key,
            Err(first) => {
                warn!(reason = %first, "Identity generation failed, retrying once");
                generate_valid(rng).map_err(|second| {
                    error!(reason = %second, "Identity generation failed twice");
                    ShhError::KeyGenerationFailed(second)
                })?
            }
        };

        let id = key.public_key().to_hex();
        let mut state = self.state.write();
        if state.identities.contains_key(&id) {
            return Err(ShhError::DuplicateKeyName(id));
        }
        state.identities.insert(id, key.clone());
        Ok(key)
    }

    /// Whether an identity with this public key is stored.
    pub fn has_identity(&self, pub_key: &str) -> bool {
        self.state.read().identities.contains_key(pub_key)
    }

    /// Returns the key pair for a public key.
    pub fn get_identity(&self, pub_key: &str) -> Option<IdentityKeyPair> {
        self.state.read().identities.get(pub_key).cloned()
    }

    /// Removes an identity. Returns whether one was stored.
    pub fn delete_identity(&self, pub_key: &str) -> bool {
        self.state.write().identities.remove(pub_key).is_some()
    }

    /// Number of stored identities.
    pub fn identity_count(&self) -> usize {
        self.state.read().identities.len()
    }

    // =========================================================================
    // SYMMETRIC KEYS
    // =========================================================================

    /// Generates a random symmetric key and stores it under `name`.
    pub fn generate_sym_key(&self, name: &str) -> Result<(), ShhError> {
        self.ensure_absent(name)?;
        let buf = mixed_random_bytes::<{ AES_KEY_LENGTH * 2 }>()?;
        self.store_one_time_key(name, buf)
    }

    /// Same as [`generate_sym_key`](Self::generate_sym_key) with explicit
    /// strong and weak random sources.
    pub fn generate_sym_key_with<S, W>(
        &self,
        name: &str,
        strong: &mut S,
        weak: &mut W,
    ) -> Result<(), ShhError>
    where
        S: RngCore + ?Sized,
        W: RngCore + ?Sized,
    {
        self.ensure_absent(name)?;
        let buf = mix_from::<{ AES_KEY_LENGTH * 2 }, S, W>(strong, weak)?;
        self.store_one_time_key(name, buf)
    }

    /// Derives a symmetric key from caller-supplied material and stores it
    /// under `name`.
    pub fn add_sym_key(&self, name: &str, material: &[u8]) -> Result<(), ShhError> {
        self.ensure_absent(name)?;
        let derived = derive_key_material(material, self.kdf_version)?;
        self.insert_sym_key(name, derived)
    }

    /// Whether a symmetric key is stored under `name`.
    pub fn has_sym_key(&self, name: &str) -> bool {
        self.state.read().sym_keys.contains_key(name)
    }

    /// Returns the symmetric key stored under `name`.
    pub fn get_sym_key(&self, name: &str) -> Option<SymmetricKey> {
        self.state.read().sym_keys.get(name).cloned()
    }

    /// Removes a symmetric key. Returns whether one was stored.
    pub fn delete_sym_key(&self, name: &str) -> bool {
        self.state.write().sym_keys.remove(name).is_some()
    }

    /// Number of stored symmetric keys.
    pub fn sym_key_count(&self) -> usize {
        self.state.read().sym_keys.len()
    }

    fn ensure_absent(&self, name: &str) -> Result<(), ShhError> {
        if self.has_sym_key(name) {
            return Err(ShhError::DuplicateKeyName(name.to_string()));
        }
        Ok(())
    }

    fn store_one_time_key(
        &self,
        name: &str,
        mut buf: [u8; AES_KEY_LENGTH * 2],
    ) -> Result<(), ShhError> {
        let (key, salt) = buf.split_at(AES_KEY_LENGTH);
        let derived = derive_one_time_key(key, salt, self.kdf_version);
        zeroize::Zeroize::zeroize(&mut buf);
        let derived = derived?;
        if !derived.is_valid() {
            return Err(ShhError::Crypto(shh_crypto::CryptoError::InvalidDerivedKey));
        }
        self.insert_sym_key(name, derived)
    }

    fn insert_sym_key(&self, name: &str, key: SymmetricKey) -> Result<(), ShhError> {
        let mut state = self.state.write();
        if state.sym_keys.contains_key(name) {
            debug!(name, "Lost race for symmetric key name");
            return Err(ShhError::DuplicateKeyName(name.to_string()));
        }
        state.sym_keys.insert(name.to_string(), key);
        Ok(())
    }
}

fn generate_valid<R: RngCore + ?Sized>(rng: &mut R) -> Result<IdentityKeyPair, String> {
    match IdentityKeyPair::generate_with(rng) {
        Ok(key) if key.is_valid() => Ok(key),
        Ok(_) => Err("degenerate key pair".to_string()),
        Err(e) => Err(e.to_string()),
    }
}
