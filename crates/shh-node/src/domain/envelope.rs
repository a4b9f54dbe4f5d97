//! # Envelope
//!
//! The gossiped unit: an encrypted payload plus expiry, TTL, version, nonce
//! and salt metadata, with a cached proof-of-work score.
//!
//! ## Proof of Work
//!
//! ```text
//! seal_hash = keccak256(encoding without env_nonce)
//! digest    = keccak256(seal_hash || 0^24 || env_nonce_be)
//! pow       = 2^trailing_zero_bits(digest) / size / (ttl + extra_ttl)
//! ```
//!
//! The score only changes through `calculate_pow`, which admission control
//! calls before the envelope is pooled. Pooled envelopes are immutable.

use super::entities::EnvelopeHash;
use shh_crypto::hashing::trailing_zero_bits;
use shh_crypto::{keccak256, keccak256_many};

/// Fixed overhead counted by [`Envelope::size`] (expiry, ttl, topic, env_nonce).
pub const ENVELOPE_HEADER_SIZE: usize = 20;

/// Construction parameters for an [`Envelope`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvelopeParams {
    /// Version tag, little-endian integer.
    pub version: Vec<u8>,
    /// Expiry time in unix seconds.
    pub expiry: u32,
    /// Time-to-live in seconds.
    pub ttl: u32,
    /// Topic tag.
    pub topic: [u8; 4],
    /// Key derivation salt.
    pub salt: Vec<u8>,
    /// Symmetric cipher nonce.
    pub aes_nonce: Vec<u8>,
    /// Encrypted payload.
    pub data: Vec<u8>,
    /// Proof-of-work nonce.
    pub env_nonce: u64,
}

/// A gossiped envelope.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    params: EnvelopeParams,
    pow: f64,
}

impl Envelope {
    /// Creates an envelope and computes its proof-of-work score.
    pub fn new(params: EnvelopeParams) -> Self {
        let mut envelope = Self { params, pow: 0.0 };
        envelope.calculate_pow(0);
        envelope
    }

    /// Version tag bytes.
    pub fn version(&self) -> &[u8] {
        &self.params.version
    }

    /// Expiry time in unix seconds.
    pub fn expiry(&self) -> u32 {
        self.params.expiry
    }

    /// Time-to-live in seconds.
    pub fn ttl(&self) -> u32 {
        self.params.ttl
    }

    /// Topic tag.
    pub fn topic(&self) -> [u8; 4] {
        self.params.topic
    }

    /// Key derivation salt.
    pub fn salt(&self) -> &[u8] {
        &self.params.salt
    }

    /// Symmetric cipher nonce.
    pub fn aes_nonce(&self) -> &[u8] {
        &self.params.aes_nonce
    }

    /// Encrypted payload.
    pub fn data(&self) -> &[u8] {
        &self.params.data
    }

    /// Proof-of-work nonce.
    pub fn env_nonce(&self) -> u64 {
        self.params.env_nonce
    }

    /// Cached proof-of-work score.
    pub fn pow(&self) -> f64 {
        self.pow
    }

    /// Version tag decoded as a little-endian integer.
    ///
    /// Only the first eight bytes contribute.
    pub fn ver(&self) -> u64 {
        self.params
            .version
            .iter()
            .take(8)
            .enumerate()
            .fold(0u64, |acc, (i, b)| acc | (u64::from(*b) << (8 * i)))
    }

    /// Size used in the proof-of-work denominator.
    pub fn size(&self) -> usize {
        self.params.data.len()
            + self.params.version.len()
            + self.params.aes_nonce.len()
            + self.params.salt.len()
            + ENVELOPE_HEADER_SIZE
    }

    /// Content hash over every field including the proof-of-work nonce.
    pub fn hash(&self) -> EnvelopeHash {
        let body = self.encode_without_nonce();
        EnvelopeHash(keccak256_many(&[&body, &self.params.env_nonce.to_be_bytes()]))
    }

    /// Recomputes the proof-of-work score as if the TTL were `ttl + extra_ttl`.
    pub fn calculate_pow(&mut self, extra_ttl: u32) {
        let seal_hash = keccak256(&self.encode_without_nonce());
        self.pow = self.pow_for_nonce(&seal_hash, self.params.env_nonce, extra_ttl);
    }

    /// Searches proof-of-work nonces, starting from the current one, until the
    /// score reaches `target`.
    ///
    /// Returns `false` if `max_iterations` nonces were tried without success;
    /// the envelope then keeps the best nonce found.
    pub fn seal(&mut self, target: f64, max_iterations: u64) -> bool {
        let seal_hash = keccak256(&self.encode_without_nonce());
        let mut best_nonce = self.params.env_nonce;
        let mut best_pow = self.pow_for_nonce(&seal_hash, best_nonce, 0);

        let mut nonce = best_nonce;
        for _ in 0..max_iterations {
            if best_pow >= target {
                break;
            }
            nonce = nonce.wrapping_add(1);
            let pow = self.pow_for_nonce(&seal_hash, nonce, 0);
            if pow > best_pow {
                best_pow = pow;
                best_nonce = nonce;
            }
        }

        self.params.env_nonce = best_nonce;
        self.pow = best_pow;
        best_pow >= target
    }

    fn pow_for_nonce(&self, seal_hash: &[u8; 32], nonce: u64, extra_ttl: u32) -> f64 {
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(seal_hash);
        buf[56..].copy_from_slice(&nonce.to_be_bytes());
        let zeros = trailing_zero_bits(&keccak256(&buf));

        let ttl = (u64::from(self.params.ttl) + u64::from(extra_ttl)).max(1);
        2f64.powi(zeros as i32) / self.size() as f64 / ttl as f64
    }

    /// Length-prefixed canonical encoding of every field except `env_nonce`.
    fn encode_without_nonce(&self) -> Vec<u8> {
        let p = &self.params;
        let mut out = Vec::with_capacity(self.size() + 16);
        push_prefixed(&mut out, &p.version);
        out.extend_from_slice(&p.expiry.to_be_bytes());
        out.extend_from_slice(&p.ttl.to_be_bytes());
        out.extend_from_slice(&p.topic);
        push_prefixed(&mut out, &p.salt);
        push_prefixed(&mut out, &p.aes_nonce);
        push_prefixed(&mut out, &p.data);
        out
    }
}

fn push_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(bytes);
}
