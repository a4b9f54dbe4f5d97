//! # Keccak-256 Hashing
//!
//! Envelope content hashes and proof-of-work digests.

use sha3::{Digest, Keccak256};

/// Keccak-256 output (256-bit).
pub type Hash = [u8; 32];

/// Hash data with Keccak-256 (one-shot).
pub fn keccak256(data: &[u8]) -> Hash {
    Keccak256::digest(data).into()
}

/// Hash multiple inputs as one continuous stream.
pub fn keccak256_many(inputs: &[&[u8]]) -> Hash {
    let mut hasher = Keccak256::new();
    for input in inputs {
        hasher.update(input);
    }
    hasher.finalize().into()
}

/// Number of trailing zero bits of a hash read as a big-endian integer.
///
/// A hash of all zeros reports 256.
pub fn trailing_zero_bits(hash: &Hash) -> u32 {
    let mut bits = 0;
    for byte in hash.iter().rev() {
        if *byte == 0 {
            bits += 8;
            continue;
        }
        bits += byte.trailing_zeros();
        break;
    }
    bits
}
