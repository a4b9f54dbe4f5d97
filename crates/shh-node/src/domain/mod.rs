//! # Domain Layer - Shh Node
//!
//! Pure state and rules with no task spawning or I/O.
//!
//! ## Components
//!
//! - `envelope`: Envelope fields, content hash and proof of work
//! - `admission`: Clock window, size and proof-of-work screening
//! - `pool`: Envelope/expiration pool and the decrypted message map
//! - `keystore`: Identities and named symmetric keys
//! - `peers`: Connected peers and their trust flag
//! - `config`, `errors`, `value_objects`: Supporting types
//!
//! Pool, key store and peer registry each own one lock. No operation in
//! this crate holds two of them at once.

pub mod admission;
pub mod config;
pub mod entities;
pub mod envelope;
pub mod errors;
pub mod keystore;
pub mod peers;
pub mod pool;
pub mod value_objects;

pub use admission::{screen, Screening};
pub use config::*;
pub use entities::*;
pub use envelope::*;
pub use errors::*;
pub use keystore::KeyStore;
pub use peers::{Peer, PeerRegistry};
pub use pool::{EnvelopePool, MessageSink};
pub use value_objects::*;
