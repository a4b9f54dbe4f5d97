//! # Shh Node
//!
//! Core of a node in a dark (pseudonymous) gossip overlay: it admits
//! proof-of-work stamped envelopes from peers, pools them until they expire,
//! and notifies registered watchers off the admission path.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Envelope hashes unique in the pool | `domain/pool.rs` - `insert()` check |
//! | Each pooled hash in exactly one expiry bucket | `domain/pool.rs` - `insert()` / `expire()` |
//! | Key names unique, never overwritten | `domain/keystore.rs` - double check around derivation |
//! | No sub-minimum PoW admitted outside test mode | `domain/admission.rs` - `screen()` |
//! | One lock per component, never two held | `service.rs` - each call touches one component |
//!
//! ## Admission Outcomes
//!
//! | Result | Meaning | Caller action |
//! |--------|---------|---------------|
//! | `Ok(Accepted)` | Pooled, dispatched if version supported | none |
//! | `Ok(Duplicate)` | Already pooled | none |
//! | `Ok(DroppedExpired)` / `Ok(DroppedLowPow)` | Background noise | none |
//! | `Err(e)` with `e.is_protocol_violation()` | Peer misbehaved | drop connection |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  service.rs  - ShhNode: lifecycle, admission, keys, peers       │
//! │  dispatch.rs - bounded watcher dispatch                         │
//! │  sweeper.rs  - periodic expiration sweep                        │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/inbound.rs  - ShhApi trait                               │
//! │  ports/outbound.rs - TimeSource, Filter, WatcherHub, MailServer │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  domain/ - envelope, admission, pool, keystore, peers           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shh_node::{ShhApi, ShhConfig, ShhNode};
//!
//! let node = ShhNode::new(ShhConfig::from_env()?, hub)?;
//! node.start()?;
//! match node.add(envelope) {
//!     Err(e) if e.is_protocol_violation() => connection.drop(),
//!     _ => {}
//! }
//! node.stop().await;
//! ```

pub mod domain;
pub mod ports;

mod dispatch;
mod service;
mod sweeper;

pub use domain::{
    Admission, ConfigError, Envelope, EnvelopeHash, EnvelopeParams, FilterId, MessageCode,
    MessageSink, NodeStatus, Peer, PeerId, ReceivedMessage, ShhConfig, ShhError, SweepReport,
    Timestamp,
};
pub use ports::{
    Filter, MailServer, ManualTimeSource, ShhApi, SystemTimeSource, TimeSource, WatcherHub,
};
pub use service::ShhNode;
pub use sweeper::sweep_once;
