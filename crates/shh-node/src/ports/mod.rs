//! Ports layer for the shh node.
//!
//! - Inbound (Driving) ports: API exposed to RPC and CLI layers
//! - Outbound (Driven) ports: time, watcher hub and mail server collaborators

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
