//! Value objects reported by the node.

use serde::Serialize;

/// Successful outcome of admitting an envelope.
///
/// None of these is an error; protocol violations are reported as
/// [`ShhError`](super::ShhError) instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Admission {
    /// Newly pooled.
    Accepted,
    /// Already pooled; nothing changed and nothing was dispatched.
    Duplicate,
    /// Expired within the tolerated staleness window.
    DroppedExpired,
    /// Proof of work below the minimum.
    DroppedLowPow,
}

impl Admission {
    /// Label used for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Duplicate => "duplicate",
            Self::DroppedExpired => "dropped_expired",
            Self::DroppedLowPow => "dropped_low_pow",
        }
    }

    /// Whether the pool was mutated.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Result of one expiration sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Buckets whose timestamp had passed.
    pub buckets_cleared: usize,
    /// Envelopes removed.
    pub envelopes_removed: usize,
    /// Decrypted messages removed alongside them.
    pub messages_removed: usize,
}

/// Point-in-time view of the node's state sizes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct NodeStatus {
    pub running: bool,
    pub envelopes: usize,
    pub messages: usize,
    pub expiry_buckets: usize,
    pub peers: usize,
    pub identities: usize,
    pub sym_keys: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admission_labels() {
        assert_eq!(Admission::Accepted.as_str(), "accepted");
        assert_eq!(Admission::DroppedLowPow.as_str(), "dropped_low_pow");
        assert!(Admission::Accepted.is_accepted());
        assert!(!Admission::Duplicate.is_accepted());
    }

    #[test]
    fn test_admission_serializes_as_label() {
        let json = serde_json::to_string(&Admission::DroppedExpired).unwrap();
        assert_eq!(json, format!("\"{}\"", Admission::DroppedExpired.as_str()));
    }
}
