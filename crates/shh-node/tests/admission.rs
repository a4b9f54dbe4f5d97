//! # Admission Control Tests
//!
//! Drive `ShhNode::add` through its clock, size and proof-of-work gates and
//! check the outcome classification plus the resulting pool state.

mod common;

use common::*;
use shh_node::{Admission, Envelope, EnvelopeParams, ShhApi, ShhConfig, ShhError};
use std::sync::Arc;

// =============================================================================
// IDEMPOTENCE
// =============================================================================

#[tokio::test]
async fn test_duplicate_admission_pools_and_dispatches_once() {
    let h = test_harness();
    h.node.start().unwrap();

    assert_eq!(h.node.add(envelope(1)).unwrap(), Admission::Accepted);
    assert_eq!(h.node.add(envelope(1)).unwrap(), Admission::Duplicate);
    h.node.stop().await;

    assert_eq!(h.node.list_envelopes().len(), 1);
    assert_eq!(h.hub.notified(), 1);
}

#[test]
fn test_send_is_add() {
    let h = test_harness();
    assert_eq!(h.node.send(envelope(1)).unwrap(), Admission::Accepted);
    assert_eq!(h.node.add(envelope(1)).unwrap(), Admission::Duplicate);
}

// =============================================================================
// CLOCK WINDOW
// =============================================================================

#[test]
fn test_future_dating_boundary() {
    let h = test_harness();
    let allowance = h.node.config().sync_allowance_secs;

    let err = h
        .node
        .add(envelope_at(NOW + allowance + 1, 60, 1))
        .unwrap_err();
    assert!(matches!(err, ShhError::CreatedInFuture { .. }));
    assert!(err.is_protocol_violation());

    assert_eq!(
        h.node.add(envelope_at(NOW + allowance - 1, 60, 2)).unwrap(),
        Admission::Accepted
    );
}

#[test]
fn test_future_dated_pow_uses_shortened_ttl() {
    // Sent 5 seconds ahead: admission rescores over ttl + 6, which drops the
    // score strictly below its unadjusted value.
    let ahead = envelope_at(NOW + 5, 60, 3);
    let mut rescored = ahead.clone();
    rescored.calculate_pow(6);
    assert!(rescored.pow() < ahead.pow());

    let h = harness(ShhConfig::default().with_minimum_pow(ahead.pow()));
    assert_eq!(h.node.add(ahead.clone()).unwrap(), Admission::DroppedLowPow);

    let h = harness(ShhConfig::default().with_minimum_pow(rescored.pow()));
    assert_eq!(h.node.add(ahead).unwrap(), Admission::Accepted);
}

#[test]
fn test_staleness_boundary() {
    let h = test_harness();
    let allowance = h.node.config().sync_allowance_secs;

    // expiry = now - 1
    let recent = envelope_at(NOW - 61, 60, 1);
    assert_eq!(h.node.add(recent).unwrap(), Admission::DroppedExpired);
    assert!(h.node.list_envelopes().is_empty());

    // expiry = now - 2 * allowance - 1
    let ancient = envelope_at(NOW - 2 * allowance - 61, 60, 2);
    let err = h.node.add(ancient).unwrap_err();
    assert!(matches!(err, ShhError::VeryOldMessage { .. }));
    assert!(err.is_protocol_violation());
}

// =============================================================================
// SIZES
// =============================================================================

#[test]
fn test_payload_size_boundary() {
    let h = test_harness();
    let max = h.node.config().max_message_size;
    let params = |len: usize| EnvelopeParams {
        version: vec![0],
        expiry: (NOW + 60) as u32,
        ttl: 60,
        data: vec![0x5A; len],
        ..EnvelopeParams::default()
    };

    assert_eq!(
        h.node.add(Envelope::new(params(max))).unwrap(),
        Admission::Accepted
    );
    assert!(matches!(
        h.node.add(Envelope::new(params(max + 1))),
        Err(ShhError::OversizedPayload { .. })
    ));
}

#[test]
fn test_version_longer_than_four_bytes_rejected() {
    let h = test_harness();
    let env = Envelope::new(EnvelopeParams {
        version: vec![0; 5],
        expiry: (NOW + 60) as u32,
        ttl: 60,
        ..EnvelopeParams::default()
    });
    let err = h.node.add(env).unwrap_err();
    assert!(matches!(err, ShhError::OversizedVersion { size: 5, max: 4 }));
}

// =============================================================================
// PROOF OF WORK
// =============================================================================

#[test]
fn test_pow_gate_respects_test_mode() {
    let strict = harness(ShhConfig::default().with_minimum_pow(1e12));
    assert_eq!(strict.node.add(envelope(1)).unwrap(), Admission::DroppedLowPow);
    assert!(strict.node.list_envelopes().is_empty());

    let lenient = harness(
        ShhConfig::default()
            .with_minimum_pow(1e12)
            .with_test_mode(true),
    );
    assert_eq!(lenient.node.add(envelope(1)).unwrap(), Admission::Accepted);
}

#[test]
fn test_sealed_envelope_meets_default_minimum() {
    let h = harness(ShhConfig::default());
    let mut env = envelope(9);
    assert!(env.seal(h.node.minimum_pow(), 1 << 22));
    assert_eq!(h.node.add(env).unwrap(), Admission::Accepted);
}

// =============================================================================
// CONCURRENCY
// =============================================================================

#[test]
fn test_concurrent_distinct_admissions() {
    const N: u64 = 256;
    let h = Arc::new(test_harness());

    std::thread::scope(|s| {
        for t in 0..8u64 {
            let h = h.clone();
            s.spawn(move || {
                for i in (t..N).step_by(8) {
                    assert_eq!(h.node.add(envelope(i)).unwrap(), Admission::Accepted);
                }
            });
        }
    });

    assert_eq!(h.node.list_envelopes().len(), N as usize);
}

#[test]
fn test_concurrent_same_envelope_accepted_once() {
    let h = Arc::new(test_harness());
    let outcomes: Vec<Admission> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let h = h.clone();
                s.spawn(move || h.node.add(envelope(42)).unwrap())
            })
            .collect();
        handles.into_iter().map(|j| j.join().unwrap()).collect()
    });

    assert_eq!(
        outcomes.iter().filter(|o| **o == Admission::Accepted).count(),
        1
    );
    assert_eq!(h.node.list_envelopes().len(), 1);
}
