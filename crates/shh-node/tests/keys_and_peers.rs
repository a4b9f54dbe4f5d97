//! # Key Store and Peer Registry Tests

mod common;

use common::*;
use rand::rngs::mock::StepRng;
use shh_node::{Envelope, EnvelopeParams, MessageCode, ShhApi, ShhConfig, ShhError, ShhNode};
use std::sync::atomic::Ordering;
use std::sync::Arc;

// =============================================================================
// KEYS
// =============================================================================

#[test]
fn test_identity_crud() {
    let h = test_harness();
    let key = h.node.new_identity().unwrap();
    let id = key.public_key().to_hex();

    assert!(h.node.has_identity(&id));
    assert_eq!(h.node.get_identity(&id).unwrap().public_key(), key.public_key());
    assert_eq!(h.node.status().identities, 1);

    assert!(h.node.delete_identity(&id));
    assert!(!h.node.has_identity(&id));
    assert_eq!(
        h.node.get_identity(&id).unwrap_err(),
        ShhError::UnknownKey(id.clone())
    );
}

#[test]
fn test_broken_entropy_is_a_distinct_fatal_error() {
    let h = test_harness();
    let err = h
        .node
        .new_identity_with_rng(&mut StepRng::new(0, 0))
        .unwrap_err();
    assert!(err.is_fatal());
    assert!(!err.is_protocol_violation());
    assert_eq!(h.node.status().identities, 0);
}

#[test]
fn test_sym_key_names_are_unique() {
    let h = test_harness();
    h.node.generate_sym_key("alpha").unwrap();
    assert!(matches!(
        h.node.generate_sym_key("alpha"),
        Err(ShhError::DuplicateKeyName(_))
    ));
    assert!(matches!(
        h.node.add_sym_key("alpha", b"material"),
        Err(ShhError::DuplicateKeyName(_))
    ));

    h.node.add_sym_key("beta", b"material").unwrap();
    assert!(matches!(
        h.node.add_sym_key("beta", b"material"),
        Err(ShhError::DuplicateKeyName(_))
    ));

    let alpha = h.node.get_sym_key("alpha").unwrap();
    assert_ne!(alpha, h.node.get_sym_key("beta").unwrap());

    assert!(h.node.delete_sym_key("alpha"));
    assert!(!h.node.has_sym_key("alpha"));
    assert_eq!(
        h.node.get_sym_key("alpha"),
        Err(ShhError::UnknownKey("alpha".to_string()))
    );
    h.node.generate_sym_key("alpha").unwrap();
}

#[test]
fn test_concurrent_add_sym_key_single_winner() {
    const M: usize = 6;
    let h = Arc::new(test_harness());

    let results: Vec<Result<(), ShhError>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..M)
            .map(|i| {
                let h = h.clone();
                s.spawn(move || h.node.add_sym_key("room", format!("pw-{i}").as_bytes()))
            })
            .collect();
        handles.into_iter().map(|j| j.join().unwrap()).collect()
    });

    let wins = results.iter().filter(|r| r.is_ok()).count();
    let dups = results
        .iter()
        .filter(|r| matches!(r, Err(ShhError::DuplicateKeyName(_))))
        .count();
    assert_eq!(wins, 1);
    assert_eq!(dups, M - 1);
    assert_eq!(h.node.status().sym_keys, 1);
}

// =============================================================================
// PEERS
// =============================================================================

#[test]
fn test_mark_peer_trusted() {
    let h = test_harness();
    h.node.register_peer(peer_id(1));
    h.node.register_peer(peer_id(2));
    assert_eq!(h.node.peer_count(), 2);

    h.node.mark_peer_trusted(&peer_id(1)).unwrap();
    assert!(h.node.is_peer_trusted(&peer_id(1)));
    assert!(!h.node.is_peer_trusted(&peer_id(2)));

    assert_eq!(
        h.node.mark_peer_trusted(&peer_id(9)),
        Err(ShhError::PeerNotFound(peer_id(9)))
    );

    assert!(h.node.unregister_peer(&peer_id(1)));
    assert!(h.node.peer(&peer_id(1)).is_none());
    assert_eq!(h.node.peer_count(), 1);
}

#[test]
fn test_historic_request_gate() {
    let mail = Arc::new(RecordingMailServer::default());
    let hub = Arc::new(RecordingHub::default());
    let node = ShhNode::new(ShhConfig::for_testing(), hub)
        .unwrap()
        .with_mail_server(mail.clone());
    let request = envelope(1);

    assert_eq!(
        node.request_historic(&peer_id(1), &request),
        Err(ShhError::PeerNotFound(peer_id(1)))
    );

    node.register_peer(peer_id(1));
    assert_eq!(
        node.request_historic(&peer_id(1), &request),
        Err(ShhError::PeerNotTrusted(peer_id(1)))
    );

    node.mark_peer_trusted(&peer_id(1)).unwrap();
    node.request_historic(&peer_id(1), &request).unwrap();
    assert_eq!(*mail.served.lock(), vec![peer_id(1)]);

    // The pool is untouched by replay authorization, and archiving is left
    // to the mail server's owner.
    assert!(node.list_envelopes().is_empty());
    assert_eq!(mail.archived.load(Ordering::SeqCst), 0);
}

#[test]
fn test_historic_request_without_mail_server() {
    let h = test_harness();
    h.node.register_peer(peer_id(1));
    h.node.mark_peer_trusted(&peer_id(1)).unwrap();
    assert_eq!(
        h.node.request_historic(&peer_id(1), &envelope(1)),
        Err(ShhError::MailServerUnavailable)
    );
}

#[tokio::test]
async fn test_direct_envelopes_require_trust() {
    let h = test_harness();
    let filter = h.node.watch(Arc::new(TopicFilter([0xAB, 0xCD, 0, 0])));
    h.node.register_peer(peer_id(1));
    h.node.start().unwrap();

    assert_eq!(
        h.node.receive_direct(&peer_id(1), envelope(1)),
        Err(ShhError::PeerNotTrusted(peer_id(1)))
    );

    h.node.mark_peer_trusted(&peer_id(1)).unwrap();
    assert!(h.node.receive_direct(&peer_id(1), envelope(1)).unwrap());
    h.node.stop().await;

    assert_eq!(*h.hub.codes.lock(), vec![MessageCode::Direct]);
    assert!(h.node.list_envelopes().is_empty());
    // Decrypted results of unpooled envelopes are not kept.
    assert!(h.node.list_messages(filter).is_empty());
}

#[tokio::test]
async fn test_direct_envelope_above_version_ceiling_not_dispatched() {
    let h = test_harness();
    h.node.register_peer(peer_id(1));
    h.node.mark_peer_trusted(&peer_id(1)).unwrap();
    h.node.start().unwrap();

    let newer = Envelope::new(EnvelopeParams {
        version: vec![1],
        expiry: (NOW + 60) as u32,
        ttl: 60,
        data: vec![7; 8],
        ..EnvelopeParams::default()
    });
    assert!(!h.node.receive_direct(&peer_id(1), newer).unwrap());
    assert!(h.node.receive_direct(&peer_id(1), envelope(2)).unwrap());
    h.node.stop().await;

    assert_eq!(h.hub.notified(), 1);
    assert_eq!(*h.hub.codes.lock(), vec![MessageCode::Direct]);
}
