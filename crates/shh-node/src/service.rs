//! # Shh Node Service
//!
//! [`ShhNode`] owns the pool, key store and peer registry and wires them to
//! the outbound collaborators. It is constructed once and shared by
//! reference; nothing in this crate is a process-wide singleton.
//!
//! ## Lifecycle
//!
//! ```text
//! new() --> start() --> [sweeper + dispatcher running] --> stop().await
//! ```
//!
//! Envelopes added before `start()` are pooled and their notifications wait
//! in the dispatch queue.

use crate::dispatch::{run_dispatcher, DispatchJob, Dispatcher};
use crate::domain::{
    screen, Admission, Envelope, EnvelopePool, FilterId, KeyStore, MessageCode, MessageSink,
    NodeStatus, Peer, PeerId, PeerRegistry, ReceivedMessage, Screening, ShhConfig, ShhError,
    SweepReport,
};
use crate::ports::{Filter, MailServer, ShhApi, SystemTimeSource, TimeSource, WatcherHub};
use crate::sweeper::{run_sweeper, sweep_once};
use parking_lot::Mutex;
use rand::RngCore;
use shh_crypto::{IdentityKeyPair, SymmetricKey, KDF_VERSION};
use shh_telemetry::{
    log_envelope_event, log_peer_event, ADMISSIONS, ENVELOPES_POOLED, IDENTITIES_STORED,
    PEERS_CONNECTED, PROTOCOL_VIOLATIONS, SYM_KEYS_STORED,
};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Default)]
struct Lifecycle {
    pending_rx: Option<mpsc::Receiver<DispatchJob>>,
    shutdown_tx: Option<watch::Sender<bool>>,
    handles: Vec<JoinHandle<()>>,
}

/// A node of the dark gossip overlay.
pub struct ShhNode {
    config: ShhConfig,
    pool: Arc<EnvelopePool>,
    keys: KeyStore,
    peers: PeerRegistry,
    hub: Arc<dyn WatcherHub>,
    clock: Arc<dyn TimeSource>,
    mail_server: Option<Arc<dyn MailServer>>,
    dispatcher: Dispatcher,
    lifecycle: Mutex<Lifecycle>,
}

impl ShhNode {
    /// Creates a stopped node.
    ///
    /// # Errors
    /// `Config` if the configuration does not validate.
    pub fn new(config: ShhConfig, hub: Arc<dyn WatcherHub>) -> Result<Self, ShhError> {
        config.validate()?;
        let (dispatcher, rx) = Dispatcher::channel(config.dispatch_queue_capacity);
        Ok(Self {
            config,
            pool: Arc::new(EnvelopePool::new()),
            keys: KeyStore::new(KDF_VERSION),
            peers: PeerRegistry::new(),
            hub,
            clock: Arc::new(SystemTimeSource),
            mail_server: None,
            dispatcher,
            lifecycle: Mutex::new(Lifecycle {
                pending_rx: Some(rx),
                ..Lifecycle::default()
            }),
        })
    }

    /// Replaces the system clock.
    pub fn with_time_source(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    /// Attaches a mail server for historic replay.
    pub fn with_mail_server(mut self, server: Arc<dyn MailServer>) -> Self {
        self.mail_server = Some(server);
        self
    }

    pub fn config(&self) -> &ShhConfig {
        &self.config
    }

    pub fn minimum_pow(&self) -> f64 {
        self.config.minimum_pow
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Spawns the sweeper and the dispatcher on the current tokio runtime.
    ///
    /// Starting a running node is a no-op. A stopped node cannot be
    /// restarted; the call logs a warning and does nothing.
    ///
    /// # Errors
    /// `RuntimeUnavailable` when called outside a tokio runtime.
    pub fn start(&self) -> Result<(), ShhError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ShhError::RuntimeUnavailable(e.to_string()))?;

        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.shutdown_tx.is_some() {
            warn!("Shh node already running");
            return Ok(());
        }
        let Some(rx) = lifecycle.pending_rx.take() else {
            warn!("Shh node was stopped and cannot be restarted");
            return Ok(());
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let sweeper = runtime.spawn(run_sweeper(
            self.pool.clone(),
            self.clock.clone(),
            self.config.expiration_cycle,
            shutdown_rx.clone(),
        ));
        let dispatcher = runtime.spawn(run_dispatcher(
            rx,
            self.hub.clone(),
            MessageSink::new(self.pool.clone()),
            self.config.dispatch_concurrency,
            shutdown_rx,
        ));

        lifecycle.shutdown_tx = Some(shutdown_tx);
        lifecycle.handles = vec![sweeper, dispatcher];

        info!(
            minimum_pow = self.config.minimum_pow,
            cycle_ms = self.config.expiration_cycle.as_millis() as u64,
            test_mode = self.config.test_mode,
            "Shh node started"
        );
        Ok(())
    }

    /// Signals shutdown and waits for the background tasks to finish.
    ///
    /// In-flight sweeps and dispatch units complete first.
    pub async fn stop(&self) {
        let (shutdown_tx, handles) = {
            let mut lifecycle = self.lifecycle.lock();
            (
                lifecycle.shutdown_tx.take(),
                std::mem::take(&mut lifecycle.handles),
            )
        };
        let Some(shutdown_tx) = shutdown_tx else {
            debug!("Shh node not running");
            return;
        };

        let _ = shutdown_tx.send(true);
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Background task failed");
            }
        }
        info!("Shh node stopped");
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle.lock().shutdown_tx.is_some()
    }

    /// Runs one expiration sweep immediately.
    pub fn sweep_expired(&self) -> SweepReport {
        sweep_once(&self.pool, self.clock.now())
    }

    pub fn status(&self) -> NodeStatus {
        let (envelopes, messages, expiry_buckets) = self.pool.counts();
        NodeStatus {
            running: self.is_running(),
            envelopes,
            messages,
            expiry_buckets,
            peers: self.peers.len(),
            identities: self.keys.identity_count(),
            sym_keys: self.keys.sym_key_count(),
        }
    }

    // =========================================================================
    // ADMISSION
    // =========================================================================

    fn admit(&self, mut envelope: Envelope) -> Result<Admission, ShhError> {
        let now = self.clock.now();
        match screen(&mut envelope, now, &self.config) {
            Err(e) => {
                PROTOCOL_VIOLATIONS.with_label_values(&[e.reason()]).inc();
                warn!(
                    reason = e.reason(),
                    expiry = envelope.expiry(),
                    ttl = envelope.ttl(),
                    now,
                    "Rejected envelope"
                );
                return Err(e);
            }
            Ok(Screening::Drop(outcome)) => {
                ADMISSIONS.with_label_values(&[outcome.as_str()]).inc();
                debug!(
                    outcome = outcome.as_str(),
                    expiry = envelope.expiry(),
                    pow = envelope.pow(),
                    "Dropped envelope"
                );
                return Ok(outcome);
            }
            Ok(Screening::Admit) => {}
        }

        let hash = envelope.hash();
        let envelope = Arc::new(envelope);
        if !self.pool.insert(hash, envelope.clone()) {
            ADMISSIONS.with_label_values(&[Admission::Duplicate.as_str()]).inc();
            log_envelope_event!(trace, "Duplicate envelope", hash);
            return Ok(Admission::Duplicate);
        }

        ADMISSIONS.with_label_values(&[Admission::Accepted.as_str()]).inc();
        ENVELOPES_POOLED.inc();
        log_envelope_event!(debug, "Envelope pooled", hash, expiry = envelope.expiry());

        self.dispatch(envelope, MessageCode::Messages);
        Ok(Admission::Accepted)
    }

    /// Queues an envelope for the watchers if this node understands its
    /// version. Newer formats are relayed but not interpreted locally.
    fn dispatch(&self, envelope: Arc<Envelope>, code: MessageCode) -> bool {
        if envelope.ver() > self.config.envelope_version {
            debug!(
                version = envelope.ver(),
                ceiling = self.config.envelope_version,
                "Skipping dispatch of newer envelope version"
            );
            return false;
        }
        self.dispatcher.enqueue(envelope, code)
    }

    /// Injects a locally originated envelope. Same rules as [`ShhApi::add`].
    pub fn send(&self, envelope: Envelope) -> Result<Admission, ShhError> {
        self.admit(envelope)
    }

    /// Hands an envelope received directly from a trusted peer to the
    /// watchers without pooling it.
    ///
    /// Returns whether the envelope was queued. Envelopes above the local
    /// version ceiling are not queued. Since the envelope is never pooled,
    /// decrypted results delivered through the [`MessageSink`] are discarded
    /// and never show up in [`ShhApi::list_messages`].
    pub fn receive_direct(&self, peer_id: &PeerId, envelope: Envelope) -> Result<bool, ShhError> {
        let peer = self
            .peers
            .get(peer_id)
            .ok_or(ShhError::PeerNotFound(*peer_id))?;
        if !peer.is_trusted() {
            log_peer_event!(warn, "Direct envelope from untrusted peer", peer_id);
            return Err(ShhError::PeerNotTrusted(*peer_id));
        }
        Ok(self.dispatch(Arc::new(envelope), MessageCode::Direct))
    }

    // =========================================================================
    // PEERS
    // =========================================================================

    pub fn register_peer(&self, id: PeerId) -> Arc<Peer> {
        let peer = self.peers.register(id);
        PEERS_CONNECTED.set(self.peers.len() as f64);
        log_peer_event!(debug, "Peer connected", id);
        peer
    }

    pub fn unregister_peer(&self, id: &PeerId) -> bool {
        let removed = self.peers.unregister(id);
        PEERS_CONNECTED.set(self.peers.len() as f64);
        if removed {
            log_peer_event!(debug, "Peer disconnected", id);
        }
        removed
    }

    pub fn peer(&self, id: &PeerId) -> Option<Arc<Peer>> {
        self.peers.get(id)
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn is_peer_trusted(&self, id: &PeerId) -> bool {
        self.peers.is_trusted(id)
    }

    /// Forwards a historic replay request to the mail server.
    ///
    /// # Errors
    /// - `PeerNotFound`: no such connection
    /// - `PeerNotTrusted`: peer was never marked trusted
    /// - `MailServerUnavailable`: no mail server attached
    pub fn request_historic(&self, peer_id: &PeerId, request: &Envelope) -> Result<(), ShhError> {
        let peer = self
            .peers
            .get(peer_id)
            .ok_or(ShhError::PeerNotFound(*peer_id))?;
        if !peer.is_trusted() {
            return Err(ShhError::PeerNotTrusted(*peer_id));
        }
        let server = self
            .mail_server
            .as_ref()
            .ok_or(ShhError::MailServerUnavailable)?;
        server.deliver_mail(&peer, request);
        log_peer_event!(debug, "Historic request served", peer_id);
        Ok(())
    }

    // =========================================================================
    // KEYS
    // =========================================================================

    /// Same as [`ShhApi::new_identity`] with caller-supplied entropy.
    pub fn new_identity_with_rng<R: RngCore + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<IdentityKeyPair, ShhError> {
        let result = self.keys.new_identity_with_rng(rng);
        self.record_key_counts();
        result
    }

    fn record_key_counts(&self) {
        IDENTITIES_STORED.set(self.keys.identity_count() as f64);
        SYM_KEYS_STORED.set(self.keys.sym_key_count() as f64);
    }
}

impl ShhApi for ShhNode {
    fn add(&self, envelope: Envelope) -> Result<Admission, ShhError> {
        self.admit(envelope)
    }

    fn list_envelopes(&self) -> Vec<Arc<Envelope>> {
        self.pool.envelopes()
    }

    fn list_messages(&self, filter_id: FilterId) -> Vec<ReceivedMessage> {
        // Filter first: the hub has its own lock and the pool lock must be
        // taken alone.
        match self.hub.get(filter_id) {
            Some(filter) => self.pool.messages_matching(|m| filter.matches_message(m)),
            None => Vec::new(),
        }
    }

    fn watch(&self, filter: Arc<dyn Filter>) -> FilterId {
        self.hub.install(filter)
    }

    fn unwatch(&self, filter_id: FilterId) -> bool {
        self.hub.uninstall(filter_id)
    }

    fn new_identity(&self) -> Result<IdentityKeyPair, ShhError> {
        let result = self.keys.new_identity();
        if let Err(e) = &result {
            if e.is_fatal() {
                error!(error = %e, "Entropy source is broken");
            }
        }
        self.record_key_counts();
        result
    }

    fn has_identity(&self, pub_key: &str) -> bool {
        self.keys.has_identity(pub_key)
    }

    fn get_identity(&self, pub_key: &str) -> Result<IdentityKeyPair, ShhError> {
        self.keys
            .get_identity(pub_key)
            .ok_or_else(|| ShhError::UnknownKey(pub_key.to_string()))
    }

    fn delete_identity(&self, pub_key: &str) -> bool {
        let removed = self.keys.delete_identity(pub_key);
        self.record_key_counts();
        removed
    }

    fn generate_sym_key(&self, name: &str) -> Result<(), ShhError> {
        let result = self.keys.generate_sym_key(name);
        self.record_key_counts();
        result
    }

    fn add_sym_key(&self, name: &str, material: &[u8]) -> Result<(), ShhError> {
        let result = self.keys.add_sym_key(name, material);
        self.record_key_counts();
        result
    }

    fn has_sym_key(&self, name: &str) -> bool {
        self.keys.has_sym_key(name)
    }

    fn get_sym_key(&self, name: &str) -> Result<SymmetricKey, ShhError> {
        self.keys
            .get_sym_key(name)
            .ok_or_else(|| ShhError::UnknownKey(name.to_string()))
    }

    fn delete_sym_key(&self, name: &str) -> bool {
        let removed = self.keys.delete_sym_key(name);
        self.record_key_counts();
        removed
    }

    fn mark_peer_trusted(&self, peer_id: &PeerId) -> Result<(), ShhError> {
        self.peers.mark_trusted(peer_id)?;
        log_peer_event!(info, "Peer marked trusted", peer_id);
        Ok(())
    }
}

impl Drop for ShhNode {
    fn drop(&mut self) {
        if let Some(tx) = self.lifecycle.get_mut().shutdown_tx.take() {
            let _ = tx.send(true);
        }
    }
}

impl std::fmt::Debug for ShhNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShhNode")
            .field("config", &self.config)
            .field("status", &self.status())
            .finish()
    }
}
