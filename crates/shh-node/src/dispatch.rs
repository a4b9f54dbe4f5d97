//! # Watcher Dispatch
//!
//! Hands newly accepted envelopes to the [`WatcherHub`] off the admission
//! path.
//!
//! ```text
//! add() --try_send--> [bounded queue] --> dispatcher loop --spawn--> notify_watchers()
//!                                              |
//!                                        semaphore (N permits)
//! ```
//!
//! Admission never waits: a full queue drops the notification (the envelope
//! stays pooled) and counts it, so under backpressure delivery is at most
//! once rather than at least once. At most `dispatch_concurrency` notification
//! units run at once. On shutdown the queue is closed to new work, jobs
//! already queued are still run, and the loop waits for every unit it spawned.

use crate::domain::{Envelope, MessageCode, MessageSink};
use crate::ports::WatcherHub;
use shh_telemetry::{DISPATCH_DROPPED, DISPATCH_QUEUED};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, Semaphore};
use tracing::{debug, warn};

/// One pending notification.
#[derive(Debug)]
pub(crate) struct DispatchJob {
    envelope: Arc<Envelope>,
    code: MessageCode,
}

/// Sending half of the dispatch queue.
#[derive(Debug, Clone)]
pub(crate) struct Dispatcher {
    tx: mpsc::Sender<DispatchJob>,
}

impl Dispatcher {
    /// Creates the queue. The receiver is handed to [`run_dispatcher`].
    pub(crate) fn channel(capacity: usize) -> (Self, mpsc::Receiver<DispatchJob>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Queues a notification without blocking. Returns whether it was queued.
    pub(crate) fn enqueue(&self, envelope: Arc<Envelope>, code: MessageCode) -> bool {
        match self.tx.try_send(DispatchJob { envelope, code }) {
            Ok(()) => {
                DISPATCH_QUEUED.inc();
                true
            }
            Err(TrySendError::Full(job)) => {
                DISPATCH_DROPPED.inc();
                warn!(
                    envelope = %job.envelope.hash(),
                    capacity = self.tx.max_capacity(),
                    "Dispatch queue full, dropping watcher notification"
                );
                false
            }
            Err(TrySendError::Closed(job)) => {
                DISPATCH_DROPPED.inc();
                debug!(envelope = %job.envelope.hash(), "Dispatcher stopped, dropping notification");
                false
            }
        }
    }
}

/// Receives queued jobs and runs each as its own task until shutdown.
pub(crate) async fn run_dispatcher(
    mut rx: mpsc::Receiver<DispatchJob>,
    hub: Arc<dyn WatcherHub>,
    sink: MessageSink,
    concurrency: usize,
    mut shutdown: watch::Receiver<bool>,
) {
    let permits = Arc::new(Semaphore::new(concurrency));

    loop {
        tokio::select! {
            biased;

            _ = shutdown.changed() => {
                debug!("Dispatcher received shutdown signal");
                break;
            }

            job = rx.recv() => {
                let Some(job) = job else { break };
                if !spawn_unit(&permits, &hub, &sink, job).await {
                    break;
                }
            }
        }
    }

    // Refuse new work, then run what was already queued.
    rx.close();
    while let Some(job) = rx.recv().await {
        if !spawn_unit(&permits, &hub, &sink, job).await {
            break;
        }
    }

    // Spawned units hold permits until they finish.
    let all = u32::try_from(concurrency).unwrap_or(u32::MAX);
    if permits.acquire_many(all).await.is_err() {
        warn!("Dispatch semaphore closed before in-flight units finished");
    }
    debug!("Dispatcher stopped");
}

/// Waits for a permit and spawns one notification unit.
async fn spawn_unit(
    permits: &Arc<Semaphore>,
    hub: &Arc<dyn WatcherHub>,
    sink: &MessageSink,
    job: DispatchJob,
) -> bool {
    let Ok(permit) = permits.clone().acquire_owned().await else {
        return false;
    };
    let hub = hub.clone();
    let sink = sink.clone();
    tokio::spawn(async move {
        let _permit = permit;
        hub.notify_watchers(job.envelope, job.code, sink).await;
    });
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EnvelopeParams, EnvelopePool, FilterId};
    use crate::ports::Filter;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct SlowHub {
        running: AtomicUsize,
        peak: AtomicUsize,
        done: AtomicUsize,
    }

    #[async_trait]
    impl WatcherHub for SlowHub {
        fn install(&self, _filter: Arc<dyn Filter>) -> FilterId {
            0
        }
        fn get(&self, _id: FilterId) -> Option<Arc<dyn Filter>> {
            None
        }
        fn uninstall(&self, _id: FilterId) -> bool {
            false
        }
        async fn notify_watchers(&self, _e: Arc<Envelope>, _c: MessageCode, _s: MessageSink) {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            self.done.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn envelope(nonce: u64) -> Arc<Envelope> {
        Arc::new(Envelope::new(EnvelopeParams {
            env_nonce: nonce,
            ..EnvelopeParams::default()
        }))
    }

    fn sink() -> MessageSink {
        MessageSink::new(Arc::new(EnvelopePool::new()))
    }

    #[test]
    fn test_full_queue_drops_without_blocking() {
        let (dispatcher, _rx) = Dispatcher::channel(2);
        assert!(dispatcher.enqueue(envelope(1), MessageCode::Messages));
        assert!(dispatcher.enqueue(envelope(2), MessageCode::Messages));
        assert!(!dispatcher.enqueue(envelope(3), MessageCode::Messages));
    }

    #[test]
    fn test_closed_queue_drops() {
        let (dispatcher, rx) = Dispatcher::channel(2);
        drop(rx);
        assert!(!dispatcher.enqueue(envelope(1), MessageCode::Messages));
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded_and_units_finish() {
        let hub = Arc::new(SlowHub::default());
        let (dispatcher, rx) = Dispatcher::channel(64);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        for nonce in 0..10 {
            assert!(dispatcher.enqueue(envelope(nonce), MessageCode::Messages));
        }

        let task = tokio::spawn(run_dispatcher(rx, hub.clone(), sink(), 3, shutdown_rx));

        // Let everything queued get picked up, then stop.
        while hub.done.load(Ordering::SeqCst) < 10 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        shutdown_tx.send(true).unwrap();
        task.await.unwrap();

        assert_eq!(hub.done.load(Ordering::SeqCst), 10);
        assert!(hub.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_in_flight_units() {
        let hub = Arc::new(SlowHub::default());
        let (dispatcher, rx) = Dispatcher::channel(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_dispatcher(rx, hub.clone(), sink(), 2, shutdown_rx));

        dispatcher.enqueue(envelope(1), MessageCode::Direct);
        while hub.running.load(Ordering::SeqCst) == 0 && hub.done.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
        assert_eq!(hub.done.load(Ordering::SeqCst), 1);
        assert_eq!(hub.running.load(Ordering::SeqCst), 0);
    }
}
