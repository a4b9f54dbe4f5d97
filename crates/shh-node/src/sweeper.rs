//! Expiration sweeper.
//!
//! One background task ticks every `expiration_cycle` and removes due
//! envelopes under the pool lock. A sweep in progress always completes; the
//! shutdown signal is checked between ticks.

use crate::domain::{EnvelopePool, SweepReport, Timestamp};
use crate::ports::TimeSource;
use shh_telemetry::metrics::HistogramTimer;
use shh_telemetry::{ENVELOPES_POOLED, MESSAGES_POOLED, SWEEP_DURATION, SWEPT_ENVELOPES};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

/// Runs one sweep at `now` and updates the pool metrics.
pub fn sweep_once(pool: &EnvelopePool, now: Timestamp) -> SweepReport {
    let report = {
        let _timer = HistogramTimer::new(&SWEEP_DURATION);
        pool.expire(now)
    };

    if report.envelopes_removed > 0 {
        SWEPT_ENVELOPES.inc_by(report.envelopes_removed as f64);
        debug!(
            now,
            buckets = report.buckets_cleared,
            envelopes = report.envelopes_removed,
            messages = report.messages_removed,
            "Swept expired envelopes"
        );
    }

    let (envelopes, messages, _) = pool.counts();
    ENVELOPES_POOLED.set(envelopes as f64);
    MESSAGES_POOLED.set(messages as f64);
    report
}

pub(crate) async fn run_sweeper(
    pool: Arc<EnvelopePool>,
    clock: Arc<dyn TimeSource>,
    cycle: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(Instant::now() + cycle, cycle);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.changed() => {
                debug!("Sweeper received shutdown signal");
                break;
            }

            _ = ticker.tick() => {
                sweep_once(&pool, clock.now());
            }
        }
    }
}
