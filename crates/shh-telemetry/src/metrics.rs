//! Prometheus metrics for the shh node.
//!
//! Naming: `shh_<area>_<metric>[_<unit>]`. Collectors are created lazily and
//! only exported once [`register_metrics`] has run; updating an unregistered
//! collector is harmless.

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Instant;

use crate::TelemetryError;

// Names and help strings below are static; construction fails only on an
// invalid metric name.
fn gauge(name: &str, help: &str) -> Gauge {
    Gauge::new(name, help).expect("static gauge definition")
}

fn counter(name: &str, help: &str) -> Counter {
    Counter::new(name, help).expect("static counter definition")
}

fn counter_vec(name: &str, help: &str, label: &str) -> CounterVec {
    CounterVec::new(Opts::new(name, help), &[label]).expect("static counter definition")
}

lazy_static! {
    /// Registry all shh collectors are exported from
    pub static ref REGISTRY: Registry = Registry::new_custom(Some("shh".into()), None)
        .unwrap_or_default();

    // =========================================================================
    // POOL
    // =========================================================================

    /// Pooled envelopes
    pub static ref ENVELOPES_POOLED: Gauge =
        gauge("pool_envelopes", "Envelopes currently held in the pool");

    /// Pooled decrypted messages
    pub static ref MESSAGES_POOLED: Gauge =
        gauge("pool_messages", "Decrypted messages currently held in the pool");

    /// Envelopes removed by sweeps
    pub static ref SWEPT_ENVELOPES: Counter =
        counter("pool_swept_envelopes_total", "Envelopes removed by the expiration sweeper");

    /// Time spent holding the pool lock during one sweep
    pub static ref SWEEP_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new("pool_sweep_duration_seconds", "Expiration sweep duration")
            .buckets(exponential_buckets(0.00001, 2.0, 15).unwrap_or_default()),
    )
    .expect("static histogram definition");

    // =========================================================================
    // ADMISSION
    // =========================================================================

    /// accepted / duplicate / dropped_expired / dropped_low_pow
    pub static ref ADMISSIONS: CounterVec =
        counter_vec("admission_outcomes_total", "Admission outcomes", "outcome");

    /// Protocol violations by reason
    pub static ref PROTOCOL_VIOLATIONS: CounterVec = counter_vec(
        "admission_protocol_violations_total",
        "Envelopes rejected as protocol violations",
        "reason",
    );

    // =========================================================================
    // DISPATCH
    // =========================================================================

    /// Notifications queued
    pub static ref DISPATCH_QUEUED: Counter =
        counter("dispatch_queued_total", "Envelopes queued for watcher notification");

    /// Full or closed queue
    pub static ref DISPATCH_DROPPED: Counter =
        counter("dispatch_dropped_total", "Watcher notifications dropped under backpressure");

    // =========================================================================
    // KEYS AND PEERS
    // =========================================================================

    /// Stored identities
    pub static ref IDENTITIES_STORED: Gauge =
        gauge("keys_identities", "Asymmetric identities held by the key store");

    /// Stored symmetric keys
    pub static ref SYM_KEYS_STORED: Gauge =
        gauge("keys_symmetric", "Named symmetric keys held by the key store");

    /// Connected peers
    pub static ref PEERS_CONNECTED: Gauge =
        gauge("peers_connected", "Currently connected peers");
}

/// Keeps the registry alive while telemetry is in use.
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register every shh collector with [`REGISTRY`].
///
/// Registering twice reports `MetricsInit` for the duplicate collectors.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(ENVELOPES_POOLED.clone()),
        Box::new(MESSAGES_POOLED.clone()),
        Box::new(SWEPT_ENVELOPES.clone()),
        Box::new(SWEEP_DURATION.clone()),
        Box::new(ADMISSIONS.clone()),
        Box::new(PROTOCOL_VIOLATIONS.clone()),
        Box::new(DISPATCH_QUEUED.clone()),
        Box::new(DISPATCH_DROPPED.clone()),
        Box::new(IDENTITIES_STORED.clone()),
        Box::new(SYM_KEYS_STORED.clone()),
        Box::new(PEERS_CONNECTED.clone()),
    ];

    for collector in collectors {
        REGISTRY
            .register(collector)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Render [`REGISTRY`] in the Prometheus text exposition format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let mut out = Vec::new();
    TextEncoder::new()
        .encode(&REGISTRY.gather(), &mut out)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(out).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Observes the elapsed time into a histogram when dropped.
pub struct HistogramTimer {
    histogram: Histogram,
    started: Instant,
}

impl HistogramTimer {
    /// Start timing.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            started: Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.started.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_then_encode() {
        // May already be registered by another test in this binary.
        let _ = register_metrics();
        ADMISSIONS.with_label_values(&["accepted"]).inc();
        let text = encode_metrics().unwrap();
        assert!(text.contains("shh_admission_outcomes_total"));
    }

    #[test]
    fn test_gauge_set() {
        PEERS_CONNECTED.set(3.0);
        assert_eq!(PEERS_CONNECTED.get(), 3.0);
    }

    #[test]
    fn test_histogram_timer_observes_on_drop() {
        let before = SWEEP_DURATION.get_sample_count();
        {
            let _timer = HistogramTimer::new(&SWEEP_DURATION);
        }
        assert!(SWEEP_DURATION.get_sample_count() > before);
    }
}
