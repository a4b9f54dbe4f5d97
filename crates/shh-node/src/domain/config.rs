//! Node configuration and validation.
//!
//! # Environment Variables
//!
//! | Variable | Field |
//! |----------|-------|
//! | `SHH_MINIMUM_POW` | `minimum_pow` |
//! | `SHH_MAX_MESSAGE_SIZE` | `max_message_size` |
//! | `SHH_SYNC_ALLOWANCE` | `sync_allowance_secs` |
//! | `SHH_EXPIRATION_CYCLE_MS` | `expiration_cycle` |
//! | `SHH_ENVELOPE_VERSION` | `envelope_version` |
//! | `SHH_TEST_MODE` | `test_mode` |
//! | `SHH_DISPATCH_QUEUE` | `dispatch_queue_capacity` |
//! | `SHH_DISPATCH_CONCURRENCY` | `dispatch_concurrency` |
//!
//! Unset variables keep their defaults. Set but unparsable variables are
//! reported as [`ConfigError::InvalidValue`].

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default minimum proof of work for admission.
pub const DEFAULT_MINIMUM_POW: f64 = 0.2;
/// Default maximum payload size in bytes.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 0xFFFF;
/// Tolerated clock skew in seconds.
pub const DEFAULT_SYNC_ALLOWANCE: u64 = 10;

/// Configuration rejected by validation or environment parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A field holds an unusable value.
    #[error("invalid {field}: {reason}")]
    InvalidValue {
        /// Offending field or variable
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Shh node configuration.
///
/// Deserializes from partial documents; missing fields take their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShhConfig {
    /// Envelopes scoring below this are silently dropped.
    pub minimum_pow: f64,
    /// Maximum payload length in bytes.
    pub max_message_size: usize,
    /// Maximum version tag length in bytes.
    pub max_version_length: usize,
    /// Maximum cipher nonce length in bytes.
    pub aes_nonce_max_length: usize,
    /// Salt length in bytes.
    pub salt_length: usize,
    /// Tolerated clock skew in seconds.
    pub sync_allowance_secs: u64,
    /// Period of the expiration sweeper.
    pub expiration_cycle: Duration,
    /// Highest envelope version this node interprets locally.
    pub envelope_version: u64,
    /// Admit envelopes regardless of proof of work.
    pub test_mode: bool,
    /// Capacity of the watcher dispatch queue.
    pub dispatch_queue_capacity: usize,
    /// Maximum notification units running at once.
    pub dispatch_concurrency: usize,
}

impl Default for ShhConfig {
    fn default() -> Self {
        Self {
            minimum_pow: DEFAULT_MINIMUM_POW,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_version_length: 4,
            aes_nonce_max_length: 12,
            salt_length: 12,
            sync_allowance_secs: DEFAULT_SYNC_ALLOWANCE,
            expiration_cycle: Duration::from_secs(1),
            envelope_version: 0,
            test_mode: false,
            dispatch_queue_capacity: 4096,
            dispatch_concurrency: num_cpus::get().max(1),
        }
    }
}

impl ShhConfig {
    /// Defaults with proof of work disabled and a short sweep cycle.
    pub fn for_testing() -> Self {
        Self {
            test_mode: true,
            expiration_cycle: Duration::from_millis(50),
            dispatch_concurrency: 4,
            ..Self::default()
        }
    }

    /// Defaults overridden by `SHH_*` environment variables, validated.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(v) = env_parse("SHH_MINIMUM_POW")? {
            config.minimum_pow = v;
        }
        if let Some(v) = env_parse("SHH_MAX_MESSAGE_SIZE")? {
            config.max_message_size = v;
        }
        if let Some(v) = env_parse("SHH_SYNC_ALLOWANCE")? {
            config.sync_allowance_secs = v;
        }
        if let Some(ms) = env_parse::<u64>("SHH_EXPIRATION_CYCLE_MS")? {
            config.expiration_cycle = Duration::from_millis(ms);
        }
        if let Some(v) = env_parse("SHH_ENVELOPE_VERSION")? {
            config.envelope_version = v;
        }
        if let Some(v) = env_parse("SHH_TEST_MODE")? {
            config.test_mode = v;
        }
        if let Some(v) = env_parse("SHH_DISPATCH_QUEUE")? {
            config.dispatch_queue_capacity = v;
        }
        if let Some(v) = env_parse("SHH_DISPATCH_CONCURRENCY")? {
            config.dispatch_concurrency = v;
        }
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the node cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.minimum_pow.is_nan() || self.minimum_pow < 0.0 {
            return Err(invalid("minimum_pow", "must be a non-negative number"));
        }
        if self.expiration_cycle.is_zero() {
            return Err(invalid("expiration_cycle", "cannot be 0"));
        }
        if self.dispatch_queue_capacity == 0 {
            return Err(invalid("dispatch_queue_capacity", "cannot be 0"));
        }
        if self.dispatch_concurrency == 0 {
            return Err(invalid("dispatch_concurrency", "cannot be 0"));
        }
        Ok(())
    }

    /// Builder-style method to set the minimum proof of work
    pub fn with_minimum_pow(mut self, pow: f64) -> Self {
        self.minimum_pow = pow;
        self
    }

    /// Builder-style method to toggle test mode
    pub fn with_test_mode(mut self, enabled: bool) -> Self {
        self.test_mode = enabled;
        self
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
}

fn env_parse<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| ConfigError::InvalidValue {
            field: name,
            reason: format!("{raw:?}: {e}"),
        }),
        Err(_) => Ok(None),
    }
}
