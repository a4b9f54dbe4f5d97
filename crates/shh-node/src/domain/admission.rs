//! Admission screening.
//!
//! Pure checks run before an envelope reaches the pool: clock window, field
//! sizes and the proof-of-work gate. No lock is held here.

use super::config::ShhConfig;
use super::entities::Timestamp;
use super::envelope::Envelope;
use super::errors::ShhError;
use super::value_objects::Admission;

/// Verdict of [`screen`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screening {
    /// Insert into the pool.
    Admit,
    /// Return success without touching the pool.
    Drop(Admission),
}

/// Screen a candidate envelope at time `now`.
///
/// A future-dated envelope inside the allowance has its proof of work
/// recomputed for the shortened effective TTL, which is why the envelope is
/// taken mutably.
pub fn screen(
    envelope: &mut Envelope,
    now: Timestamp,
    config: &ShhConfig,
) -> Result<Screening, ShhError> {
    let allowance = config.sync_allowance_secs;
    let expiry = u64::from(envelope.expiry());

    // ttl > expiry puts the send time before the epoch; treat it as bogus.
    let sent = match envelope.expiry().checked_sub(envelope.ttl()) {
        Some(sent) => u64::from(sent),
        None => return Err(ShhError::CreatedInFuture { sent: u64::MAX, now }),
    };

    if sent > now {
        if sent.saturating_sub(allowance) > now {
            return Err(ShhError::CreatedInFuture { sent, now });
        }
        let extra = u32::try_from(sent - now + 1).unwrap_or(u32::MAX);
        envelope.calculate_pow(extra);
    }

    if expiry < now {
        if expiry.saturating_add(2 * allowance) < now {
            return Err(ShhError::VeryOldMessage { expiry, now });
        }
        return Ok(Screening::Drop(Admission::DroppedExpired));
    }

    check_size(envelope.data().len(), config.max_message_size, |size, max| {
        ShhError::OversizedPayload { size, max }
    })?;
    check_size(envelope.version().len(), config.max_version_length, |size, max| {
        ShhError::OversizedVersion { size, max }
    })?;
    check_size(envelope.aes_nonce().len(), config.aes_nonce_max_length, |size, max| {
        ShhError::OversizedNonce { size, max }
    })?;
    check_size(envelope.salt().len(), config.salt_length, |size, max| {
        ShhError::OversizedSalt { size, max }
    })?;

    if envelope.pow() < config.minimum_pow && !config.test_mode {
        return Ok(Screening::Drop(Admission::DroppedLowPow));
    }

    Ok(Screening::Admit)
}

fn check_size(
    size: usize,
    max: usize,
    err: impl FnOnce(usize, usize) -> ShhError,
) -> Result<(), ShhError> {
    if size > max {
        Err(err(size, max))
    } else {
        Ok(())
    }
}
