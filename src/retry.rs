use std::time::Duration;

use rand::Rng;

pub const MAX_ATTEMPTS: u32 = 3;

/// Overloaded (`503`) and rate-limited (`429`) failures are the only transient ones.
pub fn is_retryable_message(message: &str) -> bool {
    message.contains("503") || message.contains("429")
}

/// `2^attempt` seconds plus up to one second of jitter.
pub fn backoff_delay<R: Rng>(attempt: u32, rng: &mut R) -> Duration {
    let base_ms = 2u64.saturating_pow(attempt).saturating_mul(1000);
    let jitter_ms = rng.gen_range(0..1000u64);
    Duration::from_millis(base_ms + jitter_ms)
}
