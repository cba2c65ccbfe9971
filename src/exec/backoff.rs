//! Retry backoff: a pure delay function plus an injectable sleeper.

use futures::future::BoxFuture;
use std::time::Duration;

/// Compute the delay before retry attempt `attempt` (0-based).
///
/// `delay = base * 2^attempt + base * 2^attempt * jitter * unit`, where
/// `unit` is a uniform sample in `[0, 1)`. Passing the sample in keeps
/// the function pure; callers draw it from `rand`, tests pin it.
///
/// # Example
///
/// ```rust
/// use devtool_orchestrator::backoff_delay;
/// use std::time::Duration;
///
/// let base = Duration::from_millis(500);
/// assert_eq!(backoff_delay(0, base, 0.0, 0.0), Duration::from_millis(500));
/// assert_eq!(backoff_delay(2, base, 0.0, 0.0), Duration::from_millis(2000));
/// ```
pub fn backoff_delay(attempt: u32, base: Duration, jitter: f64, unit: f64) -> Duration {
    let exp = base.saturating_mul(2u32.saturating_pow(attempt.min(16)));
    let jitter_ms = exp.as_millis() as f64 * jitter.clamp(0.0, 1.0) * unit.clamp(0.0, 1.0);
    exp.saturating_add(Duration::from_millis(jitter_ms as u64))
}

/// Sleep abstraction so retry tests count delays instead of waiting.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// Production sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}
