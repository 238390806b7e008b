//! Per-thread sample pacing

use governor::clock::{Clock, DefaultClock};
use governor::{state::InMemoryState, state::NotKeyed, Quota, RateLimiter};
use std::time::Duration;

/// Longest single sleep while waiting for a permit
const MAX_SLEEP: Duration = Duration::from_millis(50);

/// Caps how fast one virtual user issues samples, using governor's
/// token bucket
///
/// Each engine owns its own pacer. Rates below one sample per second are
/// honored through the quota period.
pub struct SamplePacer {
    limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    clock: DefaultClock,
    rate_limit: Option<f64>,
}

impl SamplePacer {
    /// Create a pacer
    ///
    /// # Arguments
    /// * `rate_limit` - Optional samples per second. `None`, zero or a
    ///   negative rate disables pacing, as does a rate whose period does
    ///   not fit in a `Duration`.
    pub fn new(rate_limit: Option<f64>) -> Self {
        let limiter = rate_limit.and_then(|rps| {
            if rps <= 0.0 || !rps.is_finite() {
                return None;
            }
            let period = Duration::try_from_secs_f64(1.0 / rps).ok()?;
            let quota = Quota::with_period(period)?;
            Some(RateLimiter::direct(quota))
        });

        Self {
            limiter,
            clock: DefaultClock::default(),
            rate_limit,
        }
    }

    /// A pacer that never waits
    pub fn unlimited() -> Self {
        Self::new(None)
    }

    /// Block the calling thread until the next sample is allowed
    pub fn wait(&self) {
        self.wait_unless(|| false);
    }

    /// Block until the next sample is allowed, giving up as soon as
    /// `stopped` returns true
    ///
    /// Returns whether a permit was taken.
    pub fn wait_unless(&self, stopped: impl Fn() -> bool) -> bool {
        if let Some(ref limiter) = self.limiter {
            while let Err(not_until) = limiter.check() {
                if stopped() {
                    return false;
                }
                let wait = not_until.wait_time_from(self.clock.now());
                std::thread::sleep(wait.min(MAX_SLEEP));
            }
        }
        true
    }

    /// Take a permit if one is available right now
    ///
    /// Always `true` when pacing is disabled.
    pub fn try_acquire(&self) -> bool {
        match &self.limiter {
            Some(limiter) => limiter.check().is_ok(),
            None => true,
        }
    }

    /// Whether pacing is enabled
    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    /// Configured rate (samples per second)
    pub fn rate_limit(&self) -> Option<f64> {
        self.rate_limit
    }
}

impl Default for SamplePacer {
    fn default() -> Self {
        Self::new(None)
    }
}

impl std::fmt::Debug for SamplePacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplePacer")
            .field("rate_limit", &self.rate_limit)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
