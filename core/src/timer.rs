//! Timers: think-time delays applied before samplers in scope
//!
//! - **Constant**: fixed delay
//! - **Uniform**: fixed offset plus a delay drawn uniformly from `[0, range)`
//! - **Gaussian**: delay drawn from a normal distribution around `offset`

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delay applied before each sampler the timer is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Timer {
    /// Fixed delay
    Constant {
        /// Delay in milliseconds
        delay_ms: u64,
    },
    /// Offset plus uniformly distributed random delay
    Uniform {
        /// Constant part in milliseconds
        offset_ms: u64,
        /// Width of the random part in milliseconds
        range_ms: u64,
    },
    /// Normally distributed delay, clamped at zero
    Gaussian {
        /// Mean in milliseconds
        offset_ms: u64,
        /// Standard deviation in milliseconds
        deviation_ms: u64,
    },
}

impl Timer {
    /// Constant timer
    pub fn constant(delay: Duration) -> Self {
        Timer::Constant {
            delay_ms: delay.as_millis() as u64,
        }
    }

    /// Uniform random timer
    pub fn uniform(offset: Duration, range: Duration) -> Self {
        Timer::Uniform {
            offset_ms: offset.as_millis() as u64,
            range_ms: range.as_millis() as u64,
        }
    }

    /// Gaussian random timer
    pub fn gaussian(offset: Duration, deviation: Duration) -> Self {
        Timer::Gaussian {
            offset_ms: offset.as_millis() as u64,
            deviation_ms: deviation.as_millis() as u64,
        }
    }

    /// Draw the next delay
    pub fn delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        match *self {
            Timer::Constant { delay_ms } => Duration::from_millis(delay_ms),
            Timer::Uniform {
                offset_ms,
                range_ms,
            } => {
                let jitter = if range_ms == 0 {
                    0
                } else {
                    rng.gen_range(0..range_ms)
                };
                Duration::from_millis(offset_ms + jitter)
            }
            Timer::Gaussian {
                offset_ms,
                deviation_ms,
            } => match Normal::new(offset_ms as f64, deviation_ms as f64) {
                Ok(normal) => {
                    let delay_ms = normal.sample(rng).max(0.0) as u64;
                    Duration::from_millis(delay_ms)
                }
                Err(_) => Duration::from_millis(offset_ms),
            },
        }
    }
}
