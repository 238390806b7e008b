//! Thread group configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What a virtual user does after a sample fails (after assertions)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnSampleError {
    /// Keep iterating
    #[default]
    Continue,
    /// Stop this virtual user only
    StopThread,
    /// Stop every virtual user of the group
    StopTest,
}

/// Thread group configuration
///
/// Defines how many virtual users replay the plan, how they are started,
/// and how long the group may run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadGroupConfig {
    /// Group name, used as the prefix of thread names
    pub name: String,

    /// Number of virtual users
    pub num_threads: usize,

    /// Time over which all threads are started, in milliseconds
    pub ramp_up_ms: u64,

    /// Optional wall-clock limit for the whole group, in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,

    /// Policy applied when a sample fails
    pub on_sample_error: OnSampleError,

    /// Optional per-thread pacing (samples per second)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<f64>,
}

impl Default for ThreadGroupConfig {
    fn default() -> Self {
        Self {
            name: "Thread Group".to_string(),
            num_threads: 1,
            ramp_up_ms: 0,
            duration_secs: None,
            on_sample_error: OnSampleError::Continue,
            rate_limit: None,
        }
    }
}

impl ThreadGroupConfig {
    /// Create a new config with the given number of threads
    pub fn new(num_threads: usize) -> Self {
        Self {
            num_threads,
            ..Default::default()
        }
    }

    /// Set the group name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the ramp-up period
    pub fn with_ramp_up(mut self, ramp_up: Duration) -> Self {
        self.ramp_up_ms = ramp_up.as_millis() as u64;
        self
    }

    /// Set the overall duration limit
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_secs = Some(duration.as_secs());
        self
    }

    /// Set the sample error policy
    pub fn with_on_sample_error(mut self, policy: OnSampleError) -> Self {
        self.on_sample_error = policy;
        self
    }

    /// Set the per-thread rate limit
    pub fn with_rate_limit(mut self, rps: f64) -> Self {
        self.rate_limit = Some(rps);
        self
    }

    /// Ramp-up period as a `Duration`
    pub fn ramp_up(&self) -> Duration {
        Duration::from_millis(self.ramp_up_ms)
    }

    /// Duration limit as a `Duration`
    pub fn duration(&self) -> Option<Duration> {
        self.duration_secs.map(Duration::from_secs)
    }

    /// Delay before starting the thread with the given zero-based index
    pub fn start_delay(&self, index: usize) -> Duration {
        if self.num_threads == 0 {
            return Duration::ZERO;
        }
        self.ramp_up()
            .mul_f64(index as f64 / self.num_threads as f64)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_threads == 0 {
            return Err(ConfigError::InvalidThreadCount(
                "must be at least 1".into(),
            ));
        }

        if let Some(rps) = self.rate_limit {
            if rps <= 0.0 || !rps.is_finite() {
                return Err(ConfigError::InvalidRateLimit(
                    "rate limit must be positive".into(),
                ));
            }
            match Duration::try_from_secs_f64(1.0 / rps) {
                Ok(period) if !period.is_zero() => {}
                _ => {
                    return Err(ConfigError::InvalidRateLimit(format!(
                        "{rps} samples/s has no representable pacing period"
                    )));
                }
            }
        }

        if self.duration_secs == Some(0) {
            return Err(ConfigError::InvalidDuration(
                "duration must be at least 1 second".into(),
            ));
        }

        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid thread count
    #[error("Invalid thread count: {0}")]
    InvalidThreadCount(String),

    /// Invalid rate limit
    #[error("Invalid rate limit: {0}")]
    InvalidRateLimit(String),

    /// Invalid duration
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),
}
