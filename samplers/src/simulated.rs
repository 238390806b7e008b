//! Simulated sampler: random latency and failures without any I/O
//!
//! Latency models:
//! - **Fixed**: constant latency
//! - **Normal**: latency drawn from a normal distribution, clamped at zero
//! - **Uniform**: latency drawn uniformly from `[min, max)`

use std::time::Duration;

use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};

use planbench_core::{SampleContext, SampleResult, Sampler, SamplerError};

/// How long a simulated sample takes
#[derive(Debug, Clone, Copy)]
pub enum LatencyModel {
    /// Constant latency
    Fixed(Duration),
    /// Normal distribution in milliseconds
    Normal(Normal<f64>),
    /// Uniform distribution in milliseconds
    Uniform(Uniform<u64>),
}

impl LatencyModel {
    /// Constant latency
    pub fn fixed(latency: Duration) -> Self {
        LatencyModel::Fixed(latency)
    }

    /// Normal latency with mean and standard deviation in milliseconds
    pub fn normal(mean_ms: f64, std_dev_ms: f64) -> Result<Self, SamplerError> {
        let distribution = Normal::new(mean_ms, std_dev_ms).map_err(|e| {
            SamplerError::InvalidConfig(format!("Invalid normal distribution parameters: {e}"))
        })?;
        Ok(LatencyModel::Normal(distribution))
    }

    /// Uniform latency between `min_ms` (inclusive) and `max_ms` (exclusive)
    pub fn uniform(min_ms: u64, max_ms: u64) -> Result<Self, SamplerError> {
        if min_ms >= max_ms {
            return Err(SamplerError::InvalidConfig(format!(
                "uniform latency needs min < max, got {min_ms}..{max_ms}"
            )));
        }
        Ok(LatencyModel::Uniform(Uniform::new(min_ms, max_ms)))
    }

    /// Draw the next latency
    pub fn next_latency<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        match self {
            LatencyModel::Fixed(latency) => *latency,
            LatencyModel::Normal(distribution) => {
                Duration::from_millis(distribution.sample(rng).max(0.0) as u64)
            }
            LatencyModel::Uniform(distribution) => Duration::from_millis(distribution.sample(rng)),
        }
    }
}

/// Sleeps for a random latency, then succeeds or fails at random
///
/// Stands in for a real protocol sampler in demos and tests.
#[derive(Debug, Clone)]
pub struct SimulatedSampler {
    latency: LatencyModel,
    failure_rate: f64,
    success_code: String,
    failure_code: String,
}

impl SimulatedSampler {
    /// Always succeeds after the given latency
    pub fn new(latency: LatencyModel) -> Self {
        Self {
            latency,
            failure_rate: 0.0,
            success_code: "200".to_string(),
            failure_code: "503".to_string(),
        }
    }

    /// Probability (0.0 - 1.0) that a sample fails
    pub fn with_failure_rate(mut self, failure_rate: f64) -> Result<Self, SamplerError> {
        if !(0.0..=1.0).contains(&failure_rate) {
            return Err(SamplerError::InvalidConfig(format!(
                "failure rate must be within 0.0..=1.0, got {failure_rate}"
            )));
        }
        self.failure_rate = failure_rate;
        Ok(self)
    }

    /// Response code reported on success
    pub fn with_success_code(mut self, code: impl Into<String>) -> Self {
        self.success_code = code.into();
        self
    }

    /// Response code reported on failure
    pub fn with_failure_code(mut self, code: impl Into<String>) -> Self {
        self.failure_code = code.into();
        self
    }
}

impl Sampler for SimulatedSampler {
    fn sample(&self, ctx: &mut SampleContext<'_>) -> Result<SampleResult, SamplerError> {
        let mut rng = rand::thread_rng();
        let latency = self.latency.next_latency(&mut rng);
        let failed = self.failure_rate > 0.0 && rng.gen_bool(self.failure_rate);

        let mut result = if failed {
            SampleResult::failure(ctx.label(), &self.failure_code, "Simulated failure")
        } else {
            SampleResult::success(ctx.label(), &self.success_code, "OK")
        };
        std::thread::sleep(latency);
        result.finish();

        tracing::trace!(
            label = ctx.label(),
            latency_ms = latency.as_millis() as u64,
            success = result.success,
            "Simulated sample"
        );
        Ok(result)
    }
}
