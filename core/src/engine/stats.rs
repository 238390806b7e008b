//! Per-thread statistics tracking

use std::time::Instant;

use crate::result::SampleResult;

/// Statistics tracked by each virtual user
#[derive(Debug, Default, Clone)]
pub struct ThreadStats {
    /// Number of successful samples
    pub completed: usize,

    /// Number of failed samples (after assertions)
    pub errors: usize,

    /// Transaction aggregates produced
    pub transactions: usize,

    /// Total elapsed time of all samples, in milliseconds
    pub sample_time_ms: f64,

    /// Thread start time
    pub started_at: Option<Instant>,

    /// Thread end time
    pub ended_at: Option<Instant>,
}

impl ThreadStats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking (records start time)
    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    /// Stop tracking (records end time)
    pub fn stop(&mut self) {
        self.ended_at = Some(Instant::now());
    }

    /// Total number of samples (completed + errors)
    pub fn total_samples(&self) -> usize {
        self.completed + self.errors
    }

    /// Success rate (0.0 - 1.0)
    pub fn success_rate(&self) -> f64 {
        if self.total_samples() == 0 {
            0.0
        } else {
            self.completed as f64 / self.total_samples() as f64
        }
    }

    /// Error rate (0.0 - 1.0)
    pub fn error_rate(&self) -> f64 {
        if self.total_samples() == 0 {
            0.0
        } else {
            self.errors as f64 / self.total_samples() as f64
        }
    }

    /// Mean sample time in milliseconds
    pub fn mean_sample_time_ms(&self) -> f64 {
        if self.total_samples() == 0 {
            0.0
        } else {
            self.sample_time_ms / self.total_samples() as f64
        }
    }

    /// Elapsed time since start
    pub fn elapsed(&self) -> Option<std::time::Duration> {
        self.started_at.map(|start| {
            self.ended_at
                .map(|end| end.duration_since(start))
                .unwrap_or_else(|| start.elapsed())
        })
    }

    /// Samples per second
    pub fn samples_per_second(&self) -> f64 {
        self.elapsed()
            .map(|d| {
                let secs = d.as_secs_f64();
                if secs > 0.0 {
                    self.total_samples() as f64 / secs
                } else {
                    0.0
                }
            })
            .unwrap_or(0.0)
    }

    /// Record a sample outcome
    pub fn record(&mut self, result: &SampleResult) {
        if result.success {
            self.completed += 1;
        } else {
            self.errors += 1;
        }
        self.sample_time_ms += result.elapsed_ms();
    }

    /// Record a delivered transaction aggregate
    pub fn record_transaction(&mut self) {
        self.transactions += 1;
    }

    /// Merge stats from another thread
    pub fn merge(&mut self, other: &ThreadStats) {
        self.completed += other.completed;
        self.errors += other.errors;
        self.transactions += other.transactions;
        self.sample_time_ms += other.sample_time_ms;
    }
}
