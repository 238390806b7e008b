//! Result aggregation from multiple virtual users

use std::time::Duration;

use crate::engine::ThreadStats;

/// Aggregated statistics from all threads of a group
#[derive(Debug, Clone, Default)]
pub struct AggregatedStats {
    /// Number of threads that completed
    pub total_threads: usize,

    /// Total successful samples
    pub total_completed: usize,

    /// Total failed samples
    pub total_errors: usize,

    /// Total transaction aggregates
    pub total_transactions: usize,

    /// Maximum duration across all threads
    pub total_duration: Duration,

    /// Overall samples per second
    pub samples_per_second: f64,

    /// Mean sample time in milliseconds
    pub mean_sample_time_ms: f64,
}

impl AggregatedStats {
    /// Total number of samples (completed + errors)
    pub fn total_samples(&self) -> usize {
        self.total_completed + self.total_errors
    }

    /// Success rate (0.0 - 1.0)
    pub fn success_rate(&self) -> f64 {
        let total = self.total_samples();
        if total > 0 {
            self.total_completed as f64 / total as f64
        } else {
            0.0
        }
    }

    /// Error rate (0.0 - 1.0)
    pub fn error_rate(&self) -> f64 {
        let total = self.total_samples();
        if total > 0 {
            self.total_errors as f64 / total as f64
        } else {
            0.0
        }
    }
}

/// Aggregate statistics from multiple threads
pub fn aggregate_thread_stats(stats: &[ThreadStats]) -> AggregatedStats {
    if stats.is_empty() {
        return AggregatedStats::default();
    }

    let mut merged = ThreadStats::new();
    for s in stats {
        merged.merge(s);
    }

    // Threads overlap, so the group lasted as long as its longest thread
    let total_duration = stats
        .iter()
        .filter_map(|s| s.elapsed())
        .max()
        .unwrap_or(Duration::ZERO);

    let secs = total_duration.as_secs_f64();
    let samples_per_second = if secs > 0.0 {
        merged.total_samples() as f64 / secs
    } else {
        0.0
    };

    AggregatedStats {
        total_threads: stats.len(),
        total_completed: merged.completed,
        total_errors: merged.errors,
        total_transactions: merged.transactions,
        total_duration,
        samples_per_second,
        mean_sample_time_ms: merged.mean_sample_time_ms(),
    }
}
