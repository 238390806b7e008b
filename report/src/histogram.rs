//! Latency histogram and percentile summary

use std::time::Duration;

use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};

use crate::error::{ReportError, ReportResult};

/// Latency percentiles (all values in milliseconds)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct LatencyPercentiles {
    /// Minimum value
    pub min: f64,
    /// 50th percentile (median)
    pub p50: f64,
    /// 90th percentile
    pub p90: f64,
    /// 95th percentile
    pub p95: f64,
    /// 99th percentile
    pub p99: f64,
    /// Maximum value
    pub max: f64,
    /// Mean value
    pub mean: f64,
    /// Standard deviation
    pub stddev: f64,
}

/// HdrHistogram of sample latencies
///
/// Microsecond precision, values up to one hour; larger values are clamped.
#[derive(Debug, Clone)]
pub struct LatencyHistogram {
    histogram: Histogram<u64>,
}

/// One hour in microseconds
const MAX_MICROS: u64 = 3_600_000_000;

impl LatencyHistogram {
    /// Create an empty histogram
    pub fn new() -> ReportResult<Self> {
        let histogram = Histogram::new_with_bounds(1, MAX_MICROS, 3)
            .map_err(|e| ReportError::Histogram(e.to_string()))?;
        Ok(Self { histogram })
    }

    /// Record a duration
    pub fn record(&mut self, duration: Duration) {
        let micros = (duration.as_micros() as u64).clamp(1, MAX_MICROS);
        // In bounds after the clamp
        let _ = self.histogram.record(micros);
    }

    /// Number of recorded values
    pub fn len(&self) -> u64 {
        self.histogram.len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.histogram.is_empty()
    }

    /// Merge another histogram into this one
    pub fn merge(&mut self, other: &LatencyHistogram) -> ReportResult<()> {
        self.histogram
            .add(&other.histogram)
            .map_err(|e| ReportError::Histogram(format!("{e:?}")))
    }

    /// Percentiles of the recorded values
    pub fn percentiles(&self) -> LatencyPercentiles {
        if self.histogram.is_empty() {
            return LatencyPercentiles::default();
        }

        let ms = |micros: u64| micros as f64 / 1000.0;
        LatencyPercentiles {
            min: ms(self.histogram.min()),
            p50: ms(self.histogram.value_at_quantile(0.50)),
            p90: ms(self.histogram.value_at_quantile(0.90)),
            p95: ms(self.histogram.value_at_quantile(0.95)),
            p99: ms(self.histogram.value_at_quantile(0.99)),
            max: ms(self.histogram.max()),
            mean: self.histogram.mean() / 1000.0,
            stddev: self.histogram.stdev() / 1000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_percentiles() {
        let mut histogram = LatencyHistogram::new().unwrap();
        for i in 1..=100 {
            histogram.record(Duration::from_millis(i));
        }

        let percentiles = histogram.percentiles();
        assert_eq!(histogram.len(), 100);
        assert!((percentiles.min - 1.0).abs() < 0.1);
        assert!((percentiles.max - 100.0).abs() < 0.1);
        assert!((percentiles.p50 - 50.0).abs() < 1.0);
        assert!((percentiles.p99 - 99.0).abs() < 1.0);
    }

    #[test]
    fn test_empty_histogram() {
        let histogram = LatencyHistogram::new().unwrap();
        assert!(histogram.is_empty());
        assert_eq!(histogram.percentiles(), LatencyPercentiles::default());
    }

    #[test]
    fn test_zero_and_huge_values_are_clamped() {
        let mut histogram = LatencyHistogram::new().unwrap();
        histogram.record(Duration::ZERO);
        histogram.record(Duration::from_secs(7200));
        assert_eq!(histogram.len(), 2);
    }

    #[test]
    fn test_merge() {
        let mut a = LatencyHistogram::new().unwrap();
        let mut b = LatencyHistogram::new().unwrap();
        a.record(Duration::from_millis(10));
        b.record(Duration::from_millis(20));
        a.merge(&b).unwrap();
        assert_eq!(a.len(), 2);
    }
}
