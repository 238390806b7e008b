//! Per-label summary statistics

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use planbench_core::{ListenerError, SampleEvent, SampleListener};

use crate::histogram::{LatencyHistogram, LatencyPercentiles};

/// Summary row for one label (or the total)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LabelSummary {
    /// Sample label, `TOTAL` for the total row
    pub label: String,
    /// Number of samples
    pub samples: u64,
    /// Number of failed samples
    pub errors: u64,
    /// Error rate (0.0 - 1.0)
    pub error_rate: f64,
    /// Samples per second between the first start and the last end
    pub throughput: f64,
    /// Latency percentiles in milliseconds
    pub latency: LatencyPercentiles,
}

#[derive(Debug, Clone)]
struct LabelAccumulator {
    samples: u64,
    errors: u64,
    first_start: DateTime<Utc>,
    last_end: DateTime<Utc>,
    histogram: LatencyHistogram,
}

impl LabelAccumulator {
    fn summary(&self, label: &str) -> LabelSummary {
        let error_rate = if self.samples > 0 {
            self.errors as f64 / self.samples as f64
        } else {
            0.0
        };
        let span = (self.last_end - self.first_start)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        let throughput = if span > 0.0 {
            self.samples as f64 / span
        } else {
            0.0
        };

        LabelSummary {
            label: label.to_string(),
            samples: self.samples,
            errors: self.errors,
            error_rate,
            throughput,
            latency: self.histogram.percentiles(),
        }
    }
}

/// Aggregates delivered events per label
///
/// Transaction aggregates are summarized under the transaction's label like
/// any other result.
#[derive(Debug, Default)]
pub struct SummaryReport {
    labels: Mutex<BTreeMap<String, LabelAccumulator>>,
}

impl SummaryReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// One row per label, sorted by label
    pub fn rows(&self) -> Vec<LabelSummary> {
        self.lock()
            .iter()
            .map(|(label, acc)| acc.summary(label))
            .collect()
    }

    /// Row combining every label
    pub fn total(&self) -> LabelSummary {
        let labels = self.lock();

        let mut iter = labels.values();
        let Some(first) = iter.next() else {
            return LabelSummary {
                label: "TOTAL".to_string(),
                ..Default::default()
            };
        };

        let mut total = first.clone();
        for acc in iter {
            total.samples += acc.samples;
            total.errors += acc.errors;
            total.first_start = total.first_start.min(acc.first_start);
            total.last_end = total.last_end.max(acc.last_end);
            if let Err(e) = total.histogram.merge(&acc.histogram) {
                tracing::warn!(error = %e, "Failed to merge latency histogram");
            }
        }
        total.summary("TOTAL")
    }

    /// Rows plus total as JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "labels": self.rows(),
            "total": self.total(),
        })
    }

    /// Per-label accumulators, recovered if a listener thread panicked
    /// while holding them
    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, LabelAccumulator>> {
        match self.labels.lock() {
            Ok(labels) => labels,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Fixed-width text table
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<24} {:>8} {:>8} {:>8} {:>10} {:>10} {:>10} {:>10}",
            "Label", "Samples", "Errors", "Error%", "Mean ms", "p95 ms", "p99 ms", "Per sec"
        );
        let _ = writeln!(out, "{}", "-".repeat(96));

        let mut rows = self.rows();
        rows.push(self.total());
        for row in rows {
            let _ = writeln!(
                out,
                "{:<24} {:>8} {:>8} {:>7.2}% {:>10.1} {:>10.1} {:>10.1} {:>10.2}",
                row.label,
                row.samples,
                row.errors,
                row.error_rate * 100.0,
                row.latency.mean,
                row.latency.p95,
                row.latency.p99,
                row.throughput
            );
        }
        out
    }
}

impl SampleListener for SummaryReport {
    fn sample_occurred(&self, event: &SampleEvent) -> Result<(), ListenerError> {
        let result = &event.result;
        let mut labels = self.lock();

        if !labels.contains_key(&result.label) {
            let acc = LabelAccumulator {
                samples: 0,
                errors: 0,
                first_start: result.start_time,
                last_end: result.end_time,
                histogram: LatencyHistogram::new()?,
            };
            labels.insert(result.label.clone(), acc);
        }

        if let Some(acc) = labels.get_mut(&result.label) {
            acc.samples += 1;
            if !result.success {
                acc.errors += 1;
            }
            acc.first_start = acc.first_start.min(result.start_time);
            acc.last_end = acc.last_end.max(result.end_time);
            acc.histogram.record(result.elapsed());
        }
        Ok(())
    }
}
