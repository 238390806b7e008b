//! Result listeners for test plan runs
//!
//! This crate provides implementations of the core `SampleListener` trait:
//!
//! - `ResultCollector`: keeps every event in memory
//! - `SummaryReport`: per-label counts, error rate and latency percentiles
//! - `JsonLinesWriter`: one JSON object per delivered event

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collector;
pub mod error;
pub mod histogram;
pub mod jsonl;
pub mod summary;

pub use collector::ResultCollector;
pub use error::{ReportError, ReportResult};
pub use histogram::{LatencyHistogram, LatencyPercentiles};
pub use jsonl::{JsonLinesWriter, ResultRecord};
pub use summary::{LabelSummary, SummaryReport};
