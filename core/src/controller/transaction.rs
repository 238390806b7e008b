//! Transaction aggregation

use chrono::{DateTime, Utc};

use crate::result::SampleResult;

/// Response code of a successful aggregate
const SUCCESS_CODE: &str = "200";

/// Message carried by a transaction aggregate
pub fn transaction_message(total: u64, failures: u64) -> String {
    format!(
        "Number of samples in transaction : {total}, number of failing samples : {failures}"
    )
}

/// Accumulates the outcomes of one transaction pass
#[derive(Debug, Clone)]
pub struct TransactionTracker {
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    total: u64,
    failures: u64,
    failure_code: Option<String>,
    children: Vec<SampleResult>,
}

impl TransactionTracker {
    /// Open a transaction now
    pub fn begin() -> Self {
        let now = Utc::now();
        Self {
            start_time: now,
            end_time: now,
            total: 0,
            failures: 0,
            failure_code: None,
            children: Vec::new(),
        }
    }

    /// Count a child outcome
    pub fn record(&mut self, result: &SampleResult) {
        self.total += 1;
        if !result.success {
            self.failures += 1;
            self.failure_code = Some(result.response_code.clone());
        }
        self.end_time = self.end_time.max(result.end_time);
    }

    /// Keep a child outcome inside the aggregate
    pub fn absorb(&mut self, result: SampleResult) {
        self.children.push(result);
    }

    /// Samples counted so far
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Failing samples counted so far
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// When the transaction pass started
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Build the aggregate record
    ///
    /// An empty transaction is successful.
    pub fn finish(self, label: impl Into<String>) -> SampleResult {
        let success = self.failures == 0;
        let code = if success {
            SUCCESS_CODE.to_string()
        } else {
            self.failure_code.unwrap_or_default()
        };
        let end_time = self.end_time.max(Utc::now());

        let mut result = SampleResult::success(
            label,
            code,
            transaction_message(self.total, self.failures),
        )
        .with_times(self.start_time, end_time);
        result.success = success;
        result.children = self.children;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_message_format() {
        assert_eq!(
            transaction_message(3, 1),
            "Number of samples in transaction : 3, number of failing samples : 1"
        );
    }

    #[test]
    fn test_empty_transaction_is_successful() {
        let result = TransactionTracker::begin().finish("tx");
        assert!(result.success);
        assert_eq!(result.response_code, "200");
        assert_eq!(result.response_message, transaction_message(0, 0));
        assert!(result.children.is_empty());
    }

    #[test]
    fn test_tracker_counts_failures() {
        let mut tracker = TransactionTracker::begin();
        let ok = SampleResult::success("a", "200", "OK");
        let ko = SampleResult::failure("b", "404", "Not Found");

        tracker.record(&ok);
        tracker.absorb(ok);
        tracker.record(&ko);
        tracker.absorb(ko);
        assert_eq!(tracker.total(), 2);
        assert_eq!(tracker.failures(), 1);

        let start = tracker.start_time();
        let result = tracker.finish("tx");
        assert!(!result.success);
        assert_eq!(result.label, "tx");
        assert_eq!(result.response_code, "404");
        assert_eq!(result.children.len(), 2);
        assert_eq!(result.start_time, start);
        assert!(result.end_time >= result.children[1].end_time);
    }

    #[test]
    fn test_record_without_absorb_keeps_no_children() {
        let mut tracker = TransactionTracker::begin();
        tracker.record(&SampleResult::success("a", "200", "OK"));
        let result = tracker.finish("tx");
        assert_eq!(result.response_message, transaction_message(1, 0));
        assert!(result.children.is_empty());
    }
}
