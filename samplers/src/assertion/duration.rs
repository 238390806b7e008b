//! Upper bound on sample duration

use std::time::Duration;

use planbench_core::{Assertion, AssertionResult, SampleContext, SampleResult};

/// Fails samples that took longer than `max`
#[derive(Debug, Clone, Copy)]
pub struct DurationAssertion {
    max: Duration,
}

impl DurationAssertion {
    /// Allow at most `max` elapsed time
    pub fn new(max: Duration) -> Self {
        Self { max }
    }
}

impl Assertion for DurationAssertion {
    fn check(&self, result: &SampleResult, _ctx: &SampleContext<'_>) -> AssertionResult {
        let elapsed = result.elapsed();
        if elapsed <= self.max {
            return AssertionResult::pass();
        }
        AssertionResult::fail(format!(
            "The operation lasted too long: It took {} milliseconds, but should not have lasted longer than {} milliseconds.",
            elapsed.as_millis(),
            self.max.as_millis()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_context::Fixture;
    use chrono::Utc;

    fn result_lasting(ms: i64) -> SampleResult {
        let start = Utc::now();
        SampleResult::success("slow", "200", "OK")
            .with_times(start, start + chrono::Duration::milliseconds(ms))
    }

    #[test]
    fn test_within_limit_passes() {
        let mut fixture = Fixture::new();
        let ctx = fixture.context("slow");
        let assertion = DurationAssertion::new(Duration::from_millis(100));
        assert!(!assertion.check(&result_lasting(100), &ctx).is_failure());
    }

    #[test]
    fn test_over_limit_fails() {
        let mut fixture = Fixture::new();
        let ctx = fixture.context("slow");
        let assertion = DurationAssertion::new(Duration::from_millis(100));

        let outcome = assertion.check(&result_lasting(250), &ctx);
        assert!(outcome.failure);
        assert!(outcome.message.contains("It took 250 milliseconds"));
        assert!(outcome.message.contains("longer than 100 milliseconds"));
    }
}
