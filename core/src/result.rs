//! Outcome records and the events delivered to listeners

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one assertion evaluated against a sample result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionResult {
    /// Name of the assertion node
    pub name: String,

    /// The checked condition did not hold
    pub failure: bool,

    /// The assertion itself could not be evaluated
    pub error: bool,

    /// Diagnostic message (empty when passing)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl AssertionResult {
    /// A passing result
    pub fn pass() -> Self {
        Self {
            name: String::new(),
            failure: false,
            error: false,
            message: String::new(),
        }
    }

    /// A failing result
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            failure: true,
            message: message.into(),
            ..Self::pass()
        }
    }

    /// The assertion could not be evaluated
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
            ..Self::pass()
        }
    }

    /// Attach the assertion name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Whether this result downgrades the sample
    pub fn is_failure(&self) -> bool {
        self.failure || self.error
    }
}

/// Result of one sample, or the aggregate of a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleResult {
    /// Sample label (the sampler or transaction name)
    pub label: String,

    /// Overall outcome after assertions
    pub success: bool,

    /// Protocol-level response code
    pub response_code: String,

    /// Diagnostic or response message
    pub response_message: String,

    /// Response payload, if the sampler keeps one
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub response_data: String,

    /// When the sample started
    pub start_time: DateTime<Utc>,

    /// When the sample ended
    pub end_time: DateTime<Utc>,

    /// Assertions evaluated against this result
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertion_results: Vec<AssertionResult>,

    /// Wrapped results (populated for transaction aggregates)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SampleResult>,
}

impl SampleResult {
    /// Start a new successful result; `start_time` and `end_time` are now
    pub fn new(label: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            label: label.into(),
            success: true,
            response_code: String::new(),
            response_message: String::new(),
            response_data: String::new(),
            start_time: now,
            end_time: now,
            assertion_results: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Completed successful result
    pub fn success(
        label: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let mut result = Self::new(label);
        result.response_code = code.into();
        result.response_message = message.into();
        result
    }

    /// Completed failed result
    pub fn failure(
        label: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let mut result = Self::success(label, code, message);
        result.success = false;
        result
    }

    /// Failed result for an unexpected sampler fault
    pub fn fault(label: impl Into<String>, start_time: DateTime<Utc>, message: impl Into<String>) -> Self {
        let mut result = Self::failure(label, "500", message);
        result.start_time = start_time;
        result.end_time = Utc::now().max(start_time);
        result
    }

    /// Set the response payload
    pub fn with_response_data(mut self, data: impl Into<String>) -> Self {
        self.response_data = data.into();
        self
    }

    /// Set explicit timestamps
    pub fn with_times(mut self, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self
    }

    /// Mark the end of the sample
    pub fn finish(&mut self) {
        self.end_time = Utc::now();
    }

    /// `end_time - start_time`, zero if the clock went backwards
    pub fn elapsed(&self) -> Duration {
        (self.end_time - self.start_time)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }

    /// Record an assertion outcome
    ///
    /// A failing assertion marks the result unsuccessful and appends its
    /// message to the response message.
    pub fn apply_assertion(&mut self, assertion: AssertionResult) {
        if assertion.is_failure() {
            self.success = false;
            if !assertion.message.is_empty() {
                if self.response_message.is_empty() {
                    self.response_message = assertion.message.clone();
                } else {
                    self.response_message =
                        format!("{}; {}", self.response_message, assertion.message);
                }
            }
        }
        self.assertion_results.push(assertion);
    }
}

/// Identity of the virtual user that produced an event
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadInfo {
    /// Thread group name
    pub group: String,

    /// One-based thread number within the group
    pub number: usize,

    /// Display name, `"<group> <number>"`
    pub name: String,
}

impl ThreadInfo {
    /// Create thread identity for the given group and one-based number
    pub fn new(group: impl Into<String>, number: usize) -> Self {
        let group = group.into();
        let name = format!("{group} {number}");
        Self {
            group,
            number,
            name,
        }
    }
}

/// Unit delivered to listeners: a result plus where it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleEvent {
    /// The (possibly aggregated) outcome
    pub result: Arc<SampleResult>,

    /// Producing virtual user
    pub thread: Arc<ThreadInfo>,

    /// Names from the plan root down to the producing element
    pub path: Arc<[String]>,
}

impl SampleEvent {
    /// Create an event
    pub fn new(result: SampleResult, thread: Arc<ThreadInfo>, path: Arc<[String]>) -> Self {
        Self {
            result: Arc::new(result),
            thread,
            path,
        }
    }

    /// Label of the wrapped result
    pub fn label(&self) -> &str {
        &self.result.label
    }

    /// Whether the wrapped result succeeded
    pub fn is_success(&self) -> bool {
        self.result.success
    }
}
