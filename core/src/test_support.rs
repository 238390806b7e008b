//! Mock samplers, assertions and listeners shared by the unit tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::context::SampleContext;
use crate::result::{AssertionResult, SampleEvent, SampleResult, ThreadInfo};
use crate::traits::{Assertion, ListenerError, SampleListener, Sampler, SamplerError};

// ============================================================================
// Mock Samplers
// ============================================================================

/// Returns a fixed response code and counts invocations
pub struct CountingSampler {
    calls: Arc<AtomicUsize>,
    code: String,
    success: bool,
    delay: Option<Duration>,
}

impl CountingSampler {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            code: "200".to_string(),
            success: true,
            delay: None,
        }
    }

    pub fn failing(code: &str) -> Self {
        Self {
            code: code.to_string(),
            success: false,
            ..Self::new()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Shared call counter, usable after the sampler moved into a plan
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl Sampler for CountingSampler {
    fn sample(&self, ctx: &mut SampleContext<'_>) -> Result<SampleResult, SamplerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        let mut result = if self.success {
            SampleResult::success(ctx.label(), &self.code, "OK")
        } else {
            SampleResult::failure(ctx.label(), &self.code, "Simulated failure")
        };
        result.finish();
        Ok(result)
    }
}

/// Always returns an unexpected fault
pub struct ErrSampler;

impl Sampler for ErrSampler {
    fn sample(&self, _ctx: &mut SampleContext<'_>) -> Result<SampleResult, SamplerError> {
        Err(SamplerError::failed("connection reset"))
    }
}

/// Always panics
pub struct PanicSampler;

impl Sampler for PanicSampler {
    fn sample(&self, _ctx: &mut SampleContext<'_>) -> Result<SampleResult, SamplerError> {
        panic!("sampler blew up");
    }
}

// ============================================================================
// Mock Assertions
// ============================================================================

/// Passes or fails unconditionally
pub struct StaticAssertion {
    failure: Option<String>,
}

impl StaticAssertion {
    pub fn passing() -> Self {
        Self { failure: None }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
        }
    }
}

impl Assertion for StaticAssertion {
    fn check(&self, _result: &SampleResult, _ctx: &SampleContext<'_>) -> AssertionResult {
        match &self.failure {
            Some(message) => AssertionResult::fail(message.clone()),
            None => AssertionResult::pass(),
        }
    }
}

/// Requires a specific response code
pub struct CodeAssertion {
    expected: String,
}

impl CodeAssertion {
    pub fn expect(code: &str) -> Self {
        Self {
            expected: code.to_string(),
        }
    }
}

impl Assertion for CodeAssertion {
    fn check(&self, result: &SampleResult, _ctx: &SampleContext<'_>) -> AssertionResult {
        if result.response_code == self.expected {
            AssertionResult::pass()
        } else {
            AssertionResult::fail(format!(
                "expected code {} but got {}",
                self.expected, result.response_code
            ))
        }
    }
}

// ============================================================================
// Mock Listeners
// ============================================================================

/// Records every event and lifecycle hook
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<SampleEvent>>,
    started: AtomicUsize,
    finished: AtomicUsize,
}

impl RecordingListener {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<SampleEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn labels(&self) -> Vec<String> {
        self.events()
            .iter()
            .map(|event| event.label().to_string())
            .collect()
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

impl SampleListener for RecordingListener {
    fn sample_occurred(&self, event: &SampleEvent) -> Result<(), ListenerError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    fn thread_started(&self, _thread: &ThreadInfo) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn thread_finished(&self, _thread: &ThreadInfo) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

/// Fails every delivery
pub struct FailingListener;

impl SampleListener for FailingListener {
    fn sample_occurred(&self, _event: &SampleEvent) -> Result<(), ListenerError> {
        Err(ListenerError::Unavailable("disk full".to_string()))
    }
}

/// Panics on every delivery
pub struct PanickingListener;

impl SampleListener for PanickingListener {
    fn sample_occurred(&self, _event: &SampleEvent) -> Result<(), ListenerError> {
        panic!("listener blew up");
    }
}
