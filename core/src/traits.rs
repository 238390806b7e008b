//! Core traits for samplers, assertions and listeners
//!
//! These traits are defined in core so the engine can drive them without
//! depending on any implementation. Implementations live in their
//! respective crates (samplers/, report/).

use crate::context::SampleContext;
use crate::result::{AssertionResult, SampleEvent, SampleResult, ThreadInfo};

// ============================================================================
// Sampler Trait
// ============================================================================

/// Leaf unit of work executed by a virtual user
///
/// A sampler is shared by every thread replaying the plan, so any mutable
/// state must be synchronized by the implementation. Per-thread data belongs
/// in the [`SampleContext`] variables.
pub trait Sampler: Send + Sync {
    /// Perform one unit of work
    ///
    /// Ordinary failures (a wrong status, a refused connection that the
    /// sampler understands) are reported as a result with `success = false`.
    /// `Err` is reserved for unexpected faults; the engine converts it into
    /// a failed result.
    fn sample(&self, ctx: &mut SampleContext<'_>) -> Result<SampleResult, SamplerError>;
}

/// Unexpected sampler faults
#[derive(Debug, thiserror::Error)]
pub enum SamplerError {
    /// Invalid sampler configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The sampler could not produce a result
    #[error("Sampler failed: {0}")]
    Failed(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SamplerError {
    /// Create a generic failure
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

// ============================================================================
// Assertion Trait
// ============================================================================

/// Check applied to every sample result in scope
pub trait Assertion: Send + Sync {
    /// Evaluate the assertion
    ///
    /// The engine names the returned result after the assertion node and
    /// applies it to the sample result.
    fn check(&self, result: &SampleResult, ctx: &SampleContext<'_>) -> AssertionResult;
}

// ============================================================================
// Listener Trait
// ============================================================================

/// Observer of sample events
///
/// Listeners are invoked synchronously from every virtual user and must
/// synchronize their own state.
pub trait SampleListener: Send + Sync {
    /// A sample (or transaction aggregate) was delivered
    fn sample_occurred(&self, event: &SampleEvent) -> Result<(), ListenerError>;

    /// A virtual user is about to start
    fn thread_started(&self, _thread: &ThreadInfo) {}

    /// A virtual user has finished
    fn thread_finished(&self, _thread: &ThreadInfo) {}
}

/// Listener failures; isolated and logged by the notifier
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// The listener cannot accept events
    #[error("Listener unavailable: {0}")]
    Unavailable(String),

    /// IO error while recording the event
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The event could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
