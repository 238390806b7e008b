//! Built-in samplers and assertions
//!
//! This crate provides implementations of the core `Sampler` and
//! `Assertion` traits:
//!
//! - `DebugSampler`: reports the thread's variables and the node properties
//! - `FnSampler`: wraps a closure
//! - `SimulatedSampler`: random latency and failure rate, no I/O
//! - `ResponseAssertion`: pattern checks against a result field
//! - `DurationAssertion`: upper bound on elapsed time

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod assertion;
pub mod debug;
pub mod function;
pub mod simulated;

pub use assertion::{
    AssertionConfigError, DurationAssertion, MatchRule, ResponseAssertion, ResponseField,
};
pub use debug::DebugSampler;
pub use function::FnSampler;
pub use simulated::{LatencyModel, SimulatedSampler};

#[cfg(test)]
pub(crate) mod test_context {
    use std::collections::BTreeMap;

    use planbench_core::{PropertyValue, SampleContext, ThreadInfo, Variables};

    /// Owns everything a `SampleContext` borrows
    pub struct Fixture {
        pub thread: ThreadInfo,
        pub variables: Variables,
        pub properties: BTreeMap<String, PropertyValue>,
    }

    impl Fixture {
        pub fn new() -> Self {
            Self {
                thread: ThreadInfo::new("Users", 1),
                variables: Variables::new(),
                properties: BTreeMap::new(),
            }
        }

        pub fn context<'a>(&'a mut self, label: &'a str) -> SampleContext<'a> {
            SampleContext::new(label, &self.thread, &mut self.variables, &self.properties)
        }
    }
}
