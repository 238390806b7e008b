//! Builder pattern for ThreadEngine construction

use crate::compiler::CompiledPlan;
use crate::config::OnSampleError;
use crate::error::{PlanError, PlanResult};
use crate::notifier::ListenerNotifier;
use crate::result::ThreadInfo;
use crate::variables::Variables;

use super::executor::{StopSignal, ThreadEngine};
use super::pacer::SamplePacer;

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

/// Builder for creating ThreadEngine instances
///
/// # Example
/// ```ignore
/// let engine = ThreadEngineBuilder::new(ThreadInfo::new("Users", 1))
///     .plan(plan)
///     .notifier(notifier)
///     .on_error_stop_thread(true)
///     .build()?;
///
/// let stats = engine.run();
/// ```
pub struct ThreadEngineBuilder {
    thread: ThreadInfo,
    plan: Option<Arc<CompiledPlan>>,
    notifier: Option<Arc<ListenerNotifier>>,
    stop: Option<StopSignal>,
    on_sample_error: OnSampleError,
    rate_limit: Option<f64>,
    seed: Option<u64>,
    variables: Variables,
}

impl ThreadEngineBuilder {
    /// Create a new builder for the given thread identity
    pub fn new(thread: ThreadInfo) -> Self {
        Self {
            thread,
            plan: None,
            notifier: None,
            stop: None,
            on_sample_error: OnSampleError::Continue,
            rate_limit: None,
            seed: None,
            variables: Variables::new(),
        }
    }

    /// Set the compiled plan
    pub fn plan(mut self, plan: Arc<CompiledPlan>) -> Self {
        self.plan = Some(plan);
        self
    }

    /// Set the listener notifier
    pub fn notifier(mut self, notifier: Arc<ListenerNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Set the stop signal (defaults to a private one)
    pub fn stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Set the sample error policy
    pub fn on_sample_error(mut self, policy: OnSampleError) -> Self {
        self.on_sample_error = policy;
        self
    }

    /// Stop this thread after a failed sample
    pub fn on_error_stop_thread(mut self, stop: bool) -> Self {
        self.on_sample_error = if stop {
            OnSampleError::StopThread
        } else {
            OnSampleError::Continue
        };
        self
    }

    /// Set the per-thread rate limit (samples per second)
    pub fn rate_limit(mut self, rps: Option<f64>) -> Self {
        self.rate_limit = rps;
        self
    }

    /// Seed the timer random source (entropy otherwise)
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Initial thread variables
    pub fn variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    /// Build the ThreadEngine
    ///
    /// # Errors
    /// Returns an error if the plan or the notifier is missing.
    pub fn build(self) -> PlanResult<ThreadEngine> {
        let plan = self.plan.ok_or(PlanError::missing_config("plan"))?;
        let notifier = self
            .notifier
            .ok_or(PlanError::missing_config("notifier"))?;
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(ThreadEngine::new(
            plan,
            notifier,
            self.thread,
            self.stop.unwrap_or_default(),
            self.on_sample_error,
            SamplePacer::new(self.rate_limit),
            rng,
            self.variables,
        ))
    }
}
