//! Closure-backed sampler

use std::fmt;

use planbench_core::{SampleContext, SampleResult, Sampler, SamplerError};

type SampleFn = dyn Fn(&mut SampleContext<'_>) -> Result<SampleResult, SamplerError> + Send + Sync;

/// Sampler whose work is a closure
///
/// The closure is shared by every thread, so it must be `Send + Sync`.
pub struct FnSampler {
    f: Box<SampleFn>,
}

impl FnSampler {
    /// Wrap a closure
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut SampleContext<'_>) -> Result<SampleResult, SamplerError> + Send + Sync + 'static,
    {
        Self { f: Box::new(f) }
    }
}

impl Sampler for FnSampler {
    fn sample(&self, ctx: &mut SampleContext<'_>) -> Result<SampleResult, SamplerError> {
        (self.f)(ctx)
    }
}

impl fmt::Debug for FnSampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSampler").finish_non_exhaustive()
    }
}
