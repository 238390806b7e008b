//! Sampler that reports the state it runs in

use planbench_core::{SampleContext, SampleResult, Sampler, SamplerError};

/// Reports the calling thread's variables (and optionally the node's
/// properties) as its response data
///
/// Always succeeds with code `200` and message `OK`. Useful for checking
/// what config elements and earlier samplers left in a thread's scope.
#[derive(Debug, Clone, Default)]
pub struct DebugSampler {
    include_properties: bool,
}

impl DebugSampler {
    /// Dump variables only
    pub fn new() -> Self {
        Self::default()
    }

    /// Also dump the sampler node's property bag
    pub fn with_properties(mut self) -> Self {
        self.include_properties = true;
        self
    }
}

impl Sampler for DebugSampler {
    fn sample(&self, ctx: &mut SampleContext<'_>) -> Result<SampleResult, SamplerError> {
        let mut data = String::new();
        for (key, value) in ctx.variables().iter_sorted() {
            data.push_str(&format!("{key}={value}\n"));
        }

        if self.include_properties && !ctx.properties().is_empty() {
            data.push_str("\nProperties:\n");
            for (key, value) in ctx.properties() {
                data.push_str(&format!("{key}={value}\n"));
            }
        }

        let mut result = SampleResult::success(ctx.label(), "200", "OK").with_response_data(data);
        result.finish();
        Ok(result)
    }
}
