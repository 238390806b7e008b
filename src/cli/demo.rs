//! Built-in demo plan
//!
//! ```text
//! Test Plan
//! ├── User Defaults (config)
//! ├── Think Time (timer, when requested)
//! ├── Debug
//! └── Loop
//!     └── Checkout (transaction)
//!         ├── Status OK (assertion)
//!         ├── Login
//!         ├── Browse
//!         └── Pay
//! ```

use std::time::Duration;

use anyhow::{Context, Result};

use planbench_core::{ConfigElement, Element, PlanTree, Timer};
use planbench_samplers::{DebugSampler, DurationAssertion, LatencyModel, ResponseAssertion, SimulatedSampler};

/// Knobs exposed on the command line
#[derive(Debug, Clone)]
pub struct DemoOptions {
    pub loops: u64,
    pub forever: bool,
    pub parent_sample: bool,
    pub latency_ms: f64,
    pub failure_rate: f64,
    pub think: Duration,
}

fn simulated(mean_ms: f64, failure_rate: f64) -> Result<SimulatedSampler> {
    let latency = LatencyModel::normal(mean_ms, mean_ms / 4.0)
        .context("Invalid simulated latency")?;
    SimulatedSampler::new(latency)
        .with_failure_rate(failure_rate)
        .context("Invalid failure rate")
}

/// Build the demo plan tree
pub fn build_plan(options: &DemoOptions) -> Result<PlanTree> {
    let mut tree = PlanTree::new("Test Plan");
    let root = tree.root();

    tree.add_child(
        root,
        "User Defaults",
        Element::Config(
            ConfigElement::new()
                .with_variable("host", "shop.example.test")
                .with_variable("user", "demo"),
        ),
    )?;
    if !options.think.is_zero() {
        tree.add_child(
            root,
            "Think Time",
            Element::Timer(Timer::uniform(options.think, options.think)),
        )?;
    }
    tree.add_child(root, "Debug", Element::sampler(DebugSampler::new()))?;

    let looped = tree.add_child(
        root,
        "Loop",
        Element::loop_controller(options.loops, options.forever),
    )?;
    let checkout = tree.add_child(
        looped,
        "Checkout",
        Element::transaction(options.parent_sample),
    )?;
    tree.add_child(
        checkout,
        "Status OK",
        Element::assertion(ResponseAssertion::code("200")),
    )?;

    let steps = [
        ("Login", options.latency_ms),
        ("Browse", options.latency_ms * 2.0),
        ("Pay", options.latency_ms * 1.5),
    ];
    for (name, mean_ms) in steps {
        let sampler = tree.add_child(
            checkout,
            name,
            Element::sampler(simulated(mean_ms, options.failure_rate)?),
        )?;
        if name == "Pay" {
            // Payment gets a hard latency budget on top of the status check
            let budget = Duration::from_millis((mean_ms * 4.0).max(1.0) as u64);
            tree.add_child(
                sampler,
                "Pay Budget",
                Element::assertion(DurationAssertion::new(budget)),
            )?;
        }
    }

    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use planbench_core::TreeCompiler;
    use std::sync::Arc;

    fn options() -> DemoOptions {
        DemoOptions {
            loops: 2,
            forever: false,
            parent_sample: true,
            latency_ms: 1.0,
            failure_rate: 0.0,
            think: Duration::ZERO,
        }
    }

    #[test]
    fn test_demo_plan_compiles() {
        let tree = build_plan(&options()).unwrap();
        let plan = TreeCompiler::compile(&Arc::new(tree)).unwrap();
        assert_eq!(plan.sampler_count(), 4);
    }

    #[test]
    fn test_demo_plan_rejects_bad_failure_rate() {
        let mut opts = options();
        opts.failure_rate = 2.0;
        assert!(build_plan(&opts).is_err());
    }
}
