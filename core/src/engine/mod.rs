//! Thread engine: one virtual user replaying the compiled plan
//!
//! Each engine owns its controller run-state and variable scope and runs on
//! its own OS thread. It shares only the compiled plan and the listener
//! notifier with the other engines of its group.
//!
//! Per sample the engine:
//!
//! 1. Sleeps for the timers in scope
//! 2. Seeds variable defaults from config elements in scope
//! 3. Waits for the pacer, if a rate limit is set
//! 4. Invokes the sampler (errors and panics become failed results)
//! 5. Applies the assertions in scope
//! 6. Hands the result to the enclosing transactions or to the listeners
//! 7. Applies the sample error policy
//!
//! # Example
//!
//! ```ignore
//! use planbench_core::engine::ThreadEngineBuilder;
//!
//! let engine = ThreadEngineBuilder::new(ThreadInfo::new("Users", 1))
//!     .plan(plan)
//!     .notifier(notifier)
//!     .build()?;
//!
//! let stats = engine.run();
//! println!("Completed: {}", stats.completed);
//! ```

mod builder;
mod executor;
mod pacer;
mod stats;

pub use builder::ThreadEngineBuilder;
pub use executor::{StopSignal, ThreadEngine};
pub use pacer::SamplePacer;
pub use stats::ThreadStats;
