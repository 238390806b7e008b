//! Thread group: lifecycle of N virtual users over one compiled plan
//!
//! The group:
//! - Spawns one named OS thread per virtual user, staggered over the ramp-up
//! - Shares only the compiled plan and the listener notifier between them
//! - Stops every thread cooperatively through a shared stop flag
//! - Optionally stops itself after a wall-clock duration
//! - Joins all threads and aggregates their statistics
//!
//! # Example
//!
//! ```ignore
//! use planbench_core::{ThreadGroupBuilder, ThreadGroupConfig};
//!
//! let group = ThreadGroupBuilder::new()
//!     .config(ThreadGroupConfig::new(10).with_ramp_up(Duration::from_secs(5)))
//!     .plan(plan)
//!     .listener(collector)
//!     .build()?;
//!
//! let stats = group.run()?;
//! ```

mod aggregator;
mod builder;
mod executor;

pub use aggregator::{aggregate_thread_stats, AggregatedStats};
pub use builder::ThreadGroupBuilder;
pub use executor::{GroupStopHandle, ThreadGroup};
