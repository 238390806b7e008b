//! planbench-core: execution scheduling core for load-test plans
//!
//! This crate turns a hierarchical test plan into concurrent, repeatable
//! sample execution, including:
//!
//! - The plan tree and its compiler (scoping of assertions, listeners,
//!   config defaults and timers)
//! - Controllers (generic, loop, transaction) with per-thread run-state
//! - The per-thread engine and the thread group managing virtual users
//! - Listener notification with transaction-aware routing
//! - Error handling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compiler;
pub mod config;
pub mod context;
pub mod controller;
pub mod engine;
pub mod error;
pub mod group;
pub mod notifier;
pub mod plan;
pub mod result;
pub mod timer;
pub mod traits;
pub mod variables;

#[cfg(test)]
mod test_support;

pub use compiler::{CompiledPlan, Slot, SlotId, SlotKind, TreeCompiler};
pub use config::{ConfigError, OnSampleError, ThreadGroupConfig};
pub use context::SampleContext;
pub use controller::{
    transaction_message, Controller, ControllerKind, LoopConfig, RunState, Step,
    TransactionConfig, TransactionTracker,
};
pub use engine::{SamplePacer, StopSignal, ThreadEngine, ThreadEngineBuilder, ThreadStats};
pub use error::*;
pub use group::{
    aggregate_thread_stats, AggregatedStats, GroupStopHandle, ThreadGroup, ThreadGroupBuilder,
};
pub use notifier::ListenerNotifier;
pub use plan::{ConfigElement, Element, NodeId, PlanNode, PlanTree, PropertyValue};
pub use result::{AssertionResult, SampleEvent, SampleResult, ThreadInfo};
pub use timer::Timer;
pub use traits::*;
pub use variables::Variables;
