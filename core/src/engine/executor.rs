//! Thread engine driver loop

use std::any::Any;
use std::cmp::Reverse;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use rand::rngs::StdRng;
use tracing::{debug, warn};

use crate::compiler::{CompiledPlan, ListenerScope, SlotId};
use crate::config::OnSampleError;
use crate::context::SampleContext;
use crate::controller::{Controller, ControllerKind, RunState, Step, TransactionConfig};
use crate::notifier::ListenerNotifier;
use crate::result::{AssertionResult, SampleEvent, SampleResult, ThreadInfo};
use crate::variables::Variables;

use super::pacer::SamplePacer;
use super::stats::ThreadStats;

/// Longest uninterrupted sleep while applying timers, so a stop request is
/// noticed promptly
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Cooperative stop flags seen by one virtual user
///
/// The thread flag stops only this engine. The group flag is shared by all
/// engines of a thread group.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    thread: Arc<AtomicBool>,
    group: Arc<AtomicBool>,
}

impl StopSignal {
    /// Fresh, unset flags
    pub fn new() -> Self {
        Self::default()
    }

    /// A signal with its own thread flag, sharing the given group flag
    pub fn for_group(group: Arc<AtomicBool>) -> Self {
        Self {
            thread: Arc::new(AtomicBool::new(false)),
            group,
        }
    }

    /// Ask this thread to stop
    pub fn stop_thread(&self) {
        self.thread.store(true, Ordering::SeqCst);
    }

    /// Ask every thread sharing the group flag to stop
    pub fn stop_group(&self) {
        self.group.store(true, Ordering::SeqCst);
    }

    /// Whether either flag is set
    pub fn is_stopped(&self) -> bool {
        self.thread.load(Ordering::SeqCst) || self.group.load(Ordering::SeqCst)
    }
}

/// One virtual user: replays the compiled plan with private run-state
///
/// The loop is: check stop -> ask the root controller for the next step ->
/// run the sampler (timers, config defaults, pacing, assertions) -> route
/// the result to open transactions or listeners -> repeat.
pub struct ThreadEngine {
    plan: Arc<CompiledPlan>,
    notifier: Arc<ListenerNotifier>,
    thread: Arc<ThreadInfo>,
    stop: StopSignal,
    on_sample_error: OnSampleError,
    pacer: SamplePacer,
    rng: StdRng,
    variables: Variables,
}

impl ThreadEngine {
    /// Create a new engine
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        plan: Arc<CompiledPlan>,
        notifier: Arc<ListenerNotifier>,
        thread: ThreadInfo,
        stop: StopSignal,
        on_sample_error: OnSampleError,
        pacer: SamplePacer,
        rng: StdRng,
        variables: Variables,
    ) -> Self {
        Self {
            plan,
            notifier,
            thread: Arc::new(thread),
            stop,
            on_sample_error,
            pacer,
            rng,
            variables,
        }
    }

    /// Identity of this virtual user
    pub fn thread(&self) -> &ThreadInfo {
        &self.thread
    }

    /// Handle that stops this engine from another thread
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Run the plan to completion or until stopped
    ///
    /// Transactions still open when the loop ends are finished innermost
    /// first, and their aggregates delivered, before the thread reports
    /// itself finished.
    pub fn run(mut self) -> ThreadStats {
        let plan = Arc::clone(&self.plan);
        let mut stats = ThreadStats::new();
        stats.start();

        self.notifier
            .thread_started(&self.thread, plan.listeners().handles());
        debug!(thread = %self.thread.name, "Thread started");

        let root = Controller::root(&plan);
        let mut state = RunState::new(&plan);
        root.initialize(&mut state);
        let mut previous: Option<SampleResult> = None;

        loop {
            if self.stop.is_stopped() {
                debug!(thread = %self.thread.name, "Stop requested");
                break;
            }

            match root.next(&mut state) {
                Step::Sample(slot) => {
                    // None: stopped while waiting on timers or pacing
                    let Some(result) = self.execute(&plan, slot, previous.as_ref()) else {
                        break;
                    };
                    stats.record(&result);
                    let failed = !result.success;
                    previous = Some(result.clone());

                    let slot = plan.slot(slot);
                    self.route(
                        &plan,
                        &mut state,
                        result,
                        slot.transactions(),
                        slot.listeners(),
                        slot.path(),
                    );

                    if failed {
                        self.apply_error_policy();
                    }
                }
                Step::TransactionEnd(slot) => {
                    self.end_transaction(&plan, &mut state, slot, &mut stats);
                }
                Step::Exhausted => break,
            }
        }

        let mut open = state.open_transactions();
        if !open.is_empty() {
            debug!(
                thread = %self.thread.name,
                open = open.len(),
                "Finishing open transactions"
            );
            open.sort_by_key(|slot| Reverse(plan.slot(*slot).transactions().len()));
            for slot in open {
                self.end_transaction(&plan, &mut state, slot, &mut stats);
            }
        }

        self.notifier
            .thread_finished(&self.thread, plan.listeners().handles());
        stats.stop();

        debug!(
            thread = %self.thread.name,
            completed = stats.completed,
            errors = stats.errors,
            transactions = stats.transactions,
            elapsed_ms = ?stats.elapsed().map(|d| d.as_millis()),
            "Thread finished"
        );

        stats
    }

    /// Execute one sampler occurrence, converting faults into failed results
    fn execute(
        &mut self,
        plan: &CompiledPlan,
        slot_id: SlotId,
        previous: Option<&SampleResult>,
    ) -> Option<SampleResult> {
        let slot = plan.slot(slot_id);
        let label = slot.name();
        let Some(scope) = slot.sampler_scope() else {
            return Some(SampleResult::fault(label, Utc::now(), "slot is not a sampler"));
        };

        let delay: Duration = scope
            .timers()
            .iter()
            .map(|timer| timer.delay(&mut self.rng))
            .sum();
        self.pause(delay);

        for config in scope.configs() {
            self.variables.apply_defaults(config);
        }

        let stop = &self.stop;
        if !self.pacer.wait_unless(|| stop.is_stopped()) || stop.is_stopped() {
            return None;
        }

        let start = Utc::now();
        let outcome = {
            let mut ctx =
                SampleContext::new(label, &self.thread, &mut self.variables, scope.properties())
                    .with_previous(previous);
            catch_unwind(AssertUnwindSafe(|| scope.sampler().sample(&mut ctx)))
        };

        let mut result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!(thread = %self.thread.name, label, error = %e, "Sampler fault");
                SampleResult::fault(label, start, e.to_string())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(thread = %self.thread.name, label, panic = %message, "Sampler panicked");
                SampleResult::fault(label, start, format!("sampler panicked: {message}"))
            }
        };

        if !scope.assertions().is_empty() {
            let ctx =
                SampleContext::new(label, &self.thread, &mut self.variables, scope.properties())
                    .with_previous(previous);
            for scoped in scope.assertions() {
                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    scoped.assertion.check(&result, &ctx)
                }))
                .unwrap_or_else(|payload| {
                    AssertionResult::error(format!(
                        "assertion panicked: {}",
                        panic_message(payload.as_ref())
                    ))
                });
                result.apply_assertion(outcome.named(scoped.name.as_str()));
            }
        }

        Some(result)
    }

    /// Deliver a result: counted by enclosing transactions (innermost first)
    /// up to the first one that wraps it; otherwise sent to listeners
    fn route(
        &self,
        plan: &CompiledPlan,
        state: &mut RunState,
        result: SampleResult,
        transactions: &[SlotId],
        listeners: &ListenerScope,
        path: &Arc<[String]>,
    ) {
        for &tx in transactions.iter().rev() {
            let wraps = is_parent_transaction(plan, tx);
            if let Some(tracker) = state.tracker_mut(tx) {
                tracker.record(&result);
                if wraps {
                    tracker.absorb(result);
                    return;
                }
            }
        }

        let event = SampleEvent::new(result, Arc::clone(&self.thread), Arc::clone(path));
        self.notifier.notify(&event, listeners.handles());
    }

    fn end_transaction(
        &self,
        plan: &CompiledPlan,
        state: &mut RunState,
        slot_id: SlotId,
        stats: &mut ThreadStats,
    ) {
        let Some(tracker) = state.take_tracker(slot_id) else {
            return;
        };
        if !is_parent_transaction(plan, slot_id) {
            return;
        }

        let slot = plan.slot(slot_id);
        let aggregate = tracker.finish(slot.name());
        debug!(
            thread = %self.thread.name,
            transaction = slot.name(),
            success = aggregate.success,
            "Transaction finished"
        );
        stats.record_transaction();
        self.route(
            plan,
            state,
            aggregate,
            slot.transactions(),
            slot.listeners(),
            slot.path(),
        );
    }

    fn apply_error_policy(&self) {
        match self.on_sample_error {
            OnSampleError::Continue => {}
            OnSampleError::StopThread => {
                debug!(thread = %self.thread.name, "Sample failed, stopping thread");
                self.stop.stop_thread();
            }
            OnSampleError::StopTest => {
                debug!(thread = %self.thread.name, "Sample failed, stopping group");
                self.stop.stop_group();
            }
        }
    }

    /// Sleep for `delay`, waking early if a stop is requested
    fn pause(&self, delay: Duration) {
        let deadline = Instant::now() + delay;
        loop {
            let now = Instant::now();
            if now >= deadline || self.stop.is_stopped() {
                return;
            }
            std::thread::sleep((deadline - now).min(STOP_POLL_INTERVAL));
        }
    }
}

impl std::fmt::Debug for ThreadEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadEngine")
            .field("thread", &self.thread.name)
            .field("slots", &self.plan.len())
            .field("on_sample_error", &self.on_sample_error)
            .field("pacer", &self.pacer)
            .finish()
    }
}

fn is_parent_transaction(plan: &CompiledPlan, slot: SlotId) -> bool {
    matches!(
        plan.slot(slot).controller_kind(),
        Some(ControllerKind::Transaction(TransactionConfig {
            generate_parent_sample: true
        }))
    )
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
