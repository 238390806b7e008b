//! Thread group execution logic

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::compiler::CompiledPlan;
use crate::config::ThreadGroupConfig;
use crate::engine::{StopSignal, ThreadEngineBuilder, ThreadStats};
use crate::error::{PlanError, PlanResult};
use crate::notifier::ListenerNotifier;
use crate::result::ThreadInfo;
use crate::variables::Variables;

use super::aggregator::aggregate_thread_stats;

/// Polling interval for ramp-up waits, the duration watcher and
/// `join_timeout`
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Cloneable handle that stops a running group from anywhere
#[derive(Debug, Clone)]
pub struct GroupStopHandle {
    flag: Arc<AtomicBool>,
}

impl GroupStopHandle {
    /// Ask every thread of the group to stop
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested
    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Thread group manages the lifecycle of its virtual users
///
/// Responsible for spawning engines, coordinating shutdown and collecting
/// per-thread statistics.
pub struct ThreadGroup {
    /// Group configuration
    pub(crate) config: ThreadGroupConfig,

    /// Compiled plan (shared by all engines)
    pub(crate) plan: Arc<CompiledPlan>,

    /// Listener notifier (shared by all engines)
    pub(crate) notifier: Arc<ListenerNotifier>,

    /// Initial variables given to every thread
    pub(crate) variables: Variables,

    /// Base seed for timer randomness
    pub(crate) seed: Option<u64>,

    /// Stop flag shared by all engines
    pub(crate) stop: Arc<AtomicBool>,

    /// Set once all engines have been joined
    finished: Arc<AtomicBool>,

    handles: Vec<JoinHandle<ThreadStats>>,
    watcher: Option<JoinHandle<()>>,
    started_at: Option<Instant>,
}

impl ThreadGroup {
    /// Create a new thread group
    ///
    /// Use `ThreadGroupBuilder` for validated construction.
    pub fn new(
        config: ThreadGroupConfig,
        plan: Arc<CompiledPlan>,
        notifier: Arc<ListenerNotifier>,
    ) -> Self {
        Self {
            config,
            plan,
            notifier,
            variables: Variables::new(),
            seed: None,
            stop: Arc::new(AtomicBool::new(false)),
            finished: Arc::new(AtomicBool::new(false)),
            handles: Vec::new(),
            watcher: None,
            started_at: None,
        }
    }

    /// Group configuration
    pub fn config(&self) -> &ThreadGroupConfig {
        &self.config
    }

    /// Listener notifier shared by the engines
    pub fn notifier(&self) -> &Arc<ListenerNotifier> {
        &self.notifier
    }

    /// Handle for stopping the group from another thread or task
    pub fn stop_handle(&self) -> GroupStopHandle {
        GroupStopHandle {
            flag: Arc::clone(&self.stop),
        }
    }

    /// Whether the group has been started
    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    /// Spawn all virtual users
    ///
    /// Returns once every OS thread is spawned; threads honor their ramp-up
    /// delay themselves.
    pub fn start(&mut self) -> PlanResult<()> {
        if self.is_started() {
            return Err(PlanError::group(format!(
                "'{}' has already been started",
                self.config.name
            )));
        }
        self.started_at = Some(Instant::now());

        info!(
            group = %self.config.name,
            threads = self.config.num_threads,
            ramp_up_ms = self.config.ramp_up_ms,
            duration_secs = ?self.config.duration_secs,
            rate_limit = ?self.config.rate_limit,
            "Starting thread group"
        );

        let handles = spawn_all(&self.stop, self.config.num_threads, |index| {
            let thread = ThreadInfo::new(self.config.name.clone(), index + 1);
            let name = thread.name.clone();

            let mut builder = ThreadEngineBuilder::new(thread)
                .plan(Arc::clone(&self.plan))
                .notifier(Arc::clone(&self.notifier))
                .stop_signal(StopSignal::for_group(Arc::clone(&self.stop)))
                .on_sample_error(self.config.on_sample_error)
                .rate_limit(self.config.rate_limit)
                .variables(self.variables.clone());
            if let Some(seed) = self.seed {
                builder = builder.seed(seed.wrapping_add(index as u64));
            }
            let engine = builder.build()?;

            let delay = self.config.start_delay(index);
            let stop = Arc::clone(&self.stop);
            let handle = std::thread::Builder::new()
                .name(name)
                .spawn(move || {
                    if wait_or_stopped(&stop, delay) {
                        return ThreadStats::new();
                    }
                    engine.run()
                })?;
            Ok(handle)
        })?;
        self.handles = handles;

        if let Some(limit) = self.config.duration() {
            let stop = Arc::clone(&self.stop);
            let finished = Arc::clone(&self.finished);
            let group = self.config.name.clone();
            let watcher = std::thread::Builder::new()
                .name(format!("{group} timer"))
                .spawn(move || {
                    let deadline = Instant::now() + limit;
                    while Instant::now() < deadline {
                        if finished.load(Ordering::SeqCst) || stop.load(Ordering::SeqCst) {
                            return;
                        }
                        std::thread::sleep(POLL_INTERVAL);
                    }
                    info!(group = %group, "Duration reached, stopping thread group");
                    stop.store(true, Ordering::SeqCst);
                });
            match watcher {
                Ok(watcher) => self.watcher = Some(watcher),
                Err(e) => {
                    error!(group = %self.config.name, error = %e, "Failed to start duration timer");
                    self.stop.store(true, Ordering::SeqCst);
                    return Err(e.into());
                }
            }
        }

        Ok(())
    }

    /// Ask every virtual user to stop after its in-flight sample
    pub fn stop(&self) {
        info!(group = %self.config.name, "Stopping thread group");
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Wait for every virtual user to finish
    ///
    /// # Errors
    /// Returns an error if the group was never started, or if every thread
    /// panicked.
    pub fn join(mut self) -> PlanResult<Vec<ThreadStats>> {
        if !self.is_started() {
            return Err(PlanError::group(format!(
                "'{}' was never started",
                self.config.name
            )));
        }

        let mut results = Vec::with_capacity(self.handles.len());
        let mut thread_failures = 0;
        for (idx, handle) in std::mem::take(&mut self.handles).into_iter().enumerate() {
            match handle.join() {
                Ok(stats) => {
                    debug!(
                        thread = idx + 1,
                        completed = stats.completed,
                        errors = stats.errors,
                        "Thread joined"
                    );
                    results.push(stats);
                }
                Err(_) => {
                    thread_failures += 1;
                    error!(group = %self.config.name, thread = idx + 1, "Thread panicked");
                }
            }
        }

        self.finished.store(true, Ordering::SeqCst);
        if let Some(watcher) = self.watcher.take() {
            if watcher.join().is_err() {
                error!(group = %self.config.name, "Duration timer panicked");
            }
        }

        if results.is_empty() && thread_failures > 0 {
            return Err(PlanError::group(format!(
                "All {} threads failed to complete",
                thread_failures
            )));
        }

        let elapsed = self.started_at.map(|t| t.elapsed()).unwrap_or_default();
        let aggregated = aggregate_thread_stats(&results);
        info!(
            group = %self.config.name,
            elapsed_secs = elapsed.as_secs_f64(),
            total_completed = aggregated.total_completed,
            total_errors = aggregated.total_errors,
            transactions = aggregated.total_transactions,
            sps = aggregated.samples_per_second,
            listener_failures = self.notifier.failures(),
            "Thread group finished"
        );

        Ok(results)
    }

    /// Wait up to `timeout` for the threads to finish, then stop the group
    /// and wait for the in-flight samples
    pub fn join_timeout(self, timeout: Duration) -> PlanResult<Vec<ThreadStats>> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.handles.iter().all(|handle| handle.is_finished()) {
                return self.join();
            }
            std::thread::sleep(POLL_INTERVAL);
        }

        info!(group = %self.config.name, "Join timed out, stopping thread group");
        self.stop();
        self.join()
    }

    /// Start the group and wait for it to finish
    pub fn run(mut self) -> PlanResult<Vec<ThreadStats>> {
        self.start()?;
        self.join()
    }
}

impl std::fmt::Debug for ThreadGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadGroup")
            .field("config", &self.config)
            .field("slots", &self.plan.len())
            .field("started", &self.is_started())
            .finish()
    }
}

/// Spawn `count` threads through `spawn`
///
/// On the first failure the stop flag is raised so the threads already
/// running wind down, and the error is returned.
pub(crate) fn spawn_all<T, F>(
    stop: &AtomicBool,
    count: usize,
    mut spawn: F,
) -> PlanResult<Vec<JoinHandle<T>>>
where
    F: FnMut(usize) -> PlanResult<JoinHandle<T>>,
{
    let mut handles = Vec::with_capacity(count);
    for index in 0..count {
        match spawn(index) {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                stop.store(true, Ordering::SeqCst);
                error!(
                    thread = index + 1,
                    running = handles.len(),
                    error = %e,
                    "Failed to start thread, stopping the threads already running"
                );
                return Err(e);
            }
        }
    }
    Ok(handles)
}

/// Sleep for `delay` unless the flag is raised first; returns whether it was
fn wait_or_stopped(stop: &AtomicBool, delay: Duration) -> bool {
    let deadline = Instant::now() + delay;
    loop {
        if stop.load(Ordering::SeqCst) {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        std::thread::sleep((deadline - now).min(POLL_INTERVAL));
    }
}
