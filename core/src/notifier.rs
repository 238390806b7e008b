//! Listener notifier: fans sample events out to observers
//!
//! Delivery is synchronous on the calling virtual user's thread. A failing
//! or panicking listener is logged and counted; the remaining listeners
//! still receive the event.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::warn;

use crate::result::{SampleEvent, ThreadInfo};
use crate::traits::SampleListener;

/// Delivers events to scoped and globally registered listeners
#[derive(Default)]
pub struct ListenerNotifier {
    global: RwLock<Vec<Arc<dyn SampleListener>>>,
    failures: AtomicU64,
}

impl ListenerNotifier {
    /// Create a notifier with no global listeners
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener that receives every event of every thread
    pub fn register(&self, listener: Arc<dyn SampleListener>) {
        match self.global.write() {
            Ok(mut global) => global.push(listener),
            Err(poisoned) => poisoned.into_inner().push(listener),
        }
    }

    /// Number of globally registered listeners
    pub fn global_count(&self) -> usize {
        self.snapshot().len()
    }

    /// Deliver an event to the scoped listeners (in order) and then to the
    /// global listeners (in registration order)
    pub fn notify(&self, event: &SampleEvent, scoped: &[Arc<dyn SampleListener>]) {
        for listener in scoped {
            self.deliver(listener.as_ref(), event);
        }
        for listener in self.snapshot() {
            self.deliver(listener.as_ref(), event);
        }
    }

    /// Run the `thread_started` hook of each listener
    pub fn thread_started(&self, thread: &ThreadInfo, scoped: &[Arc<dyn SampleListener>]) {
        self.each_hook(scoped, thread, |listener, thread| listener.thread_started(thread));
    }

    /// Run the `thread_finished` hook of each listener
    pub fn thread_finished(&self, thread: &ThreadInfo, scoped: &[Arc<dyn SampleListener>]) {
        self.each_hook(scoped, thread, |listener, thread| listener.thread_finished(thread));
    }

    /// Deliveries that returned an error or panicked
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    fn snapshot(&self) -> Vec<Arc<dyn SampleListener>> {
        match self.global.read() {
            Ok(global) => global.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn deliver(&self, listener: &dyn SampleListener, event: &SampleEvent) {
        match catch_unwind(AssertUnwindSafe(|| listener.sample_occurred(event))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    thread = %event.thread.name,
                    label = %event.label(),
                    error = %e,
                    "Listener failed"
                );
            }
            Err(_) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    thread = %event.thread.name,
                    label = %event.label(),
                    "Listener panicked"
                );
            }
        }
    }

    fn each_hook<F>(&self, scoped: &[Arc<dyn SampleListener>], thread: &ThreadInfo, hook: F)
    where
        F: Fn(&dyn SampleListener, &ThreadInfo),
    {
        let global = self.snapshot();
        for listener in scoped.iter().chain(global.iter()) {
            if catch_unwind(AssertUnwindSafe(|| hook(listener.as_ref(), thread))).is_err() {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!(thread = %thread.name, "Listener lifecycle hook panicked");
            }
        }
    }
}

impl std::fmt::Debug for ListenerNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerNotifier")
            .field("global", &self.global_count())
            .field("failures", &self.failures())
            .finish()
    }
}
