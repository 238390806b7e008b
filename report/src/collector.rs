//! In-memory event collector

use std::sync::{Mutex, MutexGuard};

use planbench_core::{ListenerError, SampleEvent, SampleListener};

/// Keeps every delivered event, in delivery order
#[derive(Debug, Default)]
pub struct ResultCollector {
    events: Mutex<Vec<SampleEvent>>,
}

impl ResultCollector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the collected events
    pub fn events(&self) -> Vec<SampleEvent> {
        self.lock().clone()
    }

    /// Events whose result carries the given label
    pub fn events_for(&self, label: &str) -> Vec<SampleEvent> {
        self.lock()
            .iter()
            .filter(|event| event.label() == label)
            .cloned()
            .collect()
    }

    /// Number of collected events
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing was collected
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop everything collected so far
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// The event list, recovered if another listener thread panicked
    /// while holding it
    fn lock(&self) -> MutexGuard<'_, Vec<SampleEvent>> {
        match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl SampleListener for ResultCollector {
    fn sample_occurred(&self, event: &SampleEvent) -> Result<(), ListenerError> {
        self.lock().push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_events::event;

    #[test]
    fn test_collects_in_order() {
        let collector = ResultCollector::new();
        assert!(collector.is_empty());

        collector.sample_occurred(&event("login", true, 5)).unwrap();
        collector.sample_occurred(&event("search", false, 7)).unwrap();
        collector.sample_occurred(&event("login", true, 3)).unwrap();

        assert_eq!(collector.len(), 3);
        let labels: Vec<_> = collector
            .events()
            .iter()
            .map(|e| e.label().to_string())
            .collect();
        assert_eq!(labels, vec!["login", "search", "login"]);
        assert_eq!(collector.events_for("login").len(), 2);

        collector.clear();
        assert!(collector.is_empty());
    }

    #[test]
    fn test_poisoned_lock_keeps_events() {
        let collector = ResultCollector::new();
        collector.sample_occurred(&event("login", true, 5)).unwrap();

        let poisoned = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = collector.events.lock().unwrap();
            panic!("listener thread died");
        }));
        assert!(poisoned.is_err());
        assert!(collector.events.is_poisoned());

        assert_eq!(collector.len(), 1);
        assert_eq!(collector.events_for("login").len(), 1);
        collector.sample_occurred(&event("search", true, 2)).unwrap();
        assert_eq!(collector.events().len(), 2);
    }
}
