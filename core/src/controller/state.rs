//! Per-thread controller run-state

use crate::compiler::{CompiledPlan, SlotId};

use super::transaction::TransactionTracker;

/// Mutable state of one controller slot for one virtual user
#[derive(Debug, Clone, Default)]
pub struct ControllerState {
    /// Index of the next child to visit
    pub current: usize,

    /// Completed passes (loop controllers)
    pub iteration: u64,

    /// The controller has nothing more to yield
    pub done: bool,

    /// A sample or parent aggregate was yielded during the current pass
    pub yielded: bool,

    /// The transaction pass has started
    pub started: bool,

    /// `TransactionEnd` has been reported for the current pass
    pub end_emitted: bool,

    /// Open transaction, if any
    pub transaction: Option<TransactionTracker>,
}

/// Run-state for every slot of a compiled plan, owned by one thread
#[derive(Debug, Clone)]
pub struct RunState {
    states: Vec<ControllerState>,
}

impl RunState {
    /// Fresh run-state sized for the plan
    pub fn new(plan: &CompiledPlan) -> Self {
        Self {
            states: vec![ControllerState::default(); plan.len()],
        }
    }

    /// State of one slot
    pub fn get(&self, slot: SlotId) -> &ControllerState {
        &self.states[slot.0]
    }

    /// Mutable state of one slot
    pub fn get_mut(&mut self, slot: SlotId) -> &mut ControllerState {
        &mut self.states[slot.0]
    }

    /// Reset one slot to its initial state
    pub fn reset(&mut self, slot: SlotId) {
        self.states[slot.0] = ControllerState::default();
    }

    /// Tracker of an open transaction
    pub fn tracker_mut(&mut self, slot: SlotId) -> Option<&mut TransactionTracker> {
        self.states[slot.0].transaction.as_mut()
    }

    /// Close a transaction, handing back its tracker
    pub fn take_tracker(&mut self, slot: SlotId) -> Option<TransactionTracker> {
        self.states[slot.0].transaction.take()
    }

    /// Slots of all transactions that are still open
    pub fn open_transactions(&self) -> Vec<SlotId> {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, state)| state.transaction.is_some())
            .map(|(index, _)| SlotId(index))
            .collect()
    }
}
