//! Controller state machine
//!
//! Controllers decide which sampler runs next. They are evaluated against a
//! compiled plan (shared, read-only) and a [`RunState`] owned by exactly one
//! virtual user, so the same plan can be replayed by many threads at once.
//!
//! Three variants exist:
//!
//! - **Generic**: runs each child once, in order, then is done
//! - **Loop**: repeats its children `loops` times, or until stopped when
//!   `continue_forever` is set
//! - **Transaction**: runs its children once and then reports
//!   [`Step::TransactionEnd`] so the engine can deliver the aggregate
//!
//! # Example
//!
//! ```ignore
//! let controller = Controller::root(&plan);
//! let mut state = RunState::new(&plan);
//! controller.initialize(&mut state);
//!
//! loop {
//!     match controller.next(&mut state) {
//!         Step::Sample(slot) => run_sampler(slot),
//!         Step::TransactionEnd(slot) => finish_transaction(slot),
//!         Step::Exhausted => break,
//!     }
//! }
//! ```

mod state;
mod transaction;

pub use state::{ControllerState, RunState};
pub use transaction::{transaction_message, TransactionTracker};

use serde::{Deserialize, Serialize};

use crate::compiler::{CompiledPlan, SlotId, SlotKind};

/// Loop controller settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Number of passes over the children
    pub loops: u64,

    /// Ignore `loops` and repeat until the thread is stopped
    pub continue_forever: bool,
}

/// Transaction controller settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionConfig {
    /// Deliver one aggregate record wrapping the child records instead of
    /// forwarding each child as it completes
    pub generate_parent_sample: bool,
}

/// Closed set of controller variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControllerKind {
    /// Run children once in order
    Generic,
    /// Repeat children
    Loop(LoopConfig),
    /// Group children into a transaction
    Transaction(TransactionConfig),
}

/// What a controller yields on each call to [`Controller::next`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Run the sampler in this slot
    Sample(SlotId),
    /// The transaction in this slot finished its pass
    TransactionEnd(SlotId),
    /// Nothing left to do
    Exhausted,
}

static GENERIC: ControllerKind = ControllerKind::Generic;

/// A controller slot viewed through a compiled plan
#[derive(Debug, Clone, Copy)]
pub struct Controller<'p> {
    plan: &'p CompiledPlan,
    slot: SlotId,
}

impl<'p> Controller<'p> {
    /// View the given slot as a controller
    ///
    /// A sampler slot behaves as an empty generic controller.
    pub fn new(plan: &'p CompiledPlan, slot: SlotId) -> Self {
        Self { plan, slot }
    }

    /// The root controller of a plan
    pub fn root(plan: &'p CompiledPlan) -> Self {
        Self::new(plan, plan.root())
    }

    /// Slot this controller operates on
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    fn kind(&self) -> &'p ControllerKind {
        self.plan.slot(self.slot).controller_kind().unwrap_or(&GENERIC)
    }

    fn children(&self) -> &'p [SlotId] {
        self.plan.slot(self.slot).children()
    }

    /// Reset run-state for this controller and its whole subtree
    pub fn initialize(&self, state: &mut RunState) {
        state.reset(self.slot);
        for child in self.children() {
            if matches!(self.plan.slot(*child).kind(), SlotKind::Controller { .. }) {
                Controller::new(self.plan, *child).initialize(state);
            }
        }
    }

    /// Whether this controller has finished
    pub fn is_done(&self, state: &RunState) -> bool {
        state.get(self.slot).done
    }

    /// Advance to the next step
    pub fn next(&self, state: &mut RunState) -> Step {
        if state.get(self.slot).done {
            return Step::Exhausted;
        }

        match *self.kind() {
            ControllerKind::Generic => {
                let step = self.next_child(state);
                if step == Step::Exhausted {
                    state.get_mut(self.slot).done = true;
                }
                step
            }
            ControllerKind::Loop(config) => self.next_loop(state, config),
            ControllerKind::Transaction(_) => self.next_transaction(state),
        }
    }

    fn next_loop(&self, state: &mut RunState, config: LoopConfig) -> Step {
        if !config.continue_forever && config.loops == 0 {
            state.get_mut(self.slot).done = true;
            return Step::Exhausted;
        }

        loop {
            let step = self.next_child(state);
            if step != Step::Exhausted {
                return step;
            }

            // End of a pass; a forever loop whose pass delivered nothing ends
            let current = state.get_mut(self.slot);
            current.iteration += 1;
            let finished = if config.continue_forever {
                !current.yielded
            } else {
                current.iteration >= config.loops
            };
            if finished {
                current.done = true;
                return Step::Exhausted;
            }

            current.current = 0;
            current.yielded = false;
            for child in self.children() {
                if matches!(self.plan.slot(*child).kind(), SlotKind::Controller { .. }) {
                    Controller::new(self.plan, *child).initialize(state);
                }
            }
        }
    }

    fn next_transaction(&self, state: &mut RunState) -> Step {
        let current = state.get_mut(self.slot);
        if current.end_emitted {
            current.done = true;
            return Step::Exhausted;
        }
        if !current.started {
            current.started = true;
            current.transaction = Some(TransactionTracker::begin());
        }

        match self.next_child(state) {
            Step::Exhausted => {
                state.get_mut(self.slot).end_emitted = true;
                Step::TransactionEnd(self.slot)
            }
            step => step,
        }
    }

    /// Whether the step produces a result for the engine to deliver
    fn delivers(&self, step: Step) -> bool {
        match step {
            Step::Sample(_) => true,
            Step::TransactionEnd(slot) => matches!(
                self.plan.slot(slot).controller_kind(),
                Some(ControllerKind::Transaction(TransactionConfig {
                    generate_parent_sample: true
                }))
            ),
            Step::Exhausted => false,
        }
    }

    /// Step through the children in order, descending into child
    /// controllers until one yields
    fn next_child(&self, state: &mut RunState) -> Step {
        let children = self.children();
        loop {
            let index = state.get(self.slot).current;
            let Some(&child) = children.get(index) else {
                return Step::Exhausted;
            };

            let step = match self.plan.slot(child).kind() {
                SlotKind::Sampler(_) => {
                    state.get_mut(self.slot).current += 1;
                    Step::Sample(child)
                }
                SlotKind::Controller { .. } => {
                    let step = Controller::new(self.plan, child).next(state);
                    if step == Step::Exhausted {
                        state.get_mut(self.slot).current += 1;
                        continue;
                    }
                    step
                }
            };

            if self.delivers(step) {
                state.get_mut(self.slot).yielded = true;
            }
            return step;
        }
    }
}

#[cfg(test)]
mod tests;
