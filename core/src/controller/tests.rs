//! Tests for the controller state machine

use super::*;
use crate::compiler::TreeCompiler;
use crate::plan::{Element, NodeId, PlanTree};
use crate::test_support::CountingSampler;

use std::sync::Arc;

// ============================================================================
// Helpers
// ============================================================================

fn sampler() -> Element {
    Element::sampler(CountingSampler::new())
}

/// Drive the root controller to exhaustion, collecting step labels.
/// `TransactionEnd` steps are rendered as `end:<name>`.
fn drain(tree: PlanTree, limit: usize) -> Vec<String> {
    let plan = TreeCompiler::compile(&Arc::new(tree)).expect("plan compiles");
    let root = Controller::root(&plan);
    let mut state = RunState::new(&plan);
    root.initialize(&mut state);

    let mut labels = Vec::new();
    for _ in 0..limit {
        match root.next(&mut state) {
            Step::Sample(slot) => labels.push(plan.slot(slot).name().to_string()),
            Step::TransactionEnd(slot) => labels.push(format!("end:{}", plan.slot(slot).name())),
            Step::Exhausted => break,
        }
    }
    labels
}

fn add(tree: &mut PlanTree, parent: NodeId, name: &str, element: Element) -> NodeId {
    tree.add_child(parent, name, element).expect("parent exists")
}

// ============================================================================
// Generic Controller
// ============================================================================

#[test]
fn test_generic_runs_children_once_in_order() {
    let mut tree = PlanTree::new("Plan");
    let root = tree.root();
    add(&mut tree, root, "a", sampler());
    add(&mut tree, root, "b", sampler());
    add(&mut tree, root, "c", sampler());

    assert_eq!(drain(tree, 100), vec!["a", "b", "c"]);
}

#[test]
fn test_generic_is_done_after_exhaustion() {
    let mut tree = PlanTree::new("Plan");
    add(&mut tree, NodeId(0), "a", sampler());
    let plan = TreeCompiler::compile(&Arc::new(tree)).unwrap();

    let root = Controller::root(&plan);
    let mut state = RunState::new(&plan);
    root.initialize(&mut state);

    assert!(!root.is_done(&state));
    assert!(matches!(root.next(&mut state), Step::Sample(_)));
    assert_eq!(root.next(&mut state), Step::Exhausted);
    assert!(root.is_done(&state));
    assert_eq!(root.next(&mut state), Step::Exhausted);
}

#[test]
fn test_empty_plan_is_exhausted_immediately() {
    let tree = PlanTree::new("Plan");
    assert!(drain(tree, 10).is_empty());
}

#[test]
fn test_nested_generic_controllers() {
    let mut tree = PlanTree::new("Plan");
    let root = tree.root();
    let g1 = add(&mut tree, root, "g1", Element::generic());
    add(&mut tree, g1, "a", sampler());
    let g2 = add(&mut tree, g1, "g2", Element::generic());
    add(&mut tree, g2, "b", sampler());
    add(&mut tree, root, "c", sampler());

    assert_eq!(drain(tree, 100), vec!["a", "b", "c"]);
}

// ============================================================================
// Loop Controller
// ============================================================================

#[test]
fn test_loop_repeats_children() {
    let mut tree = PlanTree::new("Plan");
    let l = add(&mut tree, NodeId(0), "loop", Element::loop_controller(3, false));
    add(&mut tree, l, "a", sampler());
    add(&mut tree, l, "b", sampler());

    assert_eq!(drain(tree, 100), vec!["a", "b", "a", "b", "a", "b"]);
}

#[test]
fn test_loop_yields_loops_times_children() {
    for loops in [1u64, 2, 5, 13] {
        for children in 1..=4usize {
            let mut tree = PlanTree::new("Plan");
            let l = add(&mut tree, NodeId(0), "loop", Element::loop_controller(loops, false));
            for c in 0..children {
                add(&mut tree, l, &format!("s{c}"), sampler());
            }

            let labels = drain(tree, 10_000);
            assert_eq!(labels.len(), loops as usize * children, "loops={loops} children={children}");
            for (i, label) in labels.iter().enumerate() {
                assert_eq!(label, &format!("s{}", i % children));
            }
        }
    }
}

#[test]
fn test_loop_zero_yields_nothing() {
    let mut tree = PlanTree::new("Plan");
    let l = add(&mut tree, NodeId(0), "loop", Element::loop_controller(0, false));
    add(&mut tree, l, "a", sampler());
    add(&mut tree, NodeId(0), "after", sampler());

    assert_eq!(drain(tree, 100), vec!["after"]);
}

#[test]
fn test_loop_reinitializes_nested_controllers() {
    let mut tree = PlanTree::new("Plan");
    let outer = add(&mut tree, NodeId(0), "outer", Element::loop_controller(2, false));
    let inner = add(&mut tree, outer, "inner", Element::loop_controller(2, false));
    add(&mut tree, inner, "a", sampler());
    add(&mut tree, outer, "b", sampler());

    assert_eq!(drain(tree, 100), vec!["a", "a", "b", "a", "a", "b"]);
}

#[test]
fn test_forever_loop_keeps_yielding() {
    let mut tree = PlanTree::new("Plan");
    let l = add(&mut tree, NodeId(0), "loop", Element::loop_controller(1, true));
    add(&mut tree, l, "a", sampler());

    let labels = drain(tree, 50);
    assert_eq!(labels.len(), 50);
    assert!(labels.iter().all(|label| label == "a"));
}

#[test]
fn test_forever_loop_without_samplers_terminates() {
    let mut tree = PlanTree::new("Plan");
    let l = add(&mut tree, NodeId(0), "loop", Element::loop_controller(1, true));
    add(&mut tree, l, "empty", Element::generic());

    assert!(drain(tree, 1000).is_empty());
}

#[test]
fn test_loop_iteration_count() {
    let mut tree = PlanTree::new("Plan");
    let l = add(&mut tree, NodeId(0), "loop", Element::loop_controller(4, false));
    add(&mut tree, l, "a", sampler());
    let plan = TreeCompiler::compile(&Arc::new(tree)).unwrap();

    let root = Controller::root(&plan);
    let mut state = RunState::new(&plan);
    root.initialize(&mut state);
    while root.next(&mut state) != Step::Exhausted {}

    let loop_slot = plan.slot(plan.root()).children()[0];
    assert_eq!(state.get(loop_slot).iteration, 4);
    assert!(Controller::new(&plan, loop_slot).is_done(&state));
}

// ============================================================================
// Transaction Controller
// ============================================================================

#[test]
fn test_transaction_reports_end_after_children() {
    let mut tree = PlanTree::new("Plan");
    let tx = add(&mut tree, NodeId(0), "tx", Element::transaction(true));
    add(&mut tree, tx, "a", sampler());
    add(&mut tree, tx, "b", sampler());
    add(&mut tree, NodeId(0), "after", sampler());

    assert_eq!(drain(tree, 100), vec!["a", "b", "end:tx", "after"]);
}

#[test]
fn test_transaction_in_loop_ends_every_pass() {
    let mut tree = PlanTree::new("Plan");
    let l = add(&mut tree, NodeId(0), "loop", Element::loop_controller(2, false));
    let tx = add(&mut tree, l, "tx", Element::transaction(false));
    add(&mut tree, tx, "a", sampler());

    assert_eq!(drain(tree, 100), vec!["a", "end:tx", "a", "end:tx"]);
}

#[test]
fn test_empty_transaction_still_ends() {
    let mut tree = PlanTree::new("Plan");
    add(&mut tree, NodeId(0), "tx", Element::transaction(true));

    assert_eq!(drain(tree, 100), vec!["end:tx"]);
}

#[test]
fn test_empty_parent_transaction_in_loop_ends_every_pass() {
    let mut tree = PlanTree::new("Plan");
    let l = add(&mut tree, NodeId(0), "loop", Element::loop_controller(3, false));
    add(&mut tree, l, "tx", Element::transaction(true));

    assert_eq!(drain(tree, 100), vec!["end:tx", "end:tx", "end:tx"]);
}

#[test]
fn test_finite_loop_over_empty_non_parent_transaction_runs_every_pass() {
    let mut tree = PlanTree::new("Plan");
    let l = add(&mut tree, NodeId(0), "loop", Element::loop_controller(3, false));
    add(&mut tree, l, "tx", Element::transaction(false));
    let plan = TreeCompiler::compile(&Arc::new(tree)).unwrap();

    let root = Controller::root(&plan);
    let mut state = RunState::new(&plan);
    root.initialize(&mut state);

    let mut ends = 0;
    while let Step::TransactionEnd(_) = root.next(&mut state) {
        ends += 1;
    }

    let loop_slot = plan.slot(plan.root()).children()[0];
    assert_eq!(ends, 3);
    assert_eq!(state.get(loop_slot).iteration, 3);
    assert!(root.is_done(&state));
}

#[test]
fn test_empty_non_parent_transaction_does_not_keep_forever_loop_alive() {
    let mut tree = PlanTree::new("Plan");
    let l = add(&mut tree, NodeId(0), "loop", Element::loop_controller(1, true));
    add(&mut tree, l, "tx", Element::transaction(false));

    assert_eq!(drain(tree, 100), vec!["end:tx"]);
}

#[test]
fn test_transaction_opens_tracker_on_first_step() {
    let mut tree = PlanTree::new("Plan");
    let tx = add(&mut tree, NodeId(0), "tx", Element::transaction(true));
    add(&mut tree, tx, "a", sampler());
    let plan = TreeCompiler::compile(&Arc::new(tree)).unwrap();

    let root = Controller::root(&plan);
    let mut state = RunState::new(&plan);
    root.initialize(&mut state);
    let tx_slot = plan.slot(plan.root()).children()[0];
    assert!(state.open_transactions().is_empty());

    assert!(matches!(root.next(&mut state), Step::Sample(_)));
    assert_eq!(state.open_transactions(), vec![tx_slot]);

    assert_eq!(root.next(&mut state), Step::TransactionEnd(tx_slot));
    assert!(state.take_tracker(tx_slot).is_some());
    assert_eq!(root.next(&mut state), Step::Exhausted);
}

#[test]
fn test_nested_transactions_end_innermost_first() {
    let mut tree = PlanTree::new("Plan");
    let outer = add(&mut tree, NodeId(0), "outer", Element::transaction(true));
    let inner = add(&mut tree, outer, "inner", Element::transaction(true));
    add(&mut tree, inner, "a", sampler());
    add(&mut tree, outer, "b", sampler());

    assert_eq!(
        drain(tree, 100),
        vec!["a", "end:inner", "b", "end:outer"]
    );
}

// ============================================================================
// Run-state isolation
// ============================================================================

#[test]
fn test_run_states_are_independent() {
    let mut tree = PlanTree::new("Plan");
    let l = add(&mut tree, NodeId(0), "loop", Element::loop_controller(2, false));
    add(&mut tree, l, "a", sampler());
    let plan = TreeCompiler::compile(&Arc::new(tree)).unwrap();

    let root = Controller::root(&plan);
    let mut first = RunState::new(&plan);
    let mut second = RunState::new(&plan);
    root.initialize(&mut first);
    root.initialize(&mut second);

    while root.next(&mut first) != Step::Exhausted {}
    assert!(root.is_done(&first));
    assert!(!root.is_done(&second));
    assert!(matches!(root.next(&mut second), Step::Sample(_)));
}

#[test]
fn test_initialize_resets_subtree() {
    let mut tree = PlanTree::new("Plan");
    let l = add(&mut tree, NodeId(0), "loop", Element::loop_controller(1, false));
    add(&mut tree, l, "a", sampler());
    let plan = TreeCompiler::compile(&Arc::new(tree)).unwrap();

    let root = Controller::root(&plan);
    let mut state = RunState::new(&plan);
    root.initialize(&mut state);
    while root.next(&mut state) != Step::Exhausted {}

    root.initialize(&mut state);
    assert!(!root.is_done(&state));
    assert!(matches!(root.next(&mut state), Step::Sample(_)));
}

#[test]
fn test_controller_kind_serialization() {
    let kind = ControllerKind::Loop(LoopConfig {
        loops: 3,
        continue_forever: false,
    });
    let json = serde_json::to_string(&kind).unwrap();
    assert_eq!(json, r#"{"type":"loop","loops":3,"continue_forever":false}"#);

    let back: ControllerKind = serde_json::from_str(&json).unwrap();
    assert_eq!(back, kind);
}
