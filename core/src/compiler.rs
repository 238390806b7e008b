//! Tree compiler: turns a plan tree into a read-only compiled plan
//!
//! The compiled plan is an arena of [`Slot`]s, one per occurrence of an
//! enabled controller or sampler reachable from the root. A subtree linked
//! at two places in the plan therefore compiles to two independent slots,
//! each with the scope of the place it was reached from.
//!
//! Scope resolution for a sampler:
//! - assertions: those attached to every ancestor controller (outer to
//!   inner), then the sampler's own
//! - listeners, config elements, timers: those on every ancestor from the
//!   root down, then the sampler's own
//!
//! Compilation is deterministic and side-effect free. Compiling the same
//! tree twice yields structurally equal plans.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::controller::ControllerKind;
use crate::error::{PlanError, PlanResult};
use crate::plan::{ConfigElement, Element, NodeId, PlanNode, PlanTree, PropertyValue};
use crate::timer::Timer;
use crate::traits::{Assertion, SampleListener, Sampler};

/// Index of a slot in a compiled plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(pub usize);

/// Ordered listeners in scope of a slot
///
/// Equality compares node identities only.
#[derive(Clone, Default)]
pub struct ListenerScope {
    ids: Vec<NodeId>,
    handles: Vec<Arc<dyn SampleListener>>,
}

impl ListenerScope {
    /// Node ids of the listeners, in delivery order
    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }

    /// Listener handles, in delivery order
    pub fn handles(&self) -> &[Arc<dyn SampleListener>] {
        &self.handles
    }

    /// Number of listeners
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether no listener is in scope
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn push(&mut self, id: NodeId, handle: Arc<dyn SampleListener>) {
        self.ids.push(id);
        self.handles.push(handle);
    }
}

impl PartialEq for ListenerScope {
    fn eq(&self, other: &Self) -> bool {
        self.ids == other.ids
    }
}

impl fmt::Debug for ListenerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.ids).finish()
    }
}

/// An assertion resolved into a sampler's scope
#[derive(Clone)]
pub struct ScopedAssertion {
    /// Node carrying the assertion
    pub node: NodeId,
    /// Node name, used to label assertion results
    pub name: String,
    /// The assertion itself
    pub assertion: Arc<dyn Assertion>,
}

impl PartialEq for ScopedAssertion {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node && self.name == other.name
    }
}

impl fmt::Debug for ScopedAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedAssertion")
            .field("node", &self.node)
            .field("name", &self.name)
            .finish()
    }
}

/// Everything a thread engine needs to execute one sampler occurrence
#[derive(Clone)]
pub struct SamplerScope {
    sampler: Arc<dyn Sampler>,
    properties: BTreeMap<String, PropertyValue>,
    assertions: Vec<ScopedAssertion>,
    configs: Vec<ConfigElement>,
    timers: Vec<Timer>,
}

impl SamplerScope {
    /// The sampler
    pub fn sampler(&self) -> &Arc<dyn Sampler> {
        &self.sampler
    }

    /// Property bag of the sampler node
    pub fn properties(&self) -> &BTreeMap<String, PropertyValue> {
        &self.properties
    }

    /// Assertions in evaluation order
    pub fn assertions(&self) -> &[ScopedAssertion] {
        &self.assertions
    }

    /// Config elements, outermost first
    pub fn configs(&self) -> &[ConfigElement] {
        &self.configs
    }

    /// Timers, outermost first
    pub fn timers(&self) -> &[Timer] {
        &self.timers
    }
}

impl PartialEq for SamplerScope {
    fn eq(&self, other: &Self) -> bool {
        self.properties == other.properties
            && self.assertions == other.assertions
            && self.configs == other.configs
            && self.timers == other.timers
    }
}

impl fmt::Debug for SamplerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SamplerScope")
            .field("assertions", &self.assertions)
            .field("configs", &self.configs)
            .field("timers", &self.timers)
            .finish_non_exhaustive()
    }
}

/// What a slot executes
#[derive(Debug, Clone, PartialEq)]
pub enum SlotKind {
    /// A controller and its executable children
    Controller {
        /// Controller variant
        kind: ControllerKind,
        /// Child slots in plan order
        children: Vec<SlotId>,
    },
    /// A sampler with its resolved scope
    Sampler(SamplerScope),
}

/// One occurrence of a controller or sampler in the compiled plan
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    node: NodeId,
    name: String,
    path: Arc<[String]>,
    listeners: ListenerScope,
    transactions: Vec<SlotId>,
    kind: SlotKind,
}

impl Slot {
    /// Plan node this slot was compiled from
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Node name (sample label for samplers and transactions)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names from the plan root down to this slot
    pub fn path(&self) -> &Arc<[String]> {
        &self.path
    }

    /// Listeners receiving outcomes produced at this slot
    ///
    /// For a transaction this is where its aggregate is delivered.
    pub fn listeners(&self) -> &ListenerScope {
        &self.listeners
    }

    /// Enclosing transaction slots, outermost first (never includes self)
    pub fn transactions(&self) -> &[SlotId] {
        &self.transactions
    }

    /// What this slot executes
    pub fn kind(&self) -> &SlotKind {
        &self.kind
    }

    /// Controller variant, if this is a controller slot
    pub fn controller_kind(&self) -> Option<&ControllerKind> {
        match &self.kind {
            SlotKind::Controller { kind, .. } => Some(kind),
            SlotKind::Sampler(_) => None,
        }
    }

    /// Child slots (empty for samplers)
    pub fn children(&self) -> &[SlotId] {
        match &self.kind {
            SlotKind::Controller { children, .. } => children,
            SlotKind::Sampler(_) => &[],
        }
    }

    /// Sampler scope, if this is a sampler slot
    pub fn sampler_scope(&self) -> Option<&SamplerScope> {
        match &self.kind {
            SlotKind::Sampler(scope) => Some(scope),
            SlotKind::Controller { .. } => None,
        }
    }
}

/// Read-only runnable form of a plan tree, shared by all virtual users
#[derive(Debug, Clone)]
pub struct CompiledPlan {
    tree: Arc<PlanTree>,
    root: SlotId,
    slots: Vec<Slot>,
    listeners: ListenerScope,
    sampler_count: usize,
}

impl CompiledPlan {
    /// The plan tree this plan was compiled from
    pub fn tree(&self) -> &Arc<PlanTree> {
        &self.tree
    }

    /// Root controller slot
    pub fn root(&self) -> SlotId {
        self.root
    }

    /// Look up a slot
    ///
    /// Slot ids are only produced by this plan, so an out-of-range id is a
    /// programming error and panics.
    pub fn slot(&self, id: SlotId) -> &Slot {
        &self.slots[id.0]
    }

    /// All slots
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the plan has no slots (never true for a compiled plan)
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Every distinct listener of the plan, in first-seen order
    pub fn listeners(&self) -> &ListenerScope {
        &self.listeners
    }

    /// Number of sampler occurrences
    pub fn sampler_count(&self) -> usize {
        self.sampler_count
    }
}

impl PartialEq for CompiledPlan {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
            && self.slots == other.slots
            && self.listeners == other.listeners
    }
}

/// Scope inherited from the ancestors of the node being compiled
#[derive(Clone, Default)]
struct Inherited {
    path: Vec<String>,
    assertions: Vec<ScopedAssertion>,
    listeners: ListenerScope,
    configs: Vec<ConfigElement>,
    timers: Vec<Timer>,
    transactions: Vec<SlotId>,
}

/// Auxiliary elements attached directly to one node
#[derive(Default)]
struct Attached {
    assertions: Vec<ScopedAssertion>,
    listeners: Vec<(NodeId, Arc<dyn SampleListener>)>,
    configs: Vec<ConfigElement>,
    timers: Vec<Timer>,
    executable: Vec<NodeId>,
}

/// Compiles plan trees
#[derive(Debug, Default)]
pub struct TreeCompiler;

impl TreeCompiler {
    /// Compile a plan tree
    ///
    /// # Errors
    /// Returns [`PlanError::Malformed`] when the tree breaks a structural
    /// rule. No partial plan is produced.
    pub fn compile(tree: &Arc<PlanTree>) -> PlanResult<CompiledPlan> {
        let mut state = CompileState {
            tree: tree.as_ref(),
            slots: Vec::new(),
            on_path: HashSet::new(),
            sampler_count: 0,
        };

        let root_node = tree.node(tree.root())?;
        if !root_node.is_enabled() {
            return Err(PlanError::malformed(format!(
                "root '{}' is disabled",
                root_node.name()
            )));
        }
        if !root_node.element().is_controller() {
            return Err(PlanError::malformed(format!(
                "root '{}' is a {}, not a controller",
                root_node.name(),
                root_node.element().kind_name()
            )));
        }

        let root = state.compile_controller(root_node, &Inherited::default())?;

        let mut listeners = ListenerScope::default();
        for slot in &state.slots {
            for (id, handle) in slot.listeners.ids.iter().zip(&slot.listeners.handles) {
                if !listeners.ids.contains(id) {
                    listeners.push(*id, Arc::clone(handle));
                }
            }
        }

        debug!(
            slots = state.slots.len(),
            samplers = state.sampler_count,
            listeners = listeners.len(),
            "Compiled plan"
        );

        Ok(CompiledPlan {
            tree: Arc::clone(tree),
            root,
            slots: state.slots,
            listeners,
            sampler_count: state.sampler_count,
        })
    }
}

struct CompileState<'t> {
    tree: &'t PlanTree,
    slots: Vec<Slot>,
    on_path: HashSet<NodeId>,
    sampler_count: usize,
}

impl<'t> CompileState<'t> {
    fn compile_controller(&mut self, node: &PlanNode, inherited: &Inherited) -> PlanResult<SlotId> {
        let kind = match node.element() {
            Element::Controller(kind) => *kind,
            other => {
                return Err(PlanError::malformed(format!(
                    "'{}' is a {}, expected a controller",
                    node.name(),
                    other.kind_name()
                )))
            }
        };

        if !self.on_path.insert(node.id()) {
            return Err(PlanError::malformed(format!(
                "cycle detected: '{}' ({}) is its own ancestor",
                node.name(),
                node.id()
            )));
        }

        let attached = self.collect_attached(node, false)?;
        let scope = self.extend(inherited, node, &attached);

        // Reserve the slot so children can refer to an enclosing transaction
        let id = SlotId(self.slots.len());
        self.slots.push(Slot {
            node: node.id(),
            name: node.name().to_string(),
            path: Arc::from(scope.path.clone()),
            listeners: scope.listeners.clone(),
            transactions: inherited.transactions.clone(),
            kind: SlotKind::Controller {
                kind,
                children: Vec::new(),
            },
        });

        let mut child_scope = scope;
        if matches!(kind, ControllerKind::Transaction(_)) {
            child_scope.transactions.push(id);
        }

        let samplers_before = self.sampler_count;
        let mut children = Vec::with_capacity(attached.executable.len());
        for child_id in &attached.executable {
            let child = self.tree.node(*child_id)?;
            let slot = if child.element().is_controller() {
                self.compile_controller(child, &child_scope)?
            } else {
                self.compile_sampler(child, &child_scope)?
            };
            children.push(slot);
        }

        if !attached.assertions.is_empty() && self.sampler_count == samplers_before {
            return Err(PlanError::malformed(format!(
                "assertion '{}' under '{}' applies to no sampler",
                attached.assertions[0].name,
                node.name()
            )));
        }

        if let SlotKind::Controller {
            children: ref mut slot_children,
            ..
        } = self.slots[id.0].kind
        {
            *slot_children = children;
        }

        self.on_path.remove(&node.id());
        Ok(id)
    }

    fn compile_sampler(&mut self, node: &PlanNode, inherited: &Inherited) -> PlanResult<SlotId> {
        let sampler = match node.element() {
            Element::Sampler(sampler) => Arc::clone(sampler),
            other => {
                return Err(PlanError::malformed(format!(
                    "'{}' is a {}, expected a sampler",
                    node.name(),
                    other.kind_name()
                )))
            }
        };

        let attached = self.collect_attached(node, true)?;
        let scope = self.extend(inherited, node, &attached);

        let id = SlotId(self.slots.len());
        self.slots.push(Slot {
            node: node.id(),
            name: node.name().to_string(),
            path: Arc::from(scope.path),
            listeners: scope.listeners,
            transactions: scope.transactions,
            kind: SlotKind::Sampler(SamplerScope {
                sampler,
                properties: node.properties().clone(),
                assertions: scope.assertions,
                configs: scope.configs,
                timers: scope.timers,
            }),
        });
        self.sampler_count += 1;
        Ok(id)
    }

    /// Sort the enabled direct children of `node` into auxiliary elements
    /// and executable children, checking placement rules on the way.
    fn collect_attached(&self, node: &PlanNode, is_sampler: bool) -> PlanResult<Attached> {
        let mut attached = Attached::default();

        for child_id in node.children() {
            let child = self.tree.node(*child_id)?;
            if !child.is_enabled() {
                continue;
            }

            match child.element() {
                Element::Controller(_) | Element::Sampler(_) => {
                    if is_sampler {
                        return Err(PlanError::malformed(format!(
                            "{} '{}' placed beneath sampler '{}'",
                            child.element().kind_name(),
                            child.name(),
                            node.name()
                        )));
                    }
                    attached.executable.push(child.id());
                    continue;
                }
                _ => {}
            }

            if let Some(grandchild) = first_enabled_child(self.tree, child)? {
                return Err(PlanError::malformed(format!(
                    "{} '{}' cannot have children (found '{}')",
                    child.element().kind_name(),
                    child.name(),
                    grandchild
                )));
            }

            match child.element() {
                Element::Assertion(assertion) => attached.assertions.push(ScopedAssertion {
                    node: child.id(),
                    name: child.name().to_string(),
                    assertion: Arc::clone(assertion),
                }),
                Element::Listener(listener) => {
                    attached.listeners.push((child.id(), Arc::clone(listener)))
                }
                Element::Config(config) => attached.configs.push(config.clone()),
                Element::Timer(timer) => attached.timers.push(*timer),
                Element::Controller(_) | Element::Sampler(_) => {}
            }
        }

        Ok(attached)
    }

    fn extend(&self, inherited: &Inherited, node: &PlanNode, attached: &Attached) -> Inherited {
        let mut scope = inherited.clone();
        scope.path.push(node.name().to_string());
        scope.assertions.extend(attached.assertions.iter().cloned());
        for (id, listener) in &attached.listeners {
            scope.listeners.push(*id, Arc::clone(listener));
        }
        scope.configs.extend(attached.configs.iter().cloned());
        scope.timers.extend(attached.timers.iter().copied());
        scope
    }
}

fn first_enabled_child(tree: &PlanTree, node: &PlanNode) -> PlanResult<Option<String>> {
    for id in node.children() {
        let child = tree.node(*id)?;
        if child.is_enabled() {
            return Ok(Some(child.name().to_string()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CountingSampler, RecordingListener, StaticAssertion};

    fn sampler() -> Element {
        Element::sampler(CountingSampler::new())
    }

    #[test]
    fn test_compile_single_sampler() {
        let mut tree = PlanTree::new("Plan");
        let s = tree.add_child(tree.root(), "home", sampler()).unwrap();
        let plan = TreeCompiler::compile(&Arc::new(tree)).unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan.sampler_count(), 1);
        let root = plan.slot(plan.root());
        assert_eq!(root.children().len(), 1);

        let slot = plan.slot(root.children()[0]);
        assert_eq!(slot.node(), s);
        assert_eq!(slot.name(), "home");
        assert_eq!(&slot.path()[..], &["Plan".to_string(), "home".to_string()]);
        assert!(slot.sampler_scope().is_some());
    }

    #[test]
    fn test_root_must_be_controller() {
        let tree = PlanTree::with_root("Lonely", sampler());
        let err = TreeCompiler::compile(&Arc::new(tree)).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_disabled_root_is_rejected() {
        let mut tree = PlanTree::new("Plan");
        tree.set_enabled(tree.root(), false).unwrap();
        assert!(TreeCompiler::compile(&Arc::new(tree)).unwrap_err().is_malformed());
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut tree = PlanTree::new("Plan");
        let a = tree.add_child(tree.root(), "A", Element::generic()).unwrap();
        let b = tree.add_child(a, "B", Element::generic()).unwrap();
        tree.add_child(b, "s", sampler()).unwrap();
        tree.link(b, a).unwrap();

        let err = TreeCompiler::compile(&Arc::new(tree)).unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_controller_under_sampler_is_rejected() {
        let mut tree = PlanTree::new("Plan");
        let s = tree.add_child(tree.root(), "s", sampler()).unwrap();
        tree.add_child(s, "inner", Element::generic()).unwrap();

        let err = TreeCompiler::compile(&Arc::new(tree)).unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("beneath sampler"));
    }

    #[test]
    fn test_sampler_under_sampler_is_rejected() {
        let mut tree = PlanTree::new("Plan");
        let s = tree.add_child(tree.root(), "s", sampler()).unwrap();
        tree.add_child(s, "t", sampler()).unwrap();

        assert!(TreeCompiler::compile(&Arc::new(tree)).unwrap_err().is_malformed());
    }

    #[test]
    fn test_child_under_listener_is_rejected() {
        let mut tree = PlanTree::new("Plan");
        tree.add_child(tree.root(), "s", sampler()).unwrap();
        let l = tree
            .add_child(tree.root(), "listener", Element::listener(RecordingListener::shared()))
            .unwrap();
        tree.add_child(l, "timer", Element::Timer(Timer::Constant { delay_ms: 1 }))
            .unwrap();

        assert!(TreeCompiler::compile(&Arc::new(tree)).unwrap_err().is_malformed());
    }

    #[test]
    fn test_assertion_without_sampler_is_rejected() {
        let mut tree = PlanTree::new("Plan");
        let g = tree.add_child(tree.root(), "empty", Element::generic()).unwrap();
        tree.add_child(g, "check", Element::assertion(StaticAssertion::passing()))
            .unwrap();

        let err = TreeCompiler::compile(&Arc::new(tree)).unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("check"));
    }

    #[test]
    fn test_assertion_with_only_disabled_sampler_is_rejected() {
        let mut tree = PlanTree::new("Plan");
        let s = tree.add_child(tree.root(), "s", sampler()).unwrap();
        tree.add_child(tree.root(), "check", Element::assertion(StaticAssertion::passing()))
            .unwrap();
        tree.set_enabled(s, false).unwrap();

        assert!(TreeCompiler::compile(&Arc::new(tree)).unwrap_err().is_malformed());
    }

    #[test]
    fn test_disabled_nodes_are_skipped() {
        let mut tree = PlanTree::new("Plan");
        let g = tree.add_child(tree.root(), "off", Element::generic()).unwrap();
        tree.add_child(g, "hidden", sampler()).unwrap();
        tree.add_child(tree.root(), "visible", sampler()).unwrap();
        tree.set_enabled(g, false).unwrap();

        let plan = TreeCompiler::compile(&Arc::new(tree)).unwrap();
        assert_eq!(plan.sampler_count(), 1);
        let root = plan.slot(plan.root());
        assert_eq!(plan.slot(root.children()[0]).name(), "visible");
    }

    #[test]
    fn test_scope_resolution_order() {
        let mut tree = PlanTree::new("Plan");
        let outer_listener = tree
            .add_child(tree.root(), "outer-l", Element::listener(RecordingListener::shared()))
            .unwrap();
        let outer_assert = tree
            .add_child(tree.root(), "outer-a", Element::assertion(StaticAssertion::passing()))
            .unwrap();
        tree.add_child(
            tree.root(),
            "outer-t",
            Element::Timer(Timer::Constant { delay_ms: 1 }),
        )
        .unwrap();

        let group = tree.add_child(tree.root(), "group", Element::generic()).unwrap();
        let inner_assert = tree
            .add_child(group, "inner-a", Element::assertion(StaticAssertion::passing()))
            .unwrap();
        let s = tree.add_child(group, "s", sampler()).unwrap();
        let own_assert = tree
            .add_child(s, "own-a", Element::assertion(StaticAssertion::passing()))
            .unwrap();
        let own_listener = tree
            .add_child(s, "own-l", Element::listener(RecordingListener::shared()))
            .unwrap();
        tree.add_child(s, "own-t", Element::Timer(Timer::Constant { delay_ms: 2 }))
            .unwrap();
        tree.add_child(
            s,
            "own-c",
            Element::Config(ConfigElement::new().with_variable("k", "v")),
        )
        .unwrap();

        let plan = TreeCompiler::compile(&Arc::new(tree)).unwrap();
        let slot = plan
            .slots()
            .iter()
            .find(|slot| slot.node() == s)
            .unwrap();
        let scope = slot.sampler_scope().unwrap();

        let assertion_ids: Vec<_> = scope.assertions().iter().map(|a| a.node).collect();
        assert_eq!(assertion_ids, vec![outer_assert, inner_assert, own_assert]);
        assert_eq!(slot.listeners().ids(), &[outer_listener, own_listener]);
        assert_eq!(
            scope.timers(),
            &[
                Timer::Constant { delay_ms: 1 },
                Timer::Constant { delay_ms: 2 }
            ]
        );
        assert_eq!(scope.configs().len(), 1);
        assert_eq!(plan.listeners().ids(), &[outer_listener, own_listener]);
    }

    #[test]
    fn test_linked_subtree_compiles_per_occurrence() {
        let mut tree = PlanTree::new("Plan");
        let shared = tree.add_child(tree.root(), "shared", Element::generic()).unwrap();
        tree.add_child(shared, "s", sampler()).unwrap();
        let tx = tree
            .add_child(tree.root(), "tx", Element::transaction(true))
            .unwrap();
        tree.link(tx, shared).unwrap();

        let plan = TreeCompiler::compile(&Arc::new(tree)).unwrap();
        assert_eq!(plan.sampler_count(), 2);

        let occurrences: Vec<_> = plan
            .slots()
            .iter()
            .filter(|slot| slot.name() == "s")
            .collect();
        assert_eq!(occurrences.len(), 2);
        assert!(occurrences[0].transactions().is_empty());
        assert_eq!(occurrences[1].transactions().len(), 1);
        assert_eq!(occurrences[1].path().len(), 4);
    }

    #[test]
    fn test_transaction_slots_are_recorded_outermost_first() {
        let mut tree = PlanTree::new("Plan");
        let outer = tree
            .add_child(tree.root(), "outer", Element::transaction(false))
            .unwrap();
        let inner = tree.add_child(outer, "inner", Element::transaction(true)).unwrap();
        tree.add_child(inner, "s", sampler()).unwrap();

        let plan = TreeCompiler::compile(&Arc::new(tree)).unwrap();
        let sampler_slot = plan.slots().iter().find(|s| s.name() == "s").unwrap();
        let names: Vec<_> = sampler_slot
            .transactions()
            .iter()
            .map(|id| plan.slot(*id).name())
            .collect();
        assert_eq!(names, vec!["outer", "inner"]);

        let inner_slot = plan.slots().iter().find(|s| s.name() == "inner").unwrap();
        assert_eq!(inner_slot.transactions().len(), 1);
    }

    #[test]
    fn test_compile_is_idempotent() {
        let mut tree = PlanTree::new("Plan");
        let l = tree.add_child(tree.root(), "loop", Element::loop_controller(3, false)).unwrap();
        let t = tree.add_child(l, "tx", Element::transaction(true)).unwrap();
        tree.add_child(t, "a", sampler()).unwrap();
        tree.add_child(t, "b", sampler()).unwrap();
        tree.add_child(t, "l", Element::listener(RecordingListener::shared()))
            .unwrap();

        let tree = Arc::new(tree);
        let first = TreeCompiler::compile(&tree).unwrap();
        let second = TreeCompiler::compile(&tree).unwrap();
        assert_eq!(first, second);
    }
}
