//! Plan tree: the hierarchy of controllers, samplers and auxiliary elements
//!
//! Nodes live in an arena owned by [`PlanTree`] and are addressed by
//! [`NodeId`]. The tree is built before execution and never mutated once it
//! has been handed to the compiler (it is shared behind an `Arc`).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::controller::{ControllerKind, LoopConfig, TransactionConfig};
use crate::error::{PlanError, PlanResult};
use crate::timer::Timer;
use crate::traits::{Assertion, SampleListener, Sampler};

/// Stable identity of a node within its plan tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Typed value in a node's property bag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Boolean flag
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Text value
    Text(String),
}

impl PropertyValue {
    /// Text form, if this is a text property
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(v) => write!(f, "{v}"),
            PropertyValue::Int(v) => write!(f, "{v}"),
            PropertyValue::Float(v) => write!(f, "{v}"),
            PropertyValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

/// A set of variable defaults applied to the thread's variables before each
/// sample in scope. Keys already present in the thread scope are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigElement {
    /// Variable defaults
    pub variables: BTreeMap<String, String>,
}

impl ConfigElement {
    /// Create an empty config element
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable default
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }
}

/// The element carried by a plan node
#[derive(Clone)]
pub enum Element {
    /// Controller deciding traversal order over its children
    Controller(ControllerKind),
    /// Leaf unit of work
    Sampler(Arc<dyn Sampler>),
    /// Check applied to sample results in scope
    Assertion(Arc<dyn Assertion>),
    /// Observer of sample events in scope
    Listener(Arc<dyn SampleListener>),
    /// Variable defaults for samplers in scope
    Config(ConfigElement),
    /// Delay applied before samplers in scope
    Timer(Timer),
}

impl Element {
    /// Generic (run-once, in order) controller
    pub fn generic() -> Self {
        Element::Controller(ControllerKind::Generic)
    }

    /// Loop controller
    pub fn loop_controller(loops: u64, continue_forever: bool) -> Self {
        Element::Controller(ControllerKind::Loop(LoopConfig {
            loops,
            continue_forever,
        }))
    }

    /// Transaction controller
    pub fn transaction(generate_parent_sample: bool) -> Self {
        Element::Controller(ControllerKind::Transaction(TransactionConfig {
            generate_parent_sample,
        }))
    }

    /// Sampler element
    pub fn sampler(sampler: impl Sampler + 'static) -> Self {
        Element::Sampler(Arc::new(sampler))
    }

    /// Assertion element
    pub fn assertion(assertion: impl Assertion + 'static) -> Self {
        Element::Assertion(Arc::new(assertion))
    }

    /// Listener element sharing an existing listener handle
    pub fn listener(listener: Arc<dyn SampleListener>) -> Self {
        Element::Listener(listener)
    }

    /// Whether this element is a controller
    pub fn is_controller(&self) -> bool {
        matches!(self, Element::Controller(_))
    }

    /// Short name of the element kind, used in diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Element::Controller(ControllerKind::Generic) => "generic controller",
            Element::Controller(ControllerKind::Loop(_)) => "loop controller",
            Element::Controller(ControllerKind::Transaction(_)) => "transaction controller",
            Element::Sampler(_) => "sampler",
            Element::Assertion(_) => "assertion",
            Element::Listener(_) => "listener",
            Element::Config(_) => "config element",
            Element::Timer(_) => "timer",
        }
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Controller(kind) => f.debug_tuple("Controller").field(kind).finish(),
            Element::Config(config) => f.debug_tuple("Config").field(config).finish(),
            Element::Timer(timer) => f.debug_tuple("Timer").field(timer).finish(),
            other => f.write_str(other.kind_name()),
        }
    }
}

/// A node of the plan tree
#[derive(Debug, Clone)]
pub struct PlanNode {
    id: NodeId,
    name: String,
    enabled: bool,
    element: Element,
    children: Vec<NodeId>,
    properties: BTreeMap<String, PropertyValue>,
}

impl PlanNode {
    /// Node identity
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Node name (used as the sample label for samplers)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the node takes part in execution
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The element carried by this node
    pub fn element(&self) -> &Element {
        &self.element
    }

    /// Ordered child ids
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Property bag
    pub fn properties(&self) -> &BTreeMap<String, PropertyValue> {
        &self.properties
    }

    /// Look up a single property
    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }
}

/// Arena-backed plan tree with a single root controller
#[derive(Debug, Clone)]
pub struct PlanTree {
    nodes: Vec<PlanNode>,
    root: NodeId,
}

impl PlanTree {
    /// Create a tree whose root is a generic controller
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_root(name, Element::generic())
    }

    /// Create a tree with the given root element
    ///
    /// The compiler rejects a root that is not a controller.
    pub fn with_root(name: impl Into<String>, element: Element) -> Self {
        let root = PlanNode {
            id: NodeId(0),
            name: name.into(),
            enabled: true,
            element,
            children: Vec::new(),
            properties: BTreeMap::new(),
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    /// Root node id
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Append a new node under `parent`
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        element: Element,
    ) -> PlanResult<NodeId> {
        self.node(parent)?;
        let id = NodeId(self.nodes.len());
        self.nodes.push(PlanNode {
            id,
            name: name.into(),
            enabled: true,
            element,
            children: Vec::new(),
            properties: BTreeMap::new(),
        });
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    /// Attach an existing node (and its subtree) under another parent
    ///
    /// The same node may appear at several places in the tree. Linking a
    /// node beneath one of its own descendants creates a cycle, which the
    /// compiler reports as a malformed plan.
    pub fn link(&mut self, parent: NodeId, child: NodeId) -> PlanResult<()> {
        self.node(child)?;
        self.node_mut(parent)?.children.push(child);
        Ok(())
    }

    /// Enable or disable a node; disabled nodes are skipped with their subtree
    pub fn set_enabled(&mut self, id: NodeId, enabled: bool) -> PlanResult<()> {
        self.node_mut(id)?.enabled = enabled;
        Ok(())
    }

    /// Set a typed property on a node
    pub fn set_property(
        &mut self,
        id: NodeId,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> PlanResult<()> {
        self.node_mut(id)?
            .properties
            .insert(key.into(), value.into());
        Ok(())
    }

    /// Look up a node
    pub fn node(&self, id: NodeId) -> PlanResult<&PlanNode> {
        self.nodes.get(id.0).ok_or(PlanError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> PlanResult<&mut PlanNode> {
        self.nodes.get_mut(id.0).ok_or(PlanError::UnknownNode(id))
    }

    /// Number of nodes (including disabled ones)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree only contains its root
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tree_has_generic_root() {
        let tree = PlanTree::new("Test Plan");
        let root = tree.node(tree.root()).unwrap();
        assert_eq!(root.name(), "Test Plan");
        assert!(root.element().is_controller());
        assert!(tree.is_empty());
    }

    #[test]
    fn test_add_child_appends_in_order() {
        let mut tree = PlanTree::new("Test Plan");
        let a = tree.add_child(tree.root(), "A", Element::generic()).unwrap();
        let b = tree.add_child(tree.root(), "B", Element::generic()).unwrap();

        assert_eq!(tree.node(tree.root()).unwrap().children(), &[a, b]);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_add_child_unknown_parent() {
        let mut tree = PlanTree::new("Test Plan");
        let err = tree
            .add_child(NodeId(42), "orphan", Element::generic())
            .unwrap_err();
        assert!(matches!(err, PlanError::UnknownNode(NodeId(42))));
    }

    #[test]
    fn test_properties_and_enabled_flag() {
        let mut tree = PlanTree::new("Test Plan");
        let node = tree.add_child(tree.root(), "Loop", Element::loop_controller(2, false)).unwrap();
        tree.set_property(node, "comment", "warm-up").unwrap();
        tree.set_property(node, "weight", 3_i64).unwrap();
        tree.set_enabled(node, false).unwrap();

        let node = tree.node(node).unwrap();
        assert!(!node.is_enabled());
        assert_eq!(node.property("comment").and_then(|v| v.as_str()), Some("warm-up"));
        assert_eq!(node.property("weight"), Some(&PropertyValue::Int(3)));
    }

    #[test]
    fn test_link_reuses_node() {
        let mut tree = PlanTree::new("Test Plan");
        let a = tree.add_child(tree.root(), "A", Element::generic()).unwrap();
        let b = tree.add_child(tree.root(), "B", Element::generic()).unwrap();
        tree.link(b, a).unwrap();

        assert_eq!(tree.node(b).unwrap().children(), &[a]);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_element_kind_names() {
        assert_eq!(Element::generic().kind_name(), "generic controller");
        assert_eq!(Element::transaction(true).kind_name(), "transaction controller");
        assert_eq!(
            Element::Config(ConfigElement::new()).kind_name(),
            "config element"
        );
    }
}
