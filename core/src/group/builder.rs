//! Builder pattern for ThreadGroup construction

use std::sync::Arc;

use crate::compiler::{CompiledPlan, TreeCompiler};
use crate::config::ThreadGroupConfig;
use crate::error::{PlanError, PlanResult};
use crate::notifier::ListenerNotifier;
use crate::plan::PlanTree;
use crate::traits::SampleListener;
use crate::variables::Variables;

use super::executor::ThreadGroup;

/// Builder for creating a ThreadGroup with validated configuration
///
/// # Example
///
/// ```ignore
/// let group = ThreadGroupBuilder::new()
///     .config(ThreadGroupConfig::new(10))
///     .tree(tree)
///     .listener(collector)
///     .build()?;
/// ```
pub struct ThreadGroupBuilder {
    config: ThreadGroupConfig,
    plan: Option<Arc<CompiledPlan>>,
    tree: Option<Arc<PlanTree>>,
    notifier: Option<Arc<ListenerNotifier>>,
    listeners: Vec<Arc<dyn SampleListener>>,
    variables: Variables,
    seed: Option<u64>,
}

impl ThreadGroupBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: ThreadGroupConfig::default(),
            plan: None,
            tree: None,
            notifier: None,
            listeners: Vec::new(),
            variables: Variables::new(),
            seed: None,
        }
    }

    /// Set the full group configuration
    pub fn config(mut self, config: ThreadGroupConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the number of threads
    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.config.num_threads = num_threads;
        self
    }

    /// Set an already compiled plan
    pub fn plan(mut self, plan: Arc<CompiledPlan>) -> Self {
        self.plan = Some(plan);
        self
    }

    /// Set a plan tree to compile during `build`
    pub fn tree(mut self, tree: Arc<PlanTree>) -> Self {
        self.tree = Some(tree);
        self
    }

    /// Share an existing notifier
    pub fn notifier(mut self, notifier: Arc<ListenerNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Register a listener receiving every event of the group
    pub fn listener(mut self, listener: Arc<dyn SampleListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Initial variables for every thread
    pub fn variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    /// Base seed for timer randomness (thread `i` uses `seed + i`)
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Build the thread group
    ///
    /// # Errors
    ///
    /// Returns an error if neither a plan nor a tree was given, if the tree
    /// is malformed, or if configuration validation fails.
    pub fn build(self) -> PlanResult<ThreadGroup> {
        self.config.validate()?;

        let plan = match (self.plan, self.tree) {
            (Some(plan), _) => plan,
            (None, Some(tree)) => Arc::new(TreeCompiler::compile(&tree)?),
            (None, None) => return Err(PlanError::missing_config("plan")),
        };

        let notifier = self
            .notifier
            .unwrap_or_else(|| Arc::new(ListenerNotifier::new()));
        for listener in self.listeners {
            notifier.register(listener);
        }

        let mut group = ThreadGroup::new(self.config, plan, notifier);
        group.variables = self.variables;
        group.seed = self.seed;
        Ok(group)
    }
}

impl Default for ThreadGroupBuilder {
    fn default() -> Self {
        Self::new()
    }
}
