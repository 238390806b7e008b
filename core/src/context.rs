//! Explicit per-sample context handed to samplers and assertions

use std::collections::BTreeMap;

use crate::plan::PropertyValue;
use crate::result::{SampleResult, ThreadInfo};
use crate::variables::Variables;

/// Everything a sampler may see while it runs
///
/// Built by the thread engine for each sample. The variable scope is the
/// calling thread's own; no state is shared through the context.
#[derive(Debug)]
pub struct SampleContext<'a> {
    label: &'a str,
    thread: &'a ThreadInfo,
    variables: &'a mut Variables,
    properties: &'a BTreeMap<String, PropertyValue>,
    previous: Option<&'a SampleResult>,
}

impl<'a> SampleContext<'a> {
    /// Create a context
    pub fn new(
        label: &'a str,
        thread: &'a ThreadInfo,
        variables: &'a mut Variables,
        properties: &'a BTreeMap<String, PropertyValue>,
    ) -> Self {
        Self {
            label,
            thread,
            variables,
            properties,
            previous: None,
        }
    }

    /// Attach the previous result produced by this thread
    pub fn with_previous(mut self, previous: Option<&'a SampleResult>) -> Self {
        self.previous = previous;
        self
    }

    /// Label of the sampler node
    pub fn label(&self) -> &str {
        self.label
    }

    /// Identity of the running virtual user
    pub fn thread(&self) -> &ThreadInfo {
        self.thread
    }

    /// Thread-local variables
    pub fn variables(&self) -> &Variables {
        self.variables
    }

    /// Thread-local variables, writable
    pub fn variables_mut(&mut self) -> &mut Variables {
        self.variables
    }

    /// Property bag of the sampler node
    pub fn properties(&self) -> &BTreeMap<String, PropertyValue> {
        self.properties
    }

    /// Single property of the sampler node
    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Previous result produced by this thread, if any
    pub fn previous(&self) -> Option<&SampleResult> {
        self.previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_exposes_thread_state() {
        let thread = ThreadInfo::new("Users", 1);
        let mut variables = Variables::new();
        variables.put("user", "alice");
        let mut properties = BTreeMap::new();
        properties.insert("path".to_string(), PropertyValue::from("/login"));

        let previous = SampleResult::success("home", "200", "OK");
        let mut ctx = SampleContext::new("login", &thread, &mut variables, &properties)
            .with_previous(Some(&previous));

        assert_eq!(ctx.label(), "login");
        assert_eq!(ctx.thread().name, "Users 1");
        assert_eq!(ctx.variables().get("user"), Some("alice"));
        assert_eq!(ctx.property("path").and_then(|p| p.as_str()), Some("/login"));
        assert_eq!(ctx.previous().map(|p| p.label.as_str()), Some("home"));

        ctx.variables_mut().put("token", "abc");
        drop(ctx);
        assert_eq!(variables.get("token"), Some("abc"));
    }
}
