//! Plugins exposing named lifecycle steps.

use crate::step::{SharedStep, StepName};
use std::collections::BTreeMap;
use std::fmt;

/// A loaded plugin: a set of lifecycle steps looked up by name.
///
/// Lookups return `None` for steps the plugin does not implement; callers
/// treat that as "no step here", never as an error.
pub trait Plugin: Send + Sync + fmt::Debug {
    /// Returns the step implementing `step_name`, if any.
    fn step(&self, step_name: &str) -> Option<SharedStep>;

    /// Returns `true` if the plugin implements `step_name`.
    fn has_step(&self, step_name: &str) -> bool {
        self.step(step_name).is_some()
    }
}

/// A plugin assembled from named steps.
///
/// # Examples
///
/// ```
/// use stepweave::{step_fn, Plugin, PluginModule};
///
/// let plugin = PluginModule::new("@release/npm")
///     .with_step("verifyConditions", step_fn("npm-verify", |_, _| async { Ok(None) }))
///     .with_step("publish", step_fn("npm-publish", |_, _| async { Ok(None) }));
///
/// assert!(plugin.has_step("publish"));
/// assert!(!plugin.has_step("analyzeCommits"));
/// ```
#[derive(Clone)]
pub struct PluginModule {
    name: String,
    steps: BTreeMap<StepName, SharedStep>,
}

impl fmt::Debug for PluginModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginModule")
            .field("name", &self.name)
            .field("steps", &self.steps.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PluginModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: BTreeMap::new(),
        }
    }

    /// Adds the implementation of a lifecycle step, replacing any previous one.
    pub fn with_step(mut self, step_name: impl Into<StepName>, step: SharedStep) -> Self {
        self.steps.insert(step_name.into(), step);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the implemented lifecycle step names in sorted order.
    pub fn step_names(&self) -> impl Iterator<Item = &StepName> {
        self.steps.keys()
    }
}

impl Plugin for PluginModule {
    fn step(&self, step_name: &str) -> Option<SharedStep> {
        self.steps.get(step_name).cloned()
    }
}
