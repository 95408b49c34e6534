//! Resolution of textual plugin references.

use crate::error::PluginError;
use crate::plugin::Plugin;
use crate::step::SharedStep;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// What a textual reference resolves to.
#[derive(Clone, Debug)]
pub enum Loaded {
    /// The reference names a single step implementation.
    Step(SharedStep),
    /// The reference names a plugin exposing several named steps.
    Plugin(Arc<dyn Plugin>),
}

impl Loaded {
    /// Returns the step to use when this value fills a definition slot of
    /// type `step_type`.
    ///
    /// A bare step is used as is; a plugin contributes its `step_type` step.
    pub fn step_for(&self, step_type: &str) -> Option<SharedStep> {
        match self {
            Loaded::Step(step) => Some(step.clone()),
            Loaded::Plugin(plugin) => plugin.step(step_type),
        }
    }

    /// Returns the named capability. A bare step exposes none.
    pub fn capability(&self, step_name: &str) -> Option<SharedStep> {
        match self {
            Loaded::Step(_) => None,
            Loaded::Plugin(plugin) => plugin.step(step_name),
        }
    }
}

impl From<SharedStep> for Loaded {
    fn from(step: SharedStep) -> Self {
        Loaded::Step(step)
    }
}

/// Host-provided capability that loads a plugin reference.
///
/// Failures propagate unchanged to whoever triggered the load; no retries.
#[async_trait]
pub trait PluginLoader: Send + Sync {
    async fn load(&self, reference: &str) -> Result<Loaded, PluginError>;
}

/// In-memory [`PluginLoader`] keyed by reference.
///
/// # Examples
///
/// ```
/// use stepweave::{step_fn, PluginLoader, PluginModule, PluginRegistry};
///
/// # #[tokio::main]
/// # async fn main() {
/// let registry = PluginRegistry::new()
///     .register_plugin("@release/npm", PluginModule::new("@release/npm"))
///     .register_step("./scripts/notify", step_fn("notify", |_, _| async { Ok(None) }));
///
/// assert!(registry.load("./scripts/notify").await.is_ok());
/// assert!(registry.load("@release/unknown").await.is_err());
/// # }
/// ```
#[derive(Clone, Default)]
pub struct PluginRegistry {
    entries: HashMap<String, Loaded>,
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("references", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin under `reference`.
    pub fn register_plugin<P: Plugin + 'static>(
        self,
        reference: impl Into<String>,
        plugin: P,
    ) -> Self {
        self.register(reference, Loaded::Plugin(Arc::new(plugin)))
    }

    /// Registers a single step under `reference`.
    pub fn register_step(self, reference: impl Into<String>, step: SharedStep) -> Self {
        self.register(reference, Loaded::Step(step))
    }

    pub fn register(mut self, reference: impl Into<String>, loaded: Loaded) -> Self {
        self.entries.insert(reference.into(), loaded);
        self
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.entries.contains_key(reference)
    }
}

#[async_trait]
impl PluginLoader for PluginRegistry {
    async fn load(&self, reference: &str) -> Result<Loaded, PluginError> {
        debug!("Loading plugin reference '{}'", reference);
        self.entries
            .get(reference)
            .cloned()
            .ok_or_else(|| PluginError::Unresolvable {
                reference: reference.to_string(),
                details: "no plugin registered under this reference".to_string(),
            })
    }
}
