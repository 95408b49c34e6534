//! Commonly used types and traits

pub use crate::config::PluginConfig;
pub use crate::context::{Context, HostOptions};
pub use crate::definition::PluginDefinition;
pub use crate::error::PluginError;
pub use crate::loader::{PluginLoader, PluginRegistry};
pub use crate::plugin::{Plugin, PluginModule};
pub use crate::step::{step_fn, SharedStep, Step, StepName, StepResult};
pub use crate::weaver::Weaver;
