//! # Stepweave
//!
//! Weave nested plugin definitions into the positional step lists of a
//! plugin-based release tool.
//!
//! A host runs each lifecycle stage ("verifyConditions", "publish", ...) by
//! calling the steps of its configured plugins one position at a time.
//! Stepweave produces those step lists: it resolves definitions written
//! inside the host's configuration (references, inline steps, option
//! objects or sequences of them) and wraps, appends to or aggregates the
//! resulting steps.
//!
//! ## Features
//!
//! - **Definition resolution**: [`resolve_definitions`] turns any definition
//!   shape into ordered, position-tagged steps
//! - **Decoration**: [`Weaver::wrap_plugin`] and [`Weaver::wrap_multi_plugin`]
//!   wrap configured steps, falling back to defaults per position
//! - **Appending**: [`Weaver::append_multi_plugin`] runs an extra step right
//!   after the last configured one
//! - **Aggregation**: [`Weaver::append_step`] collects every host plugin's
//!   result for a stage and hands them to a final step
//! - **Async first**: steps are `async-trait` objects; errors are structured
//!   with `thiserror`
//!
//! ## Quick Start
//!
//! ```rust
//! use stepweave::prelude::*;
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), PluginError> {
//! let registry = PluginRegistry::new().register_plugin(
//!     "@release/commit-analyzer",
//!     PluginModule::new("@release/commit-analyzer").with_step(
//!         "analyzeCommits",
//!         step_fn("analyze", |_, _| async { Ok(Some(json!("minor"))) }),
//!     ),
//! );
//! let weaver = Weaver::new(registry);
//!
//! let analyze = weaver.wrap_plugin("monorepo", "analyzeCommits", |step| step, None, 0);
//! let config = PluginConfig::from_value(json!({
//!     "monorepo": { "analyzeCommits": "@release/commit-analyzer" }
//! }))?;
//!
//! assert_eq!(analyze.run(config, Context::new()).await?, Some(json!("minor")));
//! # Ok(())
//! # }
//! ```
//!
//! ## Aggregating Results
//!
//! ```rust
//! use stepweave::prelude::*;
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), PluginError> {
//! let registry = PluginRegistry::new().register_plugin(
//!     "@release/npm",
//!     PluginModule::new("@release/npm").with_step(
//!         "verifyConditions",
//!         step_fn("npm-verify", |_, _| async { Ok(Some(json!("npm ok"))) }),
//!     ),
//! );
//! let summary = step_fn("summary", |_, ctx: Context| async move {
//!     Ok(Some(json!(ctx.step_results().len())))
//! });
//!
//! let verify = Weaver::new(registry).append_step("verifyConditions", summary, None);
//! let ctx = Context::new().with_options(HostOptions::new().with_plugin("@release/npm"));
//!
//! let results = verify.run_all(&PluginConfig::new(), &ctx).await?;
//! assert_eq!(results[0], Some(json!("npm ok")));
//! assert_eq!(results[1], Some(json!(1)));
//! # Ok(())
//! # }
//! ```

mod config;
mod context;
mod definition;
mod error;
mod loader;
mod plugin;
mod step;
mod weaver;

pub mod prelude;

pub use config::{Options, PluginConfig, WeaverConfig, DEFAULT_SLOTS};
pub use context::{Context, HostOptions, Logger, PluginEntry, TracingLogger};
pub use definition::{resolve_definition, resolve_definitions, PluginDefinition, ResolvedStep};
pub use error::PluginError;
pub use loader::{Loaded, PluginLoader, PluginRegistry};
pub use plugin::{Plugin, PluginModule};
pub use step::{step_fn, FnStep, SharedStep, Step, StepName, StepResult};
pub use weaver::{Decorator, StageSteps, Weaver};
