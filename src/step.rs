use crate::config::PluginConfig;
use crate::context::Context;
use crate::error::PluginError;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Type-safe step name wrapper.
///
/// Names a lifecycle step ("verifyConditions", "publish", ...) or a step
/// implementation.
///
/// # Examples
///
/// ```
/// use stepweave::StepName;
///
/// let name = StepName::new("analyzeCommits");
/// assert_eq!(name.as_str(), "analyzeCommits");
///
/// let name: StepName = "publish".into();
/// assert_eq!(name.to_string(), "publish");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepName(String);

impl StepName {
    /// Creates a new StepName
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates a StepName from a type's name (extracts last segment)
    pub fn from_type_name<T: ?Sized>() -> Self {
        let full_name = std::any::type_name::<T>();
        let short_name = full_name.split("::").last().unwrap_or("UnknownStep");
        Self::new(short_name)
    }

    /// Returns the step name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StepName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StepName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&StepName> for StepName {
    fn from(s: &StepName) -> Self {
        s.clone()
    }
}

impl AsRef<str> for StepName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for StepName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Outcome of running a step. `Ok(None)` is the "no step" sentinel an inert
/// slot resolves to.
pub type StepResult = Result<Option<Value>, PluginError>;

/// A step shared between definitions, adapters and decorators.
pub type SharedStep = Arc<dyn Step>;

/// A lifecycle step implementation.
///
/// Steps receive the plugin configuration (already merged with any inline
/// options of their definition) and the host context by value, so adapters
/// can forward them without holding borrows across await points.
///
/// # Examples
///
/// ```
/// use stepweave::prelude::*;
/// use async_trait::async_trait;
/// use serde_json::json;
///
/// #[derive(Debug)]
/// struct Verify;
///
/// #[async_trait]
/// impl Step for Verify {
///     async fn run(&self, config: PluginConfig, _ctx: Context) -> StepResult {
///         Ok(Some(json!(config.option("dryRun").is_some())))
///     }
/// }
///
/// assert_eq!(Verify.name(), StepName::new("Verify"));
/// ```
#[async_trait]
pub trait Step: Send + Sync + fmt::Debug {
    /// Runs the step.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(value))` - the step produced a result
    /// - `Ok(None)` - the step ran and produced nothing
    /// - `Err(error)` - the step failed; adapters never swallow this
    async fn run(&self, config: PluginConfig, ctx: Context) -> StepResult;

    /// Returns the step name.
    ///
    /// By default, uses the type name. Override to provide a custom name.
    fn name(&self) -> StepName {
        StepName::from_type_name::<Self>()
    }
}

/// A step backed by an async closure. Build one with [`step_fn`].
pub struct FnStep<F> {
    name: StepName,
    f: F,
}

impl<F> fmt::Debug for FnStep<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStep").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F, Fut> Step for FnStep<F>
where
    F: Fn(PluginConfig, Context) -> Fut + Send + Sync,
    Fut: Future<Output = StepResult> + Send + 'static,
{
    async fn run(&self, config: PluginConfig, ctx: Context) -> StepResult {
        (self.f)(config, ctx).await
    }

    fn name(&self) -> StepName {
        self.name.clone()
    }
}

/// Wraps an async closure as a [`SharedStep`].
///
/// ```
/// use stepweave::step_fn;
/// use serde_json::json;
///
/// let notify = step_fn("notify", |_config, _ctx| async { Ok(Some(json!("sent"))) });
/// assert_eq!(notify.name().as_str(), "notify");
/// ```
pub fn step_fn<F, Fut>(name: impl Into<StepName>, f: F) -> SharedStep
where
    F: Fn(PluginConfig, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StepResult> + Send + 'static,
{
    Arc::new(FnStep {
        name: name.into(),
        f,
    })
}
