//! Positional adapters over resolved plugin steps.
//!
//! Every composer returns [`StageSteps`]: a fixed number of steps (see
//! [`WeaverConfig`]) that a host installs as the plugin list of one
//! lifecycle stage and invokes by position.

use crate::config::{Options, PluginConfig, WeaverConfig};
use crate::context::Context;
use crate::definition::{resolve_definition, resolve_definitions, PluginDefinition, ResolvedStep};
use crate::error::PluginError;
use crate::loader::PluginLoader;
use crate::step::{SharedStep, Step, StepName, StepResult};
use async_trait::async_trait;
use futures::future::{try_join_all, BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Turns a resolved step into the step that actually runs.
pub type Decorator = Arc<dyn Fn(SharedStep) -> SharedStep + Send + Sync>;

/// The fixed-length adapter sequence handed to the host.
#[derive(Clone, Debug)]
pub struct StageSteps {
    steps: Vec<SharedStep>,
}

impl StageSteps {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&SharedStep> {
        self.steps.get(position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SharedStep> {
        self.steps.iter()
    }

    pub fn into_vec(self) -> Vec<SharedStep> {
        self.steps
    }

    /// Runs every position in ascending order, awaiting each before the next.
    ///
    /// This is the invocation order hosts must follow; the accumulating
    /// runner relies on it.
    pub async fn run_all(
        &self,
        config: &PluginConfig,
        ctx: &Context,
    ) -> Result<Vec<Option<Value>>, PluginError> {
        let mut results = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            results.push(step.run(config.clone(), ctx.clone()).await?);
        }
        Ok(results)
    }
}

impl std::ops::Index<usize> for StageSteps {
    type Output = SharedStep;

    fn index(&self, position: usize) -> &SharedStep {
        &self.steps[position]
    }
}

impl<'a> IntoIterator for &'a StageSteps {
    type Item = &'a SharedStep;
    type IntoIter = std::slice::Iter<'a, SharedStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

/// Builds positional adapters for a host's lifecycle stages.
///
/// # Examples
///
/// ```
/// use stepweave::prelude::*;
/// use serde_json::json;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), PluginError> {
/// let registry = PluginRegistry::new()
///     .register_step("./publish", step_fn("publish", |_, _| async {
///         Ok(Some(json!("published")))
///     }));
/// let weaver = Weaver::new(registry);
///
/// let publish = weaver.wrap_multi_plugin("monorepo", "publish", |step| step, vec![]);
/// assert_eq!(publish.len(), 10);
///
/// let config = PluginConfig::from_value(json!({ "monorepo": { "publish": ["./publish"] } }))?;
/// assert_eq!(publish[0].run(config.clone(), Context::new()).await?, Some(json!("published")));
/// assert_eq!(publish[1].run(config, Context::new()).await?, None);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Weaver {
    loader: Arc<dyn PluginLoader>,
    config: WeaverConfig,
}

impl fmt::Debug for Weaver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Weaver").field("config", &self.config).finish()
    }
}

impl Weaver {
    pub fn new<L: PluginLoader + 'static>(loader: L) -> Self {
        Self::with_loader(Arc::new(loader))
    }

    pub fn with_loader(loader: Arc<dyn PluginLoader>) -> Self {
        Self {
            loader,
            config: WeaverConfig::default(),
        }
    }

    pub fn with_config(mut self, config: WeaverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &WeaverConfig {
        &self.config
    }

    /// Resolves a definition with this weaver's loader.
    pub async fn resolve_definitions(
        &self,
        definition: Option<&PluginDefinition>,
        step_type: &str,
    ) -> Result<Vec<ResolvedStep>, PluginError> {
        resolve_definitions(definition, step_type, self.loader.as_ref()).await
    }

    /// Wraps the step configured at `namespace`/`step_type`, position `index`.
    ///
    /// The configured definition's entry at `index` wins; otherwise the
    /// entry of `default` at the same position is used. With neither, the
    /// adapter resolves to `None` without calling `decorate`. A found step
    /// is passed through `decorate` and the result runs with the plugin
    /// configuration merged with the step's inline options.
    pub fn wrap_plugin<D>(
        &self,
        namespace: impl Into<String>,
        step_type: impl Into<StepName>,
        decorate: D,
        default: Option<PluginDefinition>,
        index: usize,
    ) -> SharedStep
    where
        D: Fn(SharedStep) -> SharedStep + Send + Sync + 'static,
    {
        let stage = Arc::new(StageKey::new(namespace, step_type, self.loader.clone()));
        Arc::new(WrappedSlot {
            stage,
            decorate: Arc::new(decorate),
            default,
            index,
        })
    }

    /// One [`Weaver::wrap_plugin`] adapter per position.
    ///
    /// `defaults` is read as one sequence: position `i` falls back to
    /// `defaults[i]`.
    pub fn wrap_multi_plugin<D>(
        &self,
        namespace: impl Into<String>,
        step_type: impl Into<StepName>,
        decorate: D,
        defaults: Vec<PluginDefinition>,
    ) -> StageSteps
    where
        D: Fn(SharedStep) -> SharedStep + Send + Sync + 'static,
    {
        let stage = Arc::new(StageKey::new(namespace, step_type, self.loader.clone()));
        let decorate: Decorator = Arc::new(decorate);
        let default = default_sequence(defaults);

        let steps = (0..self.config.slots)
            .map(|index| {
                Arc::new(WrappedSlot {
                    stage: stage.clone(),
                    decorate: decorate.clone(),
                    default: default.clone(),
                    index,
                }) as SharedStep
            })
            .collect();
        StageSteps { steps }
    }

    /// Runs the configured (or default) steps undecorated and `appended`
    /// right after the last of them.
    ///
    /// A configured step definition, when present, alone decides how many
    /// entries there are. `defaults` count when nothing is configured or the
    /// configured value only carries options, which then apply to each
    /// default step. With zero entries `appended` never runs.
    pub fn append_multi_plugin(
        &self,
        namespace: impl Into<String>,
        step_type: impl Into<StepName>,
        appended: SharedStep,
        defaults: Vec<PluginDefinition>,
    ) -> StageSteps {
        let stage = Arc::new(StageKey::new(namespace, step_type, self.loader.clone()));
        let default = default_sequence(defaults);

        let steps = (0..self.config.slots)
            .map(|index| {
                Arc::new(AppendedSlot {
                    stage: stage.clone(),
                    appended: appended.clone(),
                    default: default.clone(),
                    index,
                }) as SharedStep
            })
            .collect();
        StageSteps { steps }
    }

    /// Runs the `step_name` step of every plugin the host declares in
    /// `context.options().plugins`, then `aggregate` with their results.
    ///
    /// Positions past the declared plugins, and plugins without a
    /// `step_name` step, return `default_return`. The position right after
    /// the last declared plugin runs `aggregate` with every recorded result
    /// in [`Context::step_results`].
    ///
    /// Results are recorded when a position is invoked, so positions must be
    /// run in ascending order.
    pub fn append_step(
        &self,
        step_name: impl Into<StepName>,
        aggregate: SharedStep,
        default_return: Option<Value>,
    ) -> StageSteps {
        let step_name = step_name.into();
        let results = Arc::new(StepResults::default());

        let steps = (0..self.config.slots)
            .map(|index| {
                Arc::new(AccumulatingSlot {
                    step_name: step_name.clone(),
                    aggregate: aggregate.clone(),
                    default_return: default_return.clone(),
                    loader: self.loader.clone(),
                    results: results.clone(),
                    index,
                }) as SharedStep
            })
            .collect();
        StageSteps { steps }
    }

    /// Decorates the `step_name` step of every plugin the host declares in
    /// `context.options().plugins`.
    ///
    /// Each position runs `wrap(step)` with the declared plugin's inline
    /// options. Positions without a plugin, or whose plugin lacks the step,
    /// return `default_return` and never call `wrap`.
    pub fn wrap_step<D>(
        &self,
        step_name: impl Into<StepName>,
        wrap: D,
        default_return: Option<Value>,
    ) -> StageSteps
    where
        D: Fn(SharedStep) -> SharedStep + Send + Sync + 'static,
    {
        let step_name = step_name.into();
        let wrap: Decorator = Arc::new(wrap);

        let steps = (0..self.config.slots)
            .map(|index| {
                Arc::new(HostWrappedSlot {
                    step_name: step_name.clone(),
                    wrap: wrap.clone(),
                    default_return: default_return.clone(),
                    loader: self.loader.clone(),
                    index,
                }) as SharedStep
            })
            .collect();
        StageSteps { steps }
    }
}

fn default_sequence(defaults: Vec<PluginDefinition>) -> Option<PluginDefinition> {
    if defaults.is_empty() {
        None
    } else {
        Some(PluginDefinition::Sequence(defaults))
    }
}

/// Namespace/type lookup shared by the adapters of one composition.
struct StageKey {
    namespace: String,
    step_type: StepName,
    loader: Arc<dyn PluginLoader>,
}

impl StageKey {
    fn new(
        namespace: impl Into<String>,
        step_type: impl Into<StepName>,
        loader: Arc<dyn PluginLoader>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            step_type: step_type.into(),
            loader,
        }
    }

    fn configured(&self, config: &PluginConfig) -> Result<Option<PluginDefinition>, PluginError> {
        config.definition(&self.namespace, self.step_type.as_str())
    }

    async fn at(
        &self,
        definition: Option<&PluginDefinition>,
        index: usize,
    ) -> Result<Option<ResolvedStep>, PluginError> {
        resolve_definition(definition, self.step_type.as_str(), index, self.loader.as_ref()).await
    }

    fn slot_name(&self, index: usize) -> StepName {
        StepName::new(format!("{}.{}[{}]", self.namespace, self.step_type, index))
    }
}

struct WrappedSlot {
    stage: Arc<StageKey>,
    decorate: Decorator,
    default: Option<PluginDefinition>,
    index: usize,
}

impl fmt::Debug for WrappedSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrappedSlot")
            .field("name", &self.name())
            .field("default", &self.default)
            .finish()
    }
}

#[async_trait]
impl Step for WrappedSlot {
    async fn run(&self, config: PluginConfig, ctx: Context) -> StepResult {
        let configured = self.stage.configured(&config)?;
        let resolved = match self.stage.at(configured.as_ref(), self.index).await? {
            Some(resolved) => Some(resolved),
            None => self
                .stage
                .at(self.default.as_ref(), self.index)
                .await?
                .map(|mut resolved| {
                    // Options written next to the missing step still apply to the default.
                    if let Some(configured) = &configured {
                        resolved.options.extend(configured.inline_options());
                    }
                    resolved
                }),
        };

        let Some(resolved) = resolved else {
            debug!("No step configured for '{}'", self.name());
            return Ok(None);
        };

        let step = (self.decorate)(resolved.step);
        step.run(config.merged(&resolved.options), ctx).await
    }

    fn name(&self) -> StepName {
        self.stage.slot_name(self.index)
    }
}

struct AppendedSlot {
    stage: Arc<StageKey>,
    appended: SharedStep,
    default: Option<PluginDefinition>,
    index: usize,
}

impl fmt::Debug for AppendedSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppendedSlot")
            .field("name", &self.name())
            .field("appended", &self.appended.name())
            .finish()
    }
}

#[async_trait]
impl Step for AppendedSlot {
    async fn run(&self, config: PluginConfig, ctx: Context) -> StepResult {
        let configured = self.stage.configured(&config)?;
        // An options object without a step configures the defaults instead.
        let (source, inline) = match configured.as_ref() {
            None | Some(PluginDefinition::Empty) => (self.default.as_ref(), Options::new()),
            Some(PluginDefinition::Configured { path: None, options }) => {
                (self.default.as_ref(), options.clone())
            }
            Some(definition) => (Some(definition), Options::new()),
        };
        let entries = source.map_or(0, PluginDefinition::len);

        if self.index < entries {
            return match self.stage.at(source, self.index).await? {
                Some(mut resolved) => {
                    resolved.options.extend(inline);
                    resolved
                        .step
                        .run(config.merged(&resolved.options), ctx)
                        .await
                }
                None => Ok(None),
            };
        }

        // Zero entries never reach the appended step, even at position 0.
        if self.index == entries && self.index > 0 {
            info!(
                "Running appended step '{}' after {} entries of '{}'",
                self.appended.name(),
                entries,
                self.stage.step_type
            );
            return self.appended.run(config, ctx).await;
        }

        Ok(None)
    }

    fn name(&self) -> StepName {
        self.stage.slot_name(self.index)
    }
}

type PendingResult = Shared<BoxFuture<'static, StepResult>>;

/// Results recorded by one `append_step` composition, in invocation order.
#[derive(Default)]
struct StepResults {
    pending: Mutex<Vec<PendingResult>>,
}

impl StepResults {
    fn record(&self, result: PendingResult) {
        self.pending.lock().push(result);
    }

    fn snapshot(&self) -> Vec<PendingResult> {
        self.pending.lock().clone()
    }
}

struct AccumulatingSlot {
    step_name: StepName,
    aggregate: SharedStep,
    default_return: Option<Value>,
    loader: Arc<dyn PluginLoader>,
    results: Arc<StepResults>,
    index: usize,
}

impl fmt::Debug for AccumulatingSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccumulatingSlot")
            .field("step_name", &self.step_name)
            .field("index", &self.index)
            .finish()
    }
}

#[async_trait]
impl Step for AccumulatingSlot {
    async fn run(&self, config: PluginConfig, ctx: Context) -> StepResult {
        if self.index == ctx.options().plugin_count() {
            let results = try_join_all(self.results.snapshot()).await?;
            info!(
                "Running aggregate step '{}' with {} result(s)",
                self.aggregate.name(),
                results.len()
            );
            let ctx = ctx.with_step_results(results);
            return self.aggregate.run(config, ctx).await;
        }

        let Some(entry) = ctx.options().plugin(self.index, "append_step")? else {
            return Ok(self.default_return.clone());
        };

        let loaded = self.loader.load(&entry.name).await?;
        let Some(step) = loaded.capability(self.step_name.as_str()) else {
            ctx.log(&format!(
                "Plugin '{}' does not implement '{}'",
                entry.name, self.step_name
            ));
            return Ok(self.default_return.clone());
        };

        let config = config.merged(&entry.options);
        let pending: PendingResult = async move { step.run(config, ctx).await }.boxed().shared();
        self.results.record(pending.clone());
        pending.await
    }

    fn name(&self) -> StepName {
        StepName::new(format!("{}[{}]", self.step_name, self.index))
    }
}

struct HostWrappedSlot {
    step_name: StepName,
    wrap: Decorator,
    default_return: Option<Value>,
    loader: Arc<dyn PluginLoader>,
    index: usize,
}

impl fmt::Debug for HostWrappedSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostWrappedSlot")
            .field("step_name", &self.step_name)
            .field("index", &self.index)
            .finish()
    }
}

#[async_trait]
impl Step for HostWrappedSlot {
    async fn run(&self, _config: PluginConfig, ctx: Context) -> StepResult {
        let Some(entry) = ctx.options().plugin(self.index, "wrap_step")? else {
            return Ok(self.default_return.clone());
        };

        let loaded = self.loader.load(&entry.name).await?;
        let Some(step) = loaded.capability(self.step_name.as_str()) else {
            ctx.log(&format!(
                "Plugin '{}' does not implement '{}'",
                entry.name, self.step_name
            ));
            return Ok(self.default_return.clone());
        };

        let step = (self.wrap)(step);
        step.run(PluginConfig::from_options(entry.options), ctx).await
    }

    fn name(&self) -> StepName {
        StepName::new(format!("{}[{}]", self.step_name, self.index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::HostOptions;
    use crate::loader::PluginRegistry;
    use crate::plugin::PluginModule;
    use crate::step::step_fn;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const NAMESPACE: &str = "monorepo";

    fn returning(name: &str, value: Value) -> SharedStep {
        step_fn(name, move |_, _| {
            let value = value.clone();
            async move { Ok(Some(value)) }
        })
    }

    fn echo_option(name: &str, key: &'static str) -> SharedStep {
        step_fn(name, move |config: PluginConfig, _| async move {
            Ok(config.option(key).cloned())
        })
    }

    fn registry() -> PluginRegistry {
        PluginRegistry::new()
            .register_step("myPlugin", returning("myPlugin", json!("my")))
            .register_step("defaultPlugin", returning("defaultPlugin", json!("default")))
            .register_step("otherDefault", returning("otherDefault", json!("other")))
    }

    /// Decorator recording what it was handed.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn decorator(
            self: &Arc<Self>,
        ) -> impl Fn(SharedStep) -> SharedStep + Send + Sync + 'static {
            let recorder = self.clone();
            move |step: SharedStep| {
                recorder.calls.lock().push(step.name().to_string());
                step
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    fn config(value: Value) -> PluginConfig {
        PluginConfig::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_wrap_plugin_decorates_configured_step() {
        let recorder = Arc::new(Recorder::default());
        let weaver = Weaver::new(registry());
        let adapter =
            weaver.wrap_plugin(NAMESPACE, "analyzeCommits", recorder.decorator(), None, 0);

        let result = adapter
            .run(config(json!({ "monorepo": { "analyzeCommits": "myPlugin" } })), Context::new())
            .await
            .unwrap();

        assert_eq!(result, Some(json!("my")));
        assert_eq!(recorder.calls(), vec!["myPlugin".to_string()]);
    }

    #[tokio::test]
    async fn test_wrap_plugin_passes_config_and_inline_options() {
        let weaver = Weaver::new(
            PluginRegistry::new().register_step("myPlugin", echo_option("myPlugin", "test")),
        );
        let adapter = weaver.wrap_plugin(NAMESPACE, "analyzeCommits", |step| step, None, 0);

        let result = adapter
            .run(
                config(json!({
                    "monorepo": { "analyzeCommits": { "path": "myPlugin", "test": true } }
                })),
                Context::new(),
            )
            .await
            .unwrap();
        assert_eq!(result, Some(json!(true)));
    }

    #[tokio::test]
    async fn test_wrap_plugin_falls_back_to_default() {
        let weaver = Weaver::new(
            PluginRegistry::new()
                .register_step("defaultPlugin", echo_option("defaultPlugin", "test")),
        );
        let recorder = Arc::new(Recorder::default());
        let adapter = weaver.wrap_plugin(
            NAMESPACE,
            "analyzeCommits",
            recorder.decorator(),
            Some("defaultPlugin".into()),
            0,
        );

        let result = adapter
            .run(
                config(json!({ "monorepo": { "analyzeCommits": { "test": true } } })),
                Context::new(),
            )
            .await
            .unwrap();

        assert_eq!(recorder.calls(), vec!["defaultPlugin".to_string()]);
        assert_eq!(result, Some(json!(true)));
    }

    #[tokio::test]
    async fn test_wrap_plugin_without_step_skips_decorator() {
        let weaver = Weaver::new(registry());
        let adapter = weaver.wrap_plugin(
            NAMESPACE,
            "analyzeCommits",
            |_| -> SharedStep { panic!("decorator should not be called") },
            None,
            0,
        );

        let result = adapter
            .run(
                config(json!({ "monorepo": { "analyzeCommits": { "test": true } } })),
                Context::new(),
            )
            .await
            .unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn test_wrap_multi_plugin_has_fixed_length() {
        let weaver = Weaver::new(registry());
        let steps = weaver.wrap_multi_plugin(NAMESPACE, "publish", |step| step, vec![]);
        assert_eq!(steps.len(), 10);

        let weaver = weaver.with_config(WeaverConfig::with_slots(3));
        let steps = weaver.wrap_multi_plugin(NAMESPACE, "publish", |step| step, vec![]);
        assert_eq!(steps.len(), 3);
    }

    #[tokio::test]
    async fn test_wrap_multi_plugin_default_at_position() {
        let recorder = Arc::new(Recorder::default());
        let weaver = Weaver::new(registry());
        let steps = weaver.wrap_multi_plugin(
            NAMESPACE,
            "publish",
            recorder.decorator(),
            vec!["".into(), "defaultPlugin".into()],
        );
        let config = config(json!({ "monorepo": {} }));

        assert_eq!(steps[0].run(config.clone(), Context::new()).await.unwrap(), None);
        assert_eq!(
            steps[1].run(config.clone(), Context::new()).await.unwrap(),
            Some(json!("default"))
        );
        assert_eq!(steps[2].run(config, Context::new()).await.unwrap(), None);
        assert_eq!(recorder.calls(), vec!["defaultPlugin".to_string()]);
    }

    #[tokio::test]
    async fn test_wrap_multi_plugin_explicit_wins_then_defaults_fill() {
        let recorder = Arc::new(Recorder::default());
        let weaver = Weaver::new(registry());
        let steps = weaver.wrap_multi_plugin(
            NAMESPACE,
            "publish",
            recorder.decorator(),
            vec!["defaultPlugin".into(), "otherDefault".into()],
        );
        let config = config(json!({ "monorepo": { "publish": ["myPlugin"] } }));

        assert_eq!(
            steps[0].run(config.clone(), Context::new()).await.unwrap(),
            Some(json!("my"))
        );
        assert_eq!(
            steps[1].run(config.clone(), Context::new()).await.unwrap(),
            Some(json!("other"))
        );
        assert_eq!(steps[2].run(config, Context::new()).await.unwrap(), None);
        assert_eq!(
            recorder.calls(),
            vec!["myPlugin".to_string(), "otherDefault".to_string()]
        );
    }

    #[tokio::test]
    async fn test_append_multi_plugin_boundary() {
        let appended_calls = Arc::new(AtomicUsize::new(0));
        let counter = appended_calls.clone();
        let appended = step_fn("appended", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(Some(json!("appended"))) }
        });

        let weaver = Weaver::new(registry());
        let steps = weaver.append_multi_plugin(NAMESPACE, "generateNotes", appended, vec![]);
        let config =
            config(json!({ "monorepo": { "generateNotes": ["myPlugin", "defaultPlugin"] } }));

        let results = steps.run_all(&config, &Context::new()).await.unwrap();
        assert_eq!(
            results[..4],
            [
                Some(json!("my")),
                Some(json!("default")),
                Some(json!("appended")),
                None,
            ]
        );
        assert!(results[4..].iter().all(Option::is_none));
        assert_eq!(appended_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_append_multi_plugin_zero_entries_never_appends() {
        let weaver = Weaver::new(registry());
        let steps = weaver.append_multi_plugin(
            NAMESPACE,
            "generateNotes",
            step_fn("appended", |_, _| async {
                Err(PluginError::step("appended", "should not run"))
            }),
            vec![],
        );

        let results = steps
            .run_all(&config(json!({ "monorepo": {} })), &Context::new())
            .await
            .unwrap();
        assert!(results.iter().all(Option::is_none));
    }

    #[tokio::test]
    async fn test_append_step_aggregates_recorded_results() {
        let registry = PluginRegistry::new()
            .register_plugin(
                "A",
                PluginModule::new("A").with_step("verifyConditions", returning("a", json!("a"))),
            )
            .register_plugin("B", PluginModule::new("B"));
        let aggregate = step_fn("aggregate", |_, ctx: Context| async move {
            Ok(Some(Value::Array(
                ctx.step_results().iter().map(|r| r.clone().unwrap_or(Value::Null)).collect(),
            )))
        });

        let weaver = Weaver::new(registry);
        let steps = weaver.append_step("verifyConditions", aggregate, Some(json!("skipped")));
        let ctx = Context::new().with_options(HostOptions::new().with_plugin("A").with_plugin("B"));

        let results = steps.run_all(&PluginConfig::new(), &ctx).await.unwrap();
        assert_eq!(results[0], Some(json!("a")));
        assert_eq!(results[1], Some(json!("skipped")));
        assert_eq!(results[2], Some(json!(["a"])));
        assert!(results[3..].iter().all(|r| r == &Some(json!("skipped"))));
    }

    #[tokio::test]
    async fn test_append_multi_plugin_options_only_config_uses_defaults() {
        let weaver = Weaver::new(registry()).with_config(WeaverConfig::with_slots(4));
        let steps = weaver.append_multi_plugin(
            NAMESPACE,
            "generateNotes",
            returning("appended", json!("appended")),
            vec![echo_option("echo", "test").into(), "otherDefault".into()],
        );
        let config = config(json!({ "monorepo": { "generateNotes": { "test": true } } }));

        let results = steps.run_all(&config, &Context::new()).await.unwrap();
        assert_eq!(
            results,
            vec![
                Some(json!(true)),
                Some(json!("other")),
                Some(json!("appended")),
                None,
            ]
        );
    }
}
