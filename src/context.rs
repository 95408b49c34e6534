use crate::config::Options;
use crate::error::PluginError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Host-side logger handed to steps through the [`Context`].
pub trait Logger: Send + Sync + fmt::Debug {
    fn log(&self, message: &str);
}

/// Default [`Logger`] forwarding to `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, message: &str) {
        info!(target: "stepweave::host", "{}", message);
    }
}

/// One entry of the host's declared plugin list.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginEntry {
    pub name: String,
    pub options: Options,
}

impl PluginEntry {
    /// Reads an entry written either as `"name"` or `["name", { ..options }]`.
    ///
    /// `null`, `""` and an array without a name are "no plugin".
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::InvalidDefinition`] naming `wrapper` when the
    /// name is not textual or the options are not an object.
    pub fn from_value(value: &Value, wrapper: &str) -> Result<Option<Self>, PluginError> {
        let (name, options) = match value {
            Value::Array(pair) => match pair.first() {
                Some(name) => (name, pair.get(1)),
                None => return Ok(None),
            },
            other => (other, None),
        };

        let name = match name {
            Value::Null => return Ok(None),
            Value::String(name) if name.is_empty() => return Ok(None),
            Value::String(name) => name.clone(),
            other => return Err(PluginError::invalid_definition(wrapper, other)),
        };

        let options = match options {
            None | Some(Value::Null) => Options::new(),
            Some(Value::Object(options)) => options.clone(),
            Some(other) => return Err(PluginError::invalid_definition(wrapper, other)),
        };

        Ok(Some(Self { name, options }))
    }
}

/// Global options the host exposes to its steps.
///
/// `plugins` keeps the raw configured entries; read them with
/// [`HostOptions::plugin`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostOptions {
    #[serde(default)]
    pub plugins: Vec<Value>,
    #[serde(flatten)]
    pub extra: Options,
}

impl HostOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a plugin by name.
    pub fn with_plugin(mut self, name: impl Into<String>) -> Self {
        self.plugins.push(Value::String(name.into()));
        self
    }

    /// Declares a plugin with inline options (`["name", { .. }]`).
    pub fn with_plugin_options(mut self, name: impl Into<String>, options: Value) -> Self {
        self.plugins
            .push(Value::Array(vec![Value::String(name.into()), options]));
        self
    }

    /// Returns the declared plugin at `index`, if any.
    pub fn plugin(&self, index: usize, wrapper: &str) -> Result<Option<PluginEntry>, PluginError> {
        match self.plugins.get(index) {
            Some(value) => PluginEntry::from_value(value, wrapper),
            None => Ok(None),
        }
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }
}

/// The host context forwarded to every step.
///
/// Adapters never mutate a context they receive; the accumulating runner
/// hands its aggregate step a copy carrying the collected results.
///
/// # Examples
///
/// ```
/// use stepweave::{Context, HostOptions};
/// use serde_json::json;
///
/// let ctx = Context::new()
///     .with_options(HostOptions::new().with_plugin("@release/npm"))
///     .with_data("branch", json!("main"));
///
/// assert_eq!(ctx.options().plugin_count(), 1);
/// assert_eq!(ctx.get("branch"), Some(&json!("main")));
/// assert!(ctx.step_results().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct Context {
    options: HostOptions,
    logger: Arc<dyn Logger>,
    data: Options,
    step_results: Vec<Option<Value>>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Self {
            options: HostOptions::default(),
            logger: Arc::new(TracingLogger),
            data: Options::new(),
            step_results: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: HostOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Returns a copy of this context carrying `results`.
    pub fn with_step_results(&self, results: Vec<Option<Value>>) -> Self {
        let mut ctx = self.clone();
        ctx.step_results = results;
        ctx
    }

    pub fn options(&self) -> &HostOptions {
        &self.options
    }

    pub fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }

    pub fn log(&self, message: &str) {
        self.logger.log(message);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Results of earlier steps, in invocation order. Only populated for
    /// aggregate steps.
    pub fn step_results(&self) -> &[Option<Value>] {
        &self.step_results
    }
}
