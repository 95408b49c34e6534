//! Plugin definitions and their resolution into concrete steps.

use crate::config::Options;
use crate::error::PluginError;
use crate::loader::PluginLoader;
use crate::step::SharedStep;
use serde_json::Value;
use std::fmt;
use tracing::debug;

const PATH_KEY: &str = "path";

/// A configured description of one or more steps.
///
/// # Examples
///
/// ```
/// use stepweave::PluginDefinition;
/// use serde_json::json;
///
/// let definition = PluginDefinition::from_value(&json!([
///     "@release/npm",
///     { "path": "@release/github", "assets": ["dist/*.tgz"] },
///     { "dryRun": true },
/// ]))?;
///
/// assert_eq!(definition.len(), 3);
/// # Ok::<(), stepweave::PluginError>(())
/// ```
#[derive(Clone, Debug)]
pub enum PluginDefinition {
    /// Placeholder (`null` or `""`). Occupies a position, yields no step.
    Empty,
    /// An in-process step.
    Step(SharedStep),
    /// A textual reference resolved through a [`PluginLoader`].
    Reference(String),
    /// An options object. With a `path` it configures the definition at that
    /// path; without one it is a plain options bag and never becomes a step.
    Configured {
        path: Option<Box<PluginDefinition>>,
        options: Options,
    },
    /// An ordered sequence of definitions.
    Sequence(Vec<PluginDefinition>),
}

impl PluginDefinition {
    pub fn reference(reference: impl Into<String>) -> Self {
        Self::Reference(reference.into())
    }

    /// Wraps `self` as the `path` of an options object.
    pub fn with_options(self, options: Options) -> Self {
        Self::Configured {
            path: Some(Box::new(self)),
            options,
        }
    }

    /// A plain options bag.
    pub fn options(options: Options) -> Self {
        Self::Configured {
            path: None,
            options,
        }
    }

    /// Parses a JSON definition.
    ///
    /// Strings become references, objects become [`PluginDefinition::Configured`]
    /// (the `path` key, when present and non-empty, is parsed recursively),
    /// arrays become sequences and `null`/`""` become placeholders.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::InvalidDefinition`] for numbers and booleans.
    pub fn from_value(value: &Value) -> Result<Self, PluginError> {
        match value {
            Value::Null => Ok(Self::Empty),
            Value::String(reference) if reference.is_empty() => Ok(Self::Empty),
            Value::String(reference) => Ok(Self::Reference(reference.clone())),
            Value::Array(items) => items
                .iter()
                .map(Self::from_value)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Sequence),
            Value::Object(object) => {
                let mut options = object.clone();
                let path = match options.remove(PATH_KEY) {
                    Some(path) => match Self::from_value(&path)? {
                        Self::Empty => None,
                        path => Some(Box::new(path)),
                    },
                    None => None,
                };
                Ok(Self::Configured { path, options })
            }
            other => Err(PluginError::invalid_definition(
                "PluginDefinition::from_value",
                other,
            )),
        }
    }

    /// Declared number of entries.
    ///
    /// Sequences count every position, placeholders included. A lone step or
    /// reference counts one; a plain options bag or placeholder counts zero.
    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Step(_) | Self::Reference(_) => 1,
            Self::Configured { path, .. } => path.as_deref().map_or(0, Self::len),
            Self::Sequence(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Options carried by the definition itself: an object's own options, or
    /// the merged options bags of a sequence.
    pub fn inline_options(&self) -> Options {
        match self {
            Self::Configured { options, .. } => options.clone(),
            Self::Sequence(items) => {
                let mut merged = Options::new();
                for item in items {
                    if let Self::Configured { path: None, options } = item {
                        merged.extend(options.clone());
                    }
                }
                merged
            }
            _ => Options::new(),
        }
    }
}

impl fmt::Display for PluginDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "<empty>"),
            Self::Step(step) => write!(f, "step '{}'", step.name()),
            Self::Reference(reference) => write!(f, "\"{}\"", reference),
            Self::Configured { path: Some(path), .. } => write!(f, "{{ path: {} }}", path),
            Self::Configured { path: None, options } => {
                write!(f, "{}", Value::Object(options.clone()))
            }
            Self::Sequence(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<SharedStep> for PluginDefinition {
    fn from(step: SharedStep) -> Self {
        Self::Step(step)
    }
}

impl From<&str> for PluginDefinition {
    fn from(reference: &str) -> Self {
        if reference.is_empty() {
            Self::Empty
        } else {
            Self::Reference(reference.to_string())
        }
    }
}

impl From<String> for PluginDefinition {
    fn from(reference: String) -> Self {
        Self::from(reference.as_str())
    }
}

impl From<Vec<PluginDefinition>> for PluginDefinition {
    fn from(items: Vec<PluginDefinition>) -> Self {
        Self::Sequence(items)
    }
}

/// A step resolved from a definition.
#[derive(Clone, Debug)]
pub struct ResolvedStep {
    /// Position of the step's entry in its owning definition.
    pub index: usize,
    pub step: SharedStep,
    /// Inline options to layer over the plugin configuration.
    pub options: Options,
}

/// Resolves `definition` into its steps, in declaration order.
///
/// Each [`ResolvedStep`] keeps the position of its entry, so placeholders,
/// options bags and plugins that do not implement `step_type` leave gaps
/// rather than shifting later entries. A reference resolving to a plugin
/// contributes that plugin's `step_type` step.
///
/// Options of a `{ path, .. }` object apply to every step under it. Options
/// bags inside a sequence apply to every step of that sequence; a step's own
/// options win over them.
///
/// # Errors
///
/// Loader failures propagate unchanged. Sequences nested inside a sequence
/// yield [`PluginError::InvalidDefinition`].
///
/// # Examples
///
/// ```
/// use stepweave::{resolve_definitions, step_fn, PluginDefinition, PluginRegistry};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), stepweave::PluginError> {
/// let registry = PluginRegistry::new()
///     .register_step("./notes", step_fn("notes", |_, _| async { Ok(None) }));
/// let definition = PluginDefinition::Sequence(vec![
///     PluginDefinition::Empty,
///     "./notes".into(),
/// ]);
///
/// let steps = resolve_definitions(Some(&definition), "generateNotes", &registry).await?;
/// assert_eq!(steps.len(), 1);
/// assert_eq!(steps[0].index, 1);
/// # Ok(())
/// # }
/// ```
pub async fn resolve_definitions(
    definition: Option<&PluginDefinition>,
    step_type: &str,
    loader: &dyn PluginLoader,
) -> Result<Vec<ResolvedStep>, PluginError> {
    let Some(definition) = definition else {
        return Ok(Vec::new());
    };

    let (entries, mut shared) = match definition {
        PluginDefinition::Configured {
            path: Some(path),
            options,
        } => (entries_of(path), options.clone()),
        PluginDefinition::Configured { path: None, .. } | PluginDefinition::Empty => {
            return Ok(Vec::new());
        }
        PluginDefinition::Sequence(items) => (items.iter().collect(), Options::new()),
        single => (vec![single], Options::new()),
    };

    for entry in &entries {
        if let PluginDefinition::Configured { path: None, options } = entry {
            shared.extend(options.clone());
        }
    }

    let mut resolved = Vec::new();
    for (index, entry) in entries.into_iter().enumerate() {
        let (target, own_options) = match entry {
            PluginDefinition::Empty | PluginDefinition::Configured { path: None, .. } => continue,
            PluginDefinition::Configured {
                path: Some(path),
                options,
            } => (&**path, Some(options)),
            other => (other, None),
        };

        let Some(step) = resolve_entry(target, step_type, loader).await? else {
            continue;
        };

        let mut options = shared.clone();
        if let Some(own) = own_options {
            options.extend(own.clone());
        }
        resolved.push(ResolvedStep {
            index,
            step,
            options,
        });
    }

    debug!(
        "Resolved {} step(s) for '{}' from {}",
        resolved.len(),
        step_type,
        definition
    );
    Ok(resolved)
}

/// Resolves `definition` and returns the step whose entry sits at `index`.
pub async fn resolve_definition(
    definition: Option<&PluginDefinition>,
    step_type: &str,
    index: usize,
    loader: &dyn PluginLoader,
) -> Result<Option<ResolvedStep>, PluginError> {
    let steps = resolve_definitions(definition, step_type, loader).await?;
    Ok(steps.into_iter().find(|step| step.index == index))
}

fn entries_of(definition: &PluginDefinition) -> Vec<&PluginDefinition> {
    match definition {
        PluginDefinition::Sequence(items) => items.iter().collect(),
        single => vec![single],
    }
}

async fn resolve_entry(
    entry: &PluginDefinition,
    step_type: &str,
    loader: &dyn PluginLoader,
) -> Result<Option<SharedStep>, PluginError> {
    match entry {
        PluginDefinition::Empty => Ok(None),
        PluginDefinition::Step(step) => Ok(Some(step.clone())),
        PluginDefinition::Reference(reference) => {
            let loaded = loader.load(reference).await?;
            let step = loaded.step_for(step_type);
            if step.is_none() {
                debug!("Plugin '{}' does not implement '{}'", reference, step_type);
            }
            Ok(step)
        }
        nested => Err(PluginError::invalid_definition("resolve_definitions", nested)),
    }
}
