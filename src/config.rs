use crate::definition::PluginDefinition;
use crate::error::PluginError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Inline options bag carried by definitions and plugin configurations.
pub type Options = serde_json::Map<String, Value>;

/// Number of positional slots produced by every composer.
///
/// Nine host-declared plugins plus one slot for an appended or aggregate
/// step.
pub const DEFAULT_SLOTS: usize = 10;

/// Composer settings.
///
/// # Examples
///
/// ```
/// use stepweave::{WeaverConfig, DEFAULT_SLOTS};
///
/// assert_eq!(WeaverConfig::default().slots, DEFAULT_SLOTS);
/// assert_eq!(WeaverConfig::with_slots(4).slots, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeaverConfig {
    /// Length of every adapter sequence. Default: [`DEFAULT_SLOTS`].
    pub slots: usize,
}

impl WeaverConfig {
    pub fn with_slots(slots: usize) -> Self {
        Self { slots }
    }
}

impl Default for WeaverConfig {
    fn default() -> Self {
        Self {
            slots: DEFAULT_SLOTS,
        }
    }
}

/// The plugin configuration a host passes to every adapter.
///
/// Holds the JSON options object the host was configured with. Nested
/// `options[namespace][step_type]` values are read as plugin definitions.
/// Definitions that cannot be written as JSON (in-process steps) are
/// attached with [`PluginConfig::with_definition`] and take precedence over
/// JSON at the same key.
///
/// # Examples
///
/// ```
/// use stepweave::PluginConfig;
/// use serde_json::json;
///
/// let config = PluginConfig::from_value(json!({
///     "monorepo": { "analyzeCommits": "@release/commit-analyzer" },
///     "dryRun": true,
/// }))?;
///
/// assert_eq!(config.option("dryRun"), Some(&json!(true)));
/// assert!(config.definition("monorepo", "analyzeCommits")?.is_some());
/// assert!(config.definition("monorepo", "publish")?.is_none());
/// # Ok::<(), stepweave::PluginError>(())
/// ```
#[derive(Clone, Default)]
pub struct PluginConfig {
    options: Options,
    definitions: BTreeMap<(String, String), PluginDefinition>,
}

impl fmt::Debug for PluginConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginConfig")
            .field("options", &self.options)
            .field("definitions", &self.definitions.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PluginConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a configuration from a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Configuration`] if `value` is not an object.
    pub fn from_value(value: Value) -> Result<Self, PluginError> {
        match value {
            Value::Object(options) => Ok(Self::from_options(options)),
            Value::Null => Ok(Self::new()),
            other => Err(PluginError::Configuration(format!(
                "expected an object, got {other}"
            ))),
        }
    }

    pub fn from_options(options: Options) -> Self {
        Self {
            options,
            definitions: BTreeMap::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// Attaches a definition for `namespace`/`step_type`.
    pub fn with_definition(
        mut self,
        namespace: impl Into<String>,
        step_type: impl Into<String>,
        definition: impl Into<PluginDefinition>,
    ) -> Self {
        self.definitions
            .insert((namespace.into(), step_type.into()), definition.into());
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// Looks up the definition stored at `namespace`/`step_type`.
    ///
    /// Returns `Ok(None)` when nothing (or JSON `null`) is configured there.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::InvalidDefinition`] if the JSON value at that
    /// key is not a definition shape.
    pub fn definition(
        &self,
        namespace: &str,
        step_type: &str,
    ) -> Result<Option<PluginDefinition>, PluginError> {
        if let Some(definition) = self
            .definitions
            .get(&(namespace.to_string(), step_type.to_string()))
        {
            return Ok(Some(definition.clone()));
        }

        let value = self
            .options
            .get(namespace)
            .and_then(Value::as_object)
            .and_then(|types| types.get(step_type));

        match value {
            None | Some(Value::Null) => Ok(None),
            Some(value) => PluginDefinition::from_value(value).map(Some),
        }
    }

    /// Returns a new configuration with `inline` layered over these options.
    ///
    /// `self` is left untouched.
    pub fn merged(&self, inline: &Options) -> Self {
        let mut merged = self.clone();
        for (key, value) in inline {
            merged.options.insert(key.clone(), value.clone());
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::step_fn;
    use serde_json::json;

    #[test]
    fn test_from_value_rejects_non_objects() {
        tokio_test::assert_ok!(PluginConfig::from_value(json!({})));
        tokio_test::assert_ok!(PluginConfig::from_value(Value::Null));

        let error = tokio_test::assert_err!(PluginConfig::from_value(json!([1, 2])));
        assert!(matches!(error, PluginError::Configuration(_)));
    }

    #[test]
    fn test_definition_lookup_from_json() {
        let config = PluginConfig::from_value(json!({
            "monorepo": {
                "publish": ["@release/npm", { "path": "@release/github", "assets": [] }],
                "verifyConditions": null,
            },
            "flat": "not a namespace",
        }))
        .unwrap();

        let publish = config.definition("monorepo", "publish").unwrap().unwrap();
        assert_eq!(publish.len(), 2);
        assert!(config.definition("monorepo", "verifyConditions").unwrap().is_none());
        assert!(config.definition("flat", "publish").unwrap().is_none());
        assert!(config.definition("other", "publish").unwrap().is_none());
    }

    #[test]
    fn test_definition_lookup_rejects_malformed_json() {
        let config = PluginConfig::from_value(json!({ "monorepo": { "publish": 3 } })).unwrap();
        let error = config.definition("monorepo", "publish").unwrap_err();
        assert!(matches!(error, PluginError::InvalidDefinition { .. }));
    }

    #[test]
    fn test_code_definitions_take_precedence() {
        let config = PluginConfig::from_value(json!({ "monorepo": { "publish": "@release/npm" } }))
            .unwrap()
            .with_definition("monorepo", "publish", step_fn("inline", |_, _| async { Ok(None) }));

        match config.definition("monorepo", "publish").unwrap() {
            Some(PluginDefinition::Step(step)) => assert_eq!(step.name().as_str(), "inline"),
            other => panic!("unexpected definition: {other:?}"),
        }
    }

    #[test]
    fn test_merged_does_not_mutate_original() {
        let config = PluginConfig::new().with_option("dryRun", json!(false));
        let mut inline = Options::new();
        inline.insert("dryRun".to_string(), json!(true));
        inline.insert("preset".to_string(), json!("angular"));

        let merged = config.merged(&inline);

        assert_eq!(config.option("dryRun"), Some(&json!(false)));
        assert_eq!(config.option("preset"), None);
        assert_eq!(merged.option("dryRun"), Some(&json!(true)));
        assert_eq!(merged.option("preset"), Some(&json!("angular")));
    }
}
