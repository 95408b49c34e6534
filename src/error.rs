use thiserror::Error;

/// Errors raised while resolving plugin definitions or running woven steps.
///
/// Every variant carries owned strings so the error is `Clone`. The
/// accumulating runner keeps pending step results in a shared buffer and
/// hands the same outcome to both the slot that started a step and the
/// aggregate slot that joins it.
///
/// # Non-Exhaustive
///
/// Match with a wildcard arm:
///
/// ```
/// use stepweave::PluginError;
///
/// fn describe(error: &PluginError) -> String {
///     match error {
///         PluginError::InvalidDefinition { wrapper, value } => {
///             format!("{wrapper} rejected {value}")
///         }
///         PluginError::Unresolvable { reference, .. } => format!("cannot load {reference}"),
///         _ => error.to_string(),
///     }
/// }
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PluginError {
    /// A definition was neither a step, a reference, an options object nor a
    /// sequence of those.
    #[error("Invalid plugin definition passed to {wrapper}: {value}")]
    InvalidDefinition {
        /// Name of the wrapper that received the value
        wrapper: String,
        /// Rendering of the offending value
        value: String,
    },

    /// The loader could not turn a textual reference into a step or plugin.
    #[error("Unable to resolve plugin '{reference}': {details}")]
    Unresolvable {
        /// The reference as written in the configuration
        reference: String,
        /// Loader-provided reason
        details: String,
    },

    /// A step reported a failure.
    #[error("Step failed: {step_name}, details: {details}")]
    StepError {
        /// Name of the failing step
        step_name: String,
        /// Details about the failure
        details: String,
    },

    /// The host configuration could not be interpreted.
    #[error("Invalid plugin configuration: {0}")]
    Configuration(String),
}

impl PluginError {
    /// Shorthand for [`PluginError::InvalidDefinition`].
    pub fn invalid_definition(wrapper: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidDefinition {
            wrapper: wrapper.into(),
            value: value.to_string(),
        }
    }

    /// Shorthand for [`PluginError::StepError`].
    pub fn step(step_name: impl Into<String>, details: impl Into<String>) -> Self {
        Self::StepError {
            step_name: step_name.into(),
            details: details.into(),
        }
    }
}

impl From<serde_json::Error> for PluginError {
    fn from(error: serde_json::Error) -> Self {
        Self::Configuration(error.to_string())
    }
}
