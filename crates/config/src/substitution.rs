//! Substitution policy and the per-load record of adjusted values.

use crate::schema::ConfigOptionDef;
use crate::warnings::{SubstitutionSink, TracingSink};
use serde::{Deserialize, Serialize};
use slicer_config_options::{ConfigError, ConfigOption};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// How a load reacts to unknown keys and unparseable values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForwardCompatibilitySubstitutionRule {
    /// Fail on the first unknown key or bad value.
    Disable,
    /// Substitute, record and warn.
    #[default]
    Enable,
    /// Substitute and record without warning.
    EnableSilent,
}

impl ForwardCompatibilitySubstitutionRule {
    /// Returns true unless the rule is `Disable`.
    #[must_use]
    pub const fn substitutes(self) -> bool {
        !matches!(self, Self::Disable)
    }

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disable => "disable",
            Self::Enable => "enable",
            Self::EnableSilent => "enable_silent",
        }
    }
}

impl fmt::Display for ForwardCompatibilitySubstitutionRule {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for ForwardCompatibilitySubstitutionRule {
    type Err = ConfigError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "disable" => Ok(Self::Disable),
            "enable" => Ok(Self::Enable),
            "enable_silent" | "enablesilent" => Ok(Self::EnableSilent),
            other => Err(ConfigError::configuration(format!(
                "unknown substitution rule: {other}"
            ))),
        }
    }
}

/// One value replaced during a load.
#[derive(Debug, Clone)]
pub struct ConfigSubstitution {
    /// Key the value was loaded for.
    pub key: String,
    /// Schema entry of the key, when known.
    pub opt_def: Option<ConfigOptionDef>,
    /// Text that failed to load.
    pub old_value: String,
    /// Value stored instead.
    pub new_value: Box<dyn ConfigOption>,
}

impl PartialEq for ConfigSubstitution {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.old_value == other.old_value
            && self.new_value.equals(other.new_value.as_ref())
    }
}

/// Ordered list of substitutions produced by a load.
pub type ConfigSubstitutions = Vec<ConfigSubstitution>;

/// Policy plus append-only record for a single load operation.
#[derive(Debug)]
pub struct ConfigSubstitutionContext {
    rule: ForwardCompatibilitySubstitutionRule,
    substitutions: ConfigSubstitutions,
    unrecognized_keys: Vec<String>,
    sink: Arc<dyn SubstitutionSink>,
}

impl ConfigSubstitutionContext {
    /// Creates a context warning through `tracing`.
    #[must_use]
    pub fn new(rule: ForwardCompatibilitySubstitutionRule) -> Self {
        Self::with_sink(rule, Arc::new(TracingSink))
    }

    /// Creates a context with a custom warning sink.
    #[must_use]
    pub fn with_sink(
        rule: ForwardCompatibilitySubstitutionRule,
        sink: Arc<dyn SubstitutionSink>,
    ) -> Self {
        Self {
            rule,
            substitutions: Vec::new(),
            unrecognized_keys: Vec::new(),
            sink,
        }
    }

    /// Policy in force.
    #[must_use]
    pub const fn rule(&self) -> ForwardCompatibilitySubstitutionRule {
        self.rule
    }

    /// Substitutions recorded so far, in order.
    #[must_use]
    pub fn substitutions(&self) -> &[ConfigSubstitution] {
        &self.substitutions
    }

    /// Keys skipped because nothing in the schema matched them.
    #[must_use]
    pub fn unrecognized_keys(&self) -> &[String] {
        &self.unrecognized_keys
    }

    /// Returns true if nothing was substituted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.substitutions.is_empty()
    }

    /// Appends a substitution and warns under `Enable`.
    pub fn push(&mut self, substitution: ConfigSubstitution) {
        if self.rule == ForwardCompatibilitySubstitutionRule::Enable {
            self.sink.report(&substitution);
        }
        self.substitutions.push(substitution);
    }

    /// Records a skipped key and warns under `Enable`.
    pub fn record_unrecognized(&mut self, key: &str) {
        if self.rule == ForwardCompatibilitySubstitutionRule::Enable {
            self.sink.unrecognized_key(key);
        }
        self.unrecognized_keys.push(key.to_string());
    }

    /// Consumes the context, returning its substitutions.
    #[must_use]
    pub fn into_substitutions(self) -> ConfigSubstitutions {
        self.substitutions
    }
}
