//! Environment export and `SLIC3R_*` overrides.
//!
//! Post-processing scripts read the active preset from the environment as
//! `SLIC3R_<UPPERCASE_KEY>=<serialized value>`. The same naming lets a
//! caller override individual options from the process environment.

use crate::store::ConfigBase;
use crate::substitution::ConfigSubstitutionContext;
use slicer_config_options::ConfigError;
use slicer_config_shared::{ErrorCode, ErrorEnvelope, redact_if_secret};
use std::collections::BTreeMap;
use std::fmt;

/// Prefix of every exported or overriding env var.
pub const ENV_PREFIX: &str = "SLIC3R_";

/// Env var name for an option key.
#[must_use]
pub fn env_var_name(key: &str) -> String {
    format!("{ENV_PREFIX}{}", key.to_ascii_uppercase())
}

/// Option key named by an env var, or `None` without the prefix.
#[must_use]
pub fn option_key(var: &str) -> Option<String> {
    let suffix = var.strip_prefix(ENV_PREFIX)?;
    if suffix.is_empty() {
        return None;
    }
    Some(suffix.to_ascii_lowercase())
}

/// Serializes every stored option into `SLIC3R_*` variables.
///
/// # Errors
/// Propagates serialization failures of individual options.
pub fn config_to_env<C: ConfigBase + ?Sized>(
    config: &C,
) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut vars = BTreeMap::new();
    for key in config.keys() {
        let value = config.opt_serialize(&key)?;
        vars.insert(env_var_name(&key), value);
    }
    tracing::debug!(vars = vars.len(), "exported config to env");
    Ok(vars)
}

/// Applies `SLIC3R_*` entries whose key is known to the store.
///
/// Keys are checked against the schema, or against the stored keys for a
/// schema-less store. Entries without the prefix or naming an unknown key
/// are ignored. Returns the number of applied overrides.
///
/// # Errors
/// Returns [`EnvOverrideError`] when a value is rejected under the
/// context's policy.
pub fn apply_env_overrides<C: ConfigBase + ?Sized>(
    config: &mut C,
    vars: &BTreeMap<String, String>,
    ctx: &mut ConfigSubstitutionContext,
) -> Result<usize, EnvOverrideError> {
    let def = config.def();
    let mut applied = 0_usize;
    for (var, value) in vars {
        let Some(key) = option_key(var) else {
            continue;
        };
        let known = def.as_ref().map_or_else(
            || config.has(&key),
            |def| def.resolve_key(&key).is_some(),
        );
        if !known {
            tracing::debug!(env_var = %var, "ignoring env override for unknown option");
            continue;
        }
        config
            .set_deserialize(&key, value, ctx, false)
            .map_err(|error| EnvOverrideError::from_config(var, value, error))?;
        applied += 1;
    }
    if applied > 0 {
        tracing::debug!(overrides = applied, "applied env overrides");
    }
    Ok(applied)
}

/// Snapshot of the `SLIC3R_*` variables of the current process.
///
/// Variables whose name or value is not valid UTF-8 are skipped.
#[must_use]
pub fn env_overrides_from_std_env() -> BTreeMap<String, String> {
    std::env::vars_os()
        .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)))
        .filter(|(name, _)| name.starts_with(ENV_PREFIX))
        .collect()
}

/// Failures when applying env overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvOverrideError {
    /// The value could not be parsed for the option.
    InvalidValue {
        /// Env var name.
        var: String,
        /// Raw input value.
        value: String,
    },
    /// The store refused the option.
    Rejected {
        /// Env var name.
        var: String,
        /// Underlying store error.
        source: ConfigError,
    },
}

impl EnvOverrideError {
    fn from_config(var: &str, value: &str, error: ConfigError) -> Self {
        match error {
            ConfigError::BadOptionValue { .. } => Self::InvalidValue {
                var: var.to_string(),
                value: value.to_string(),
            },
            source => Self::Rejected {
                var: var.to_string(),
                source,
            },
        }
    }

    fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidValue { .. } => ErrorCode::new("config", "invalid_env_value"),
            Self::Rejected { .. } => ErrorCode::new("config", "rejected_env_override"),
        }
    }

    /// Env var that caused the failure.
    #[must_use]
    pub fn var(&self) -> &str {
        match self {
            Self::InvalidValue { var, .. } | Self::Rejected { var, .. } => var,
        }
    }
}

impl fmt::Display for EnvOverrideError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue { var, .. } => {
                write!(formatter, "{var} has a value the option cannot hold")
            },
            Self::Rejected { var, source } => write!(formatter, "{var} was rejected: {source}"),
        }
    }
}

impl std::error::Error for EnvOverrideError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidValue { .. } => None,
            Self::Rejected { source, .. } => Some(source),
        }
    }
}

impl From<EnvOverrideError> for ErrorEnvelope {
    fn from(error: EnvOverrideError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let mut envelope = Self::expected(code, message);

        match error {
            EnvOverrideError::InvalidValue { var, value } => {
                envelope = envelope
                    .with_metadata("value", redact_if_secret(&var, &value))
                    .with_metadata("env_var", var);
            },
            EnvOverrideError::Rejected { var, source } => {
                if let Some(key) = source.key() {
                    envelope = envelope.with_metadata("key", key);
                }
                envelope = envelope.with_metadata("env_var", var);
            },
        }

        envelope
    }
}
