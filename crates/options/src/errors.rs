//! Error taxonomy for option access and mutation.

use crate::types::ConfigOptionType;
use slicer_config_shared::{ErrorCode, ErrorEnvelope, redact_if_secret};
use std::fmt;

/// Errors raised by option stores, schemas and typed accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Key absent from the schema.
    UnknownOption {
        /// Offending key (after alias and legacy resolution).
        key: String,
    },
    /// Operation requires a schema but none is attached.
    NoDefinition {
        /// Key being resolved when the lookup failed.
        key: String,
    },
    /// Typed access or assignment with a mismatching option type.
    BadOptionType {
        /// Key involved, empty when accessed through a bare option.
        key: String,
        /// Type the caller asked for.
        expected: String,
        /// Type actually stored.
        found: String,
    },
    /// A value string could not be parsed for its option.
    BadOptionValue {
        /// Key being assigned.
        key: String,
        /// Raw value text.
        value: String,
    },
    /// Generic configuration failure.
    Configuration {
        /// Human-readable description.
        message: String,
    },
}

impl ConfigError {
    /// Unknown-key error.
    pub fn unknown_option(key: impl Into<String>) -> Self {
        Self::UnknownOption { key: key.into() }
    }

    /// Missing-schema error.
    pub fn no_definition(key: impl Into<String>) -> Self {
        Self::NoDefinition { key: key.into() }
    }

    /// Type mismatch for a keyed option.
    pub fn bad_option_type(
        key: impl Into<String>,
        expected: impl fmt::Display,
        found: ConfigOptionType,
    ) -> Self {
        Self::BadOptionType {
            key: key.into(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Unparseable value for a key.
    pub fn bad_option_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::BadOptionValue {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Generic configuration failure.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns the stable error code for this error.
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnknownOption { .. } => ErrorCode::new("config", "unknown_option"),
            Self::NoDefinition { .. } => ErrorCode::new("config", "no_definition"),
            Self::BadOptionType { .. } => ErrorCode::new("config", "bad_option_type"),
            Self::BadOptionValue { .. } => ErrorCode::new("config", "bad_option_value"),
            Self::Configuration { .. } => ErrorCode::new("config", "configuration"),
        }
    }

    /// Returns the key this error concerns, if any.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::UnknownOption { key }
            | Self::NoDefinition { key }
            | Self::BadOptionType { key, .. }
            | Self::BadOptionValue { key, .. } => Some(key.as_str()).filter(|k| !k.is_empty()),
            Self::Configuration { .. } => None,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownOption { key } => write!(formatter, "unknown option: {key}"),
            Self::NoDefinition { key } => {
                write!(formatter, "no config definition available to resolve {key}")
            },
            Self::BadOptionType {
                key,
                expected,
                found,
            } => {
                if key.is_empty() {
                    write!(formatter, "cannot read {found} option as {expected}")
                } else {
                    write!(
                        formatter,
                        "option {key} has type {found}, requested {expected}"
                    )
                }
            },
            Self::BadOptionValue { key, value } => {
                let value = redact_if_secret(key, value);
                write!(formatter, "invalid value for option {key}: {value}")
            },
            Self::Configuration { message } => formatter.write_str(message),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for ErrorEnvelope {
    fn from(error: ConfigError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let mut envelope = if matches!(error, ConfigError::NoDefinition { .. }) {
            Self::invariant(code, message)
        } else {
            Self::expected(code, message)
        };

        match error {
            ConfigError::UnknownOption { key } | ConfigError::NoDefinition { key } => {
                envelope = envelope.with_metadata("key", key);
            },
            ConfigError::BadOptionType {
                key,
                expected,
                found,
            } => {
                if !key.is_empty() {
                    envelope = envelope.with_metadata("key", key);
                }
                envelope = envelope
                    .with_metadata("expected", expected)
                    .with_metadata("found", found);
            },
            ConfigError::BadOptionValue { key, value } => {
                envelope = envelope
                    .with_metadata("value", redact_if_secret(&key, &value))
                    .with_metadata("key", key);
            },
            ConfigError::Configuration { .. } => {},
        }

        envelope
    }
}
