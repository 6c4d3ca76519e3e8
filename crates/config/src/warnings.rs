//! Warning sink for substitutions made while loading.

use crate::substitution::ConfigSubstitution;
use std::fmt;

/// Receives user-facing warnings about adjusted settings.
///
/// Only consulted when the substitution rule is
/// [`ForwardCompatibilitySubstitutionRule::Enable`](crate::ForwardCompatibilitySubstitutionRule::Enable).
pub trait SubstitutionSink: Send + Sync + fmt::Debug {
    /// A value was replaced by a fallback.
    fn report(&self, substitution: &ConfigSubstitution);

    /// A key was not recognised and was skipped.
    fn unrecognized_key(&self, key: &str);
}

/// Sink that forwards warnings to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl SubstitutionSink for TracingSink {
    fn report(&self, substitution: &ConfigSubstitution) {
        tracing::warn!(
            key = %substitution.key,
            old_value = %substitution.old_value,
            new_value = %substitution.new_value.serialize(),
            "config value substituted"
        );
    }

    fn unrecognized_key(&self, key: &str) {
        tracing::warn!(key = %key, "unrecognized config key skipped");
    }
}

/// Sink that drops every warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl SubstitutionSink for NullSink {
    fn report(&self, _substitution: &ConfigSubstitution) {}

    fn unrecognized_key(&self, _key: &str) {}
}
