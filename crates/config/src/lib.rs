//! # slicer-config
//!
//! Option schema, config stores and preset loaders.
//! This crate depends on `options` and `shared` only.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

/// Map-backed store.
pub mod dynamic;
/// `SLIC3R_*` environment export and overrides.
pub mod env;
/// INI text format.
pub mod ini;
/// JSON preset pipeline.
pub mod json;
/// File access and format detection.
pub mod load;
/// Print preset schema and legacy upgrades.
pub mod print_config;
/// Option definitions.
pub mod schema;
/// The abstract store protocol.
pub mod store;
/// Forward-compatibility substitution policy and records.
pub mod substitution;
/// Substitution warning sinks.
pub mod warnings;

pub use dynamic::DynamicConfig;
pub use env::{
    ENV_PREFIX, EnvOverrideError, apply_env_overrides, config_to_env, env_overrides_from_std_env,
};
pub use json::{JsonLoadOutcome, load_from_json_file, load_from_json_str};
pub use load::{ConfigFormat, detect_config_format};
pub use print_config::{PrintPresetConfig, SupportMaterialStyle, print_config_def};
pub use schema::{ConfigDef, ConfigOptionDef};
pub use store::{ConfigBase, ConfigValue, SetDeserializeItem};
pub use substitution::{
    ConfigSubstitution, ConfigSubstitutionContext, ConfigSubstitutions,
    ForwardCompatibilitySubstitutionRule,
};
pub use warnings::{NullSink, SubstitutionSink, TracingSink};

/// Returns the config crate version.
#[must_use]
pub const fn config_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use slicer_config_options::options_crate_version;
    use slicer_config_shared::shared_crate_version;

    #[test]
    fn config_crate_compiles() {
        let version = config_crate_version();
        assert!(!version.is_empty());
    }

    #[test]
    fn config_can_use_options_and_shared() {
        assert_eq!(options_crate_version(), config_crate_version());
        assert_eq!(shared_crate_version(), config_crate_version());
    }
}
