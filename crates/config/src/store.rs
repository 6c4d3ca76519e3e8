//! The abstract option store and its provided protocol.
//!
//! Implementors supply key lookup and slot creation; everything else
//! (typed access, text assignment under a substitution policy, copying
//! between stores, comparison, percentage resolution and file round trips)
//! is provided on top of those primitives.

use crate::load::{ConfigFormat, detect_config_format};
use crate::schema::ConfigDef;
use crate::substitution::{
    ConfigSubstitution, ConfigSubstitutionContext, ConfigSubstitutions,
    ForwardCompatibilitySubstitutionRule,
};
use crate::{ini, json};
use slicer_config_options::{
    CNumericLocaleGuard, ConfigError, ConfigOption, ConfigOptionBool, ConfigOptionBools, ConfigOptionFloat,
    ConfigOptionFloatOrPercent, ConfigOptionPercent, ConfigOptionType,
    DeserializationResult, DeserializationSubstitution, looks_like_true,
};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Upper bound on `ratio_over` chains followed by `get_abs_value`.
const MAX_RATIO_DEPTH: usize = 16;

/// Plain value accepted by [`ConfigBase::set`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    /// Boolean value.
    Bool(bool),
    /// Integer value, also used for enums.
    Int(i32),
    /// Floating point value.
    Float(f64),
    /// Text parsed with the option's wire grammar.
    Str(String),
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for ConfigValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// One entry of a batch text assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDeserializeItem {
    /// Target key.
    pub key: String,
    /// Wire text.
    pub value: String,
    /// Extend instead of replace.
    pub append: bool,
}

impl SetDeserializeItem {
    /// Replacing assignment.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            append: false,
        }
    }

    /// Appending assignment.
    pub fn appending(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            append: true,
            ..Self::new(key, value)
        }
    }
}

/// Fills the key of a keyless type error raised by a bare option.
pub(crate) fn with_key(error: ConfigError, key: &str) -> ConfigError {
    match error {
        ConfigError::BadOptionType {
            key: empty,
            expected,
            found,
        } if empty.is_empty() => ConfigError::BadOptionType {
            key: key.to_string(),
            expected,
            found,
        },
        other => other,
    }
}

/// Polymorphic key/value option store.
pub trait ConfigBase {
    /// Schema attached to the store, if any.
    fn def(&self) -> Option<Arc<ConfigDef>>;

    /// Stored option for `key`.
    fn optptr(&self, key: &str) -> Option<&dyn ConfigOption>;

    /// Mutable option for `key`.
    ///
    /// With `create` set, a missing slot is instantiated from the schema
    /// default. `Ok(None)` means the key is neither stored nor creatable.
    ///
    /// # Errors
    /// Returns `NoDefinition` when creation needs a schema and none is
    /// attached.
    fn optptr_mut(
        &mut self,
        key: &str,
        create: bool,
    ) -> Result<Option<&mut dyn ConfigOption>, ConfigError>;

    /// Stored keys.
    fn keys(&self) -> Vec<String>;

    /// Rewrites an obsolete key/value pair before it is assigned.
    ///
    /// Setting `key` to an empty string drops the entry. Stores may note
    /// what they saw for [`ConfigBase::handle_legacy_composite`].
    fn handle_legacy(&mut self, key: &mut String, value: &mut String) {
        let _ = (key, value);
    }

    /// Recomputes values derived from several keys; runs once per load.
    ///
    /// # Errors
    /// Implementations report failures assigning derived values.
    fn handle_legacy_composite(&mut self) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Copies `option` into the slot for `key`.
    ///
    /// # Errors
    /// Returns `UnknownOption` when the store cannot hold `key` and
    /// `BadOptionType` when the slot has another type.
    fn adopt_option(&mut self, key: &str, option: &dyn ConfigOption) -> Result<(), ConfigError> {
        let slot = self
            .optptr_mut(key, true)?
            .ok_or_else(|| ConfigError::unknown_option(key))?;
        slot.set(option).map_err(|error| with_key(error, key))
    }

    /// Returns true if `key` is stored.
    fn has(&self, key: &str) -> bool {
        self.optptr(key).is_some()
    }

    /// Typed view of the stored option.
    fn option<T: ConfigOption>(&self, key: &str) -> Option<&T>
    where
        Self: Sized,
    {
        self.optptr(key)?.downcast_ref::<T>()
    }

    /// Typed view of the stored option, falling back to the schema default.
    ///
    /// # Errors
    /// Returns `UnknownOption` when neither a value nor a default exists and
    /// `BadOptionType` when the value is not a `T`.
    fn option_throw<T: ConfigOption + Clone>(&self, key: &str) -> Result<Cow<'_, T>, ConfigError>
    where
        Self: Sized,
    {
        if let Some(stored) = self.optptr(key) {
            return stored
                .downcast_ref::<T>()
                .map(Cow::Borrowed)
                .ok_or_else(|| type_mismatch::<T>(key, stored));
        }
        let default = self
            .def()
            .and_then(|def| def.get(key).and_then(|entry| entry.default_value.clone()))
            .ok_or_else(|| ConfigError::unknown_option(key))?;
        default
            .downcast_ref::<T>()
            .cloned()
            .map(Cow::Owned)
            .ok_or_else(|| type_mismatch::<T>(key, default.as_ref()))
    }

    /// Typed mutable option, created from its default when `create` is set.
    ///
    /// # Errors
    /// Returns `UnknownOption` for keys that are not stored and cannot be
    /// created and `BadOptionType` for a type mismatch.
    fn option_mut<T: ConfigOption>(&mut self, key: &str, create: bool) -> Result<&mut T, ConfigError>
    where
        Self: Sized,
    {
        let slot = self
            .optptr_mut(key, create)?
            .ok_or_else(|| ConfigError::unknown_option(key))?;
        let found = slot.option_type();
        slot.downcast_mut::<T>()
            .ok_or_else(|| ConfigError::bad_option_type(key, std::any::type_name::<T>(), found))
    }

    /// Assigns a plain value to the option at `key`, creating it from the
    /// schema when missing.
    ///
    /// # Errors
    /// Returns `UnknownOption` for keys without a schema entry,
    /// `BadOptionType` when the value kind does not fit the option type and
    /// `BadOptionValue` for unparseable text.
    fn set(&mut self, key: &str, value: impl Into<ConfigValue>) -> Result<(), ConfigError>
    where
        Self: Sized,
    {
        let value = value.into();
        let slot = self
            .optptr_mut(key, true)?
            .ok_or_else(|| ConfigError::unknown_option(key))?;
        assign_value(slot, key, value)
    }

    /// Parses `value` into the option at `key` under the context's policy.
    ///
    /// # Errors
    /// Under `Disable` an unparseable value yields `BadOptionValue`; see
    /// [`ConfigBase::set_deserialize_nothrow`] for the remaining cases.
    fn set_deserialize(
        &mut self,
        key: &str,
        value: &str,
        ctx: &mut ConfigSubstitutionContext,
        append: bool,
    ) -> Result<(), ConfigError> {
        if self.set_deserialize_nothrow(key, value, ctx, append)? {
            Ok(())
        } else {
            Err(ConfigError::bad_option_value(key, value))
        }
    }

    /// Like [`ConfigBase::set_deserialize`], but reports an unparseable
    /// value under `Disable` as `Ok(false)`.
    ///
    /// The legacy hook runs first; unknown keys fail under `Disable` and are
    /// recorded and skipped otherwise.
    ///
    /// # Errors
    /// Returns `NoDefinition` without a schema and `UnknownOption` for
    /// unknown keys under `Disable`.
    fn set_deserialize_nothrow(
        &mut self,
        key: &str,
        value: &str,
        ctx: &mut ConfigSubstitutionContext,
        append: bool,
    ) -> Result<bool, ConfigError> {
        let _locale = CNumericLocaleGuard::new();
        let mut legacy_key = key.to_string();
        let mut legacy_value = value.to_string();
        self.handle_legacy(&mut legacy_key, &mut legacy_value);
        if legacy_key.is_empty() {
            ctx.record_unrecognized(key);
            return Ok(true);
        }
        self.set_deserialize_raw(&legacy_key, &legacy_value, ctx, append)
    }

    /// Text assignment without the legacy hook, for callers that already
    /// ran it.
    ///
    /// # Errors
    /// Same as [`ConfigBase::set_deserialize_nothrow`].
    fn set_deserialize_raw(
        &mut self,
        key: &str,
        value: &str,
        ctx: &mut ConfigSubstitutionContext,
        append: bool,
    ) -> Result<bool, ConfigError> {
        let _locale = CNumericLocaleGuard::new();
        let def = self.def().ok_or_else(|| ConfigError::no_definition(key))?;
        let Some(opt_def) = def.resolve_key(key).and_then(|canonical| def.get(canonical)) else {
            if ctx.rule().substitutes() {
                ctx.record_unrecognized(key);
                return Ok(true);
            }
            return Err(ConfigError::unknown_option(key));
        };

        if !opt_def.shortcut.is_empty() {
            for target in &opt_def.shortcut {
                if !self.set_deserialize_raw(target, value, ctx, append)? {
                    return Ok(false);
                }
            }
            return Ok(true);
        }

        let canonical = opt_def.opt_key.as_str();
        let rule = ctx.rule();
        let slot = self
            .optptr_mut(canonical, true)?
            .ok_or_else(|| ConfigError::unknown_option(canonical))?;

        let loaded = if rule.substitutes() && opt_def.option_type == ConfigOptionType::Bools {
            let fallback = if opt_def
                .get_default::<ConfigOptionBools>()
                .is_some_and(|default| default.get_bool_at(0))
            {
                DeserializationSubstitution::DefaultsToTrue
            } else {
                DeserializationSubstitution::DefaultsToFalse
            };
            match slot.deserialize_with_substitutions(value, append, fallback) {
                DeserializationResult::Loaded => true,
                DeserializationResult::Substituted => {
                    let new_value = slot.clone_box();
                    ctx.push(ConfigSubstitution {
                        key: canonical.to_string(),
                        opt_def: Some(opt_def.clone()),
                        old_value: value.to_string(),
                        new_value,
                    });
                    return Ok(true);
                },
                DeserializationResult::Failed => false,
            }
        } else {
            slot.deserialize(value, append)
        };
        if loaded {
            return Ok(true);
        }
        if !rule.substitutes() {
            return Ok(false);
        }

        let replacement: Box<dyn ConfigOption> = if opt_def.option_type == ConfigOptionType::Bool
        {
            Box::new(ConfigOptionBool::new(looks_like_true(value)))
        } else {
            opt_def.create_default_option()?
        };
        slot.set(replacement.as_ref())
            .map_err(|error| with_key(error, canonical))?;
        ctx.push(ConfigSubstitution {
            key: canonical.to_string(),
            opt_def: Some(opt_def.clone()),
            old_value: value.to_string(),
            new_value: replacement,
        });
        Ok(true)
    }

    /// Applies text assignments in order with one shared context.
    ///
    /// # Errors
    /// Stops at the first failing entry; earlier entries stay applied.
    fn set_deserialize_batch(
        &mut self,
        items: &[SetDeserializeItem],
        ctx: &mut ConfigSubstitutionContext,
    ) -> Result<(), ConfigError> {
        for item in items {
            self.set_deserialize(&item.key, &item.value, ctx, item.append)?;
        }
        Ok(())
    }

    /// Copies every option of `other` into this store.
    ///
    /// # Errors
    /// Returns `UnknownOption` for keys this store cannot hold unless
    /// `ignore_nonexistent` is set.
    fn apply(&mut self, other: &dyn ConfigBase, ignore_nonexistent: bool) -> Result<(), ConfigError> {
        let keys = other.keys();
        self.apply_only(other, &keys, ignore_nonexistent)
    }

    /// Copies the listed options of `other`; keys `other` lacks are skipped.
    ///
    /// # Errors
    /// Same as [`ConfigBase::apply`].
    fn apply_only(
        &mut self,
        other: &dyn ConfigBase,
        keys: &[String],
        ignore_nonexistent: bool,
    ) -> Result<(), ConfigError> {
        for key in keys {
            let Some(source) = other.optptr(key) else {
                continue;
            };
            match self.adopt_option(key, source) {
                Ok(()) => {},
                Err(ConfigError::UnknownOption { .. }) if ignore_nonexistent => {},
                Err(error) => return Err(error),
            }
        }
        Ok(())
    }

    /// Keys of this store whose value differs from `other`.
    ///
    /// Keys missing from `other` are compared against its schema default and
    /// skipped when it has none.
    fn diff(&self, other: &dyn ConfigBase) -> Vec<String> {
        compare_keys(self, other, false)
    }

    /// Keys of this store whose value matches `other`.
    fn equal(&self, other: &dyn ConfigBase) -> Vec<String> {
        compare_keys(self, other, true)
    }

    /// Returns true if both stores hold the same keys with equal values.
    fn equals(&self, other: &dyn ConfigBase) -> bool {
        let keys = self.keys();
        if keys != other.keys() {
            return false;
        }
        keys.iter().all(|key| match (self.optptr(key), other.optptr(key)) {
            (Some(mine), Some(theirs)) => mine.equals(theirs),
            _ => false,
        })
    }

    /// Wire text of the option at `key`, or of its schema default.
    ///
    /// # Errors
    /// Returns `UnknownOption` when neither exists.
    fn opt_serialize(&self, key: &str) -> Result<String, ConfigError> {
        let _locale = CNumericLocaleGuard::new();
        if let Some(option) = self.optptr(key) {
            return Ok(option.serialize());
        }
        self.def()
            .and_then(|def| def.get(key).and_then(|entry| entry.default_value.clone()))
            .map(|default| default.serialize())
            .ok_or_else(|| ConfigError::unknown_option(key))
    }

    /// Stores `option` under `key`.
    ///
    /// # Errors
    /// Same as [`ConfigBase::adopt_option`].
    fn set_key_value(&mut self, key: &str, option: Box<dyn ConfigOption>) -> Result<(), ConfigError> {
        self.adopt_option(key, option.as_ref())
    }

    /// Sets every slot of every stored nullable vector to nil.
    fn null_nullables(&mut self) {
        for key in self.keys() {
            if let Ok(Some(option)) = self.optptr_mut(&key, false)
                && option.is_nullable()
                && let Some(vector) = option.as_vector_mut()
            {
                vector.nullify();
            }
        }
    }

    /// Absolute numeric value of `key`, resolving percentages through the
    /// schema's `ratio_over` chain.
    ///
    /// # Errors
    /// Returns `UnknownOption` for missing keys, `BadOptionType` for
    /// non-numeric options and `Configuration` for percentages without a
    /// ratio source.
    fn get_abs_value(&self, key: &str) -> Result<f64, ConfigError> {
        abs_value_at_depth(self, key, 0)
    }

    /// Absolute numeric value of `key` against an explicit ratio.
    ///
    /// # Errors
    /// Returns `UnknownOption` for missing keys and `BadOptionType` for
    /// non-numeric options.
    fn get_abs_value_with_ratio(&self, key: &str, ratio_over: f64) -> Result<f64, ConfigError> {
        let mut fallback = None;
        let option = lookup(self, key, &mut fallback)?;
        if let Some(percent) = option.downcast_ref::<ConfigOptionPercent>() {
            return Ok(percent.get_abs_value(ratio_over));
        }
        if let Some(mixed) = option.downcast_ref::<ConfigOptionFloatOrPercent>() {
            return Ok(mixed.get_abs_value(ratio_over));
        }
        scalar_number(key, option)
    }

    /// Loads a file, JSON by `.json` extension and INI otherwise.
    ///
    /// # Errors
    /// I/O failures and JSON pipeline failures become `Configuration`;
    /// value failures follow `rule`.
    fn load(
        &mut self,
        path: &Path,
        rule: ForwardCompatibilitySubstitutionRule,
    ) -> Result<ConfigSubstitutions, ConfigError>
    where
        Self: Sized,
    {
        if detect_config_format(path) == ConfigFormat::Ini {
            return self.load_from_ini(path, rule);
        }
        let mut ctx = ConfigSubstitutionContext::new(rule);
        let mut key_values = BTreeMap::new();
        let outcome = json::load_from_json_file(self, path, &mut ctx, false, &mut key_values);
        if outcome.is_ok() {
            Ok(ctx.into_substitutions())
        } else {
            Err(ConfigError::configuration(format!(
                "failed to load {}: {}",
                path.display(),
                outcome.reason()
            )))
        }
    }

    /// Loads an INI file.
    ///
    /// # Errors
    /// See [`ConfigBase::load`].
    fn load_from_ini(
        &mut self,
        path: &Path,
        rule: ForwardCompatibilitySubstitutionRule,
    ) -> Result<ConfigSubstitutions, ConfigError>
    where
        Self: Sized,
    {
        let mut ctx = ConfigSubstitutionContext::new(rule);
        ini::load_from_ini_file(self, path, &mut ctx)?;
        Ok(ctx.into_substitutions())
    }

    /// Loads INI text.
    ///
    /// # Errors
    /// Malformed lines and value failures under `Disable`.
    fn load_from_ini_string(
        &mut self,
        text: &str,
        rule: ForwardCompatibilitySubstitutionRule,
    ) -> Result<ConfigSubstitutions, ConfigError>
    where
        Self: Sized,
    {
        let mut ctx = ConfigSubstitutionContext::new(rule);
        ini::load_from_ini_str(self, text, &mut ctx)?;
        Ok(ctx.into_substitutions())
    }

    /// Loads INI text whose lines are prefixed with `;`, as embedded in
    /// G-code.
    ///
    /// # Errors
    /// See [`ConfigBase::load_from_ini_string`].
    fn load_from_ini_string_commented(
        &mut self,
        text: &str,
        rule: ForwardCompatibilitySubstitutionRule,
    ) -> Result<ConfigSubstitutions, ConfigError>
    where
        Self: Sized,
    {
        self.load_from_ini_string(&ini::uncomment(text), rule)
    }

    /// Applies an already parsed key/value map.
    ///
    /// # Errors
    /// Value failures under `Disable`.
    fn load_string_map(
        &mut self,
        values: &BTreeMap<String, String>,
        rule: ForwardCompatibilitySubstitutionRule,
    ) -> Result<ConfigSubstitutions, ConfigError>
    where
        Self: Sized,
    {
        let mut ctx = ConfigSubstitutionContext::new(rule);
        for (key, value) in values {
            self.set_deserialize(key, value, &mut ctx, false)?;
        }
        self.handle_legacy_composite()?;
        Ok(ctx.into_substitutions())
    }

    /// Writes the store as INI text.
    ///
    /// # Errors
    /// I/O failures become `Configuration`.
    fn save(&self, path: &Path) -> Result<(), ConfigError>
    where
        Self: Sized,
    {
        ini::save(self, path)
    }
}

fn type_mismatch<T: ConfigOption>(key: &str, found: &dyn ConfigOption) -> ConfigError {
    ConfigError::bad_option_type(key, std::any::type_name::<T>(), found.option_type())
}

fn assign_value(
    slot: &mut dyn ConfigOption,
    key: &str,
    value: ConfigValue,
) -> Result<(), ConfigError> {
    let found = slot.option_type();
    let mismatch = |expected: &str| ConfigError::bad_option_type(key, expected, found);
    match value {
        ConfigValue::Bool(flag) => {
            let option = slot
                .downcast_mut::<ConfigOptionBool>()
                .ok_or_else(|| mismatch("bool"))?;
            option.value = flag;
            Ok(())
        },
        ConfigValue::Int(number) => match found {
            ConfigOptionType::Int | ConfigOptionType::Enum | ConfigOptionType::EnumGeneric => {
                slot.set_int(number).map_err(|error| with_key(error, key))
            },
            _ => set_float(slot, f64::from(number)).ok_or_else(|| mismatch("int")),
        },
        ConfigValue::Float(number) => set_float(slot, number).ok_or_else(|| mismatch("float")),
        ConfigValue::Str(text) => {
            if slot.deserialize(&text, false) {
                Ok(())
            } else {
                Err(ConfigError::bad_option_value(key, text))
            }
        },
    }
}

fn set_float(slot: &mut dyn ConfigOption, number: f64) -> Option<()> {
    match slot.option_type() {
        ConfigOptionType::Float => {
            slot.downcast_mut::<ConfigOptionFloat>()?.value = number;
        },
        ConfigOptionType::Percent => {
            slot.downcast_mut::<ConfigOptionPercent>()?.value = number;
        },
        ConfigOptionType::FloatOrPercent => {
            *slot.downcast_mut::<ConfigOptionFloatOrPercent>()? =
                ConfigOptionFloatOrPercent::new(number, false);
        },
        _ => return None,
    }
    Some(())
}

/// Stored option or schema default for `key`; `fallback` keeps the default
/// alive for the returned borrow.
fn lookup<'a, C: ConfigBase + ?Sized>(
    config: &'a C,
    key: &str,
    fallback: &'a mut Option<Arc<dyn ConfigOption>>,
) -> Result<&'a dyn ConfigOption, ConfigError> {
    if let Some(stored) = config.optptr(key) {
        return Ok(stored);
    }
    *fallback = config
        .def()
        .and_then(|def| def.get(key).and_then(|entry| entry.default_value.clone()));
    fallback
        .as_deref()
        .ok_or_else(|| ConfigError::unknown_option(key))
}

fn scalar_number(key: &str, option: &dyn ConfigOption) -> Result<f64, ConfigError> {
    match option.option_type() {
        ConfigOptionType::Float | ConfigOptionType::Int | ConfigOptionType::Bool => {
            option.get_float().map_err(|error| with_key(error, key))
        },
        other => Err(ConfigError::bad_option_type(key, "numeric", other)),
    }
}

fn abs_value_at_depth<C: ConfigBase + ?Sized>(
    config: &C,
    key: &str,
    depth: usize,
) -> Result<f64, ConfigError> {
    if depth > MAX_RATIO_DEPTH {
        return Err(ConfigError::configuration(format!(
            "ratio_over chain of {key} is too deep"
        )));
    }
    let mut fallback = None;
    let option = lookup(config, key, &mut fallback)?;
    let (value, percent) = match option.option_type() {
        ConfigOptionType::Percent => (option.get_float()?, true),
        ConfigOptionType::FloatOrPercent => {
            let mixed = option
                .downcast_ref::<ConfigOptionFloatOrPercent>()
                .ok_or_else(|| type_mismatch::<ConfigOptionFloatOrPercent>(key, option))?;
            if mixed.value == 0.0 && key.ends_with("_line_width") && key != "line_width" {
                return abs_value_at_depth(config, "line_width", depth + 1);
            }
            (mixed.value, mixed.percent)
        },
        _ => return scalar_number(key, option),
    };
    if !percent {
        return Ok(value);
    }
    let ratio_key = config
        .def()
        .and_then(|def| def.get(key).map(|entry| entry.ratio_over.clone()))
        .filter(|ratio_over| !ratio_over.is_empty())
        .ok_or_else(|| {
            ConfigError::configuration(format!(
                "cannot resolve percentage of {key}: no ratio_over"
            ))
        })?;
    let ratio = abs_value_at_depth(config, &ratio_key, depth + 1)?;
    Ok(value / 100.0 * ratio)
}

fn compare_keys<C: ConfigBase + ?Sized>(
    config: &C,
    other: &dyn ConfigBase,
    want_equal: bool,
) -> Vec<String> {
    let other_def = other.def();
    config
        .keys()
        .into_iter()
        .filter(|key| {
            let Some(mine) = config.optptr(key) else {
                return false;
            };
            let fallback = other_def
                .as_ref()
                .and_then(|def| def.get(key).and_then(|entry| entry.default_value.clone()));
            let theirs = other.optptr(key).or(fallback.as_deref());
            theirs.is_some_and(|theirs| mine.equals(theirs) == want_equal)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamic::DynamicConfig;
    use crate::warnings::tests::MemorySink;
    use slicer_config_options::{
        ConfigOptionFloatsNullable, ConfigOptionInt, ConfigOptionIntsNullable, ConfigOptionString,
    };
    use std::error::Error;

    fn def() -> Arc<ConfigDef> {
        let mut def = ConfigDef::new();
        def.add("layer_height", ConfigOptionType::Float)
            .default_value(ConfigOptionFloat::new(0.2));
        def.add("wall_loops", ConfigOptionType::Int)
            .default_value(ConfigOptionInt::new(2));
        def.add("enable_support", ConfigOptionType::Bool);
        def.add("line_width", ConfigOptionType::FloatOrPercent)
            .ratio_over("nozzle_diameter")
            .default_value(ConfigOptionFloatOrPercent::new(0.42, false));
        def.add("outer_wall_line_width", ConfigOptionType::FloatOrPercent)
            .ratio_over("nozzle_diameter");
        def.add("nozzle_diameter", ConfigOptionType::Float)
            .default_value(ConfigOptionFloat::new(0.4));
        def.add("inner_wall_speed", ConfigOptionType::Float)
            .default_value(ConfigOptionFloat::new(60.0));
        def.add("outer_wall_speed", ConfigOptionType::FloatOrPercent)
            .ratio_over("inner_wall_speed");
        def.add("bridge_flow", ConfigOptionType::Percent)
            .ratio_over("bridge_ratio_source");
        def.add("bridge_ratio_source", ConfigOptionType::Percent)
            .ratio_over("bridge_flow");
        def.add("support_filament", ConfigOptionType::Int)
            .shortcut(["support_interface_filament", "support_base_filament"]);
        def.add("support_interface_filament", ConfigOptionType::Int);
        def.add("support_base_filament", ConfigOptionType::Int);
        def.add("initial_layer_print_height", ConfigOptionType::Float)
            .aliases(["first_layer_height"]);
        def.add("post_process", ConfigOptionType::String);
        def.add("filament_flags", ConfigOptionType::Bools);
        def.add_nullable("retract_length_toolchange", ConfigOptionType::Floats);
        def.add_nullable("retract_restart_extra", ConfigOptionType::Ints);
        Arc::new(def)
    }

    fn config() -> DynamicConfig {
        DynamicConfig::with_def(def())
    }

    fn context(rule: ForwardCompatibilitySubstitutionRule) -> ConfigSubstitutionContext {
        ConfigSubstitutionContext::with_sink(rule, Arc::new(MemorySink::default()))
    }

    #[test]
    fn option_throw_falls_back_to_schema_default() -> Result<(), Box<dyn Error>> {
        let mut config = config();
        assert_eq!(config.option_throw::<ConfigOptionFloat>("layer_height")?.value, 0.2);
        config.set("layer_height", 0.3)?;
        assert_eq!(config.option_throw::<ConfigOptionFloat>("layer_height")?.value, 0.3);
        assert!(matches!(
            config.option_throw::<ConfigOptionInt>("layer_height"),
            Err(ConfigError::BadOptionType { .. })
        ));
        assert!(matches!(
            config.option_throw::<ConfigOptionFloat>("retract_length_toolchange"),
            Err(ConfigError::UnknownOption { .. })
        ));
        assert!(config.option::<ConfigOptionFloat>("wall_loops").is_none());
        Ok(())
    }

    #[test]
    fn set_coerces_plain_values() -> Result<(), Box<dyn Error>> {
        let mut config = config();
        config.set("wall_loops", 5)?;
        config.set("layer_height", 1)?;
        config.set("outer_wall_speed", 30.0)?;
        config.set("enable_support", true)?;
        config.set("post_process", "script.sh --flag")?;

        assert_eq!(config.opt_int("wall_loops")?, 5);
        assert_eq!(config.opt_float("layer_height")?, 1.0);
        assert_eq!(config.opt_serialize("outer_wall_speed")?, "30");
        assert!(config.opt_bool("enable_support")?);
        assert_eq!(config.opt_string("post_process")?, "script.sh --flag");

        assert!(matches!(
            config.set("enable_support", 1.5),
            Err(ConfigError::BadOptionType { .. })
        ));
        assert!(matches!(
            config.set("wall_loops", "many"),
            Err(ConfigError::BadOptionValue { .. })
        ));
        assert!(matches!(
            config.set("no_such_key", 1),
            Err(ConfigError::UnknownOption { .. })
        ));
        Ok(())
    }

    #[test]
    fn enable_substitutes_default_and_records() -> Result<(), Box<dyn Error>> {
        let mut config = config();
        let sink = Arc::new(MemorySink::default());
        let mut ctx = ConfigSubstitutionContext::with_sink(
            ForwardCompatibilitySubstitutionRule::Enable,
            sink.clone(),
        );
        config.set_deserialize("wall_loops", "lots", &mut ctx, false)?;

        assert_eq!(config.opt_int("wall_loops")?, 2);
        let substitutions = ctx.substitutions();
        assert_eq!(substitutions.len(), 1);
        let substitution = substitutions
            .first()
            .ok_or_else(|| std::io::Error::other("missing substitution"))?;
        assert_eq!(substitution.key, "wall_loops");
        assert_eq!(substitution.old_value, "lots");
        assert_eq!(substitution.new_value.serialize(), "2");
        assert_eq!(sink.take(), vec!["substituted wall_loops"]);
        Ok(())
    }

    #[test]
    fn disable_fails_on_bad_value_and_unknown_key() -> Result<(), Box<dyn Error>> {
        let mut config = config();
        let mut ctx = context(ForwardCompatibilitySubstitutionRule::Disable);
        config.set("wall_loops", 3)?;
        assert!(matches!(
            config.set_deserialize("wall_loops", "lots", &mut ctx, false),
            Err(ConfigError::BadOptionValue { .. })
        ));
        assert!(!config.set_deserialize_nothrow("wall_loops", "lots", &mut ctx, false)?);
        assert_eq!(config.opt_int("wall_loops")?, 3);
        assert!(matches!(
            config.set_deserialize("mystery", "1", &mut ctx, false),
            Err(ConfigError::UnknownOption { .. })
        ));
        assert!(ctx.is_empty());
        Ok(())
    }

    #[test]
    fn unknown_keys_are_skipped_when_substituting() -> Result<(), Box<dyn Error>> {
        let mut config = config();
        let mut ctx = context(ForwardCompatibilitySubstitutionRule::EnableSilent);
        config.set_deserialize("mystery", "1", &mut ctx, false)?;
        assert!(!config.has("mystery"));
        assert_eq!(ctx.unrecognized_keys(), ["mystery".to_string()]);
        Ok(())
    }

    #[test]
    fn bool_substitution_reads_truthy_text() -> Result<(), Box<dyn Error>> {
        let mut config = config();
        let mut ctx = context(ForwardCompatibilitySubstitutionRule::Enable);
        config.set_deserialize("enable_support", "yes", &mut ctx, false)?;
        assert!(config.opt_bool("enable_support")?);
        config.set_deserialize("filament_flags", "1,maybe,0", &mut ctx, false)?;
        assert_eq!(config.opt_serialize("filament_flags")?, "1,0,0");
        assert_eq!(ctx.substitutions().len(), 2);
        Ok(())
    }

    #[test]
    fn aliases_and_shortcuts_resolve() -> Result<(), Box<dyn Error>> {
        let mut config = config();
        let mut ctx = context(ForwardCompatibilitySubstitutionRule::Disable);
        config.set_deserialize("first_layer_height", "0.3", &mut ctx, false)?;
        assert_eq!(config.opt_float("initial_layer_print_height")?, 0.3);
        assert!(!config.has("first_layer_height"));

        config.set_deserialize("support_filament", "2", &mut ctx, false)?;
        assert_eq!(config.opt_int("support_interface_filament")?, 2);
        assert_eq!(config.opt_int("support_base_filament")?, 2);
        assert!(!config.has("support_filament"));
        Ok(())
    }

    #[test]
    fn batch_applies_in_order() -> Result<(), Box<dyn Error>> {
        let mut config = config();
        let mut ctx = context(ForwardCompatibilitySubstitutionRule::Disable);
        config.set_deserialize_batch(
            &[
                SetDeserializeItem::new("post_process", "a"),
                SetDeserializeItem::appending("post_process", "b"),
                SetDeserializeItem::new("wall_loops", "1"),
                SetDeserializeItem::new("wall_loops", "4"),
            ],
            &mut ctx,
        )?;
        assert_eq!(config.opt_string("post_process")?, "ab");
        assert_eq!(config.opt_int("wall_loops")?, 4);
        Ok(())
    }

    #[test]
    fn apply_respects_ignore_nonexistent() -> Result<(), Box<dyn Error>> {
        let mut source = DynamicConfig::new();
        source.set_key_value("wall_loops", Box::new(ConfigOptionInt::new(9)))?;
        source.set_key_value("mystery", Box::new(ConfigOptionString::new("x")))?;

        let mut target = config();
        assert!(matches!(
            target.apply(&source, false),
            Err(ConfigError::UnknownOption { .. })
        ));
        target.apply(&source, true)?;
        assert_eq!(target.opt_int("wall_loops")?, 9);
        assert!(!target.has("mystery"));

        let mut partial = config();
        partial.apply_only(&source, &["wall_loops".to_string(), "absent".to_string()], false)?;
        assert_eq!(partial.keys(), vec!["wall_loops"]);
        Ok(())
    }

    #[test]
    fn diff_and_equal_compare_against_defaults() -> Result<(), Box<dyn Error>> {
        let mut left = config();
        left.set("layer_height", 0.2)?;
        left.set("wall_loops", 3)?;
        let mut right = config();
        right.set("wall_loops", 4)?;

        assert_eq!(left.diff(&right), vec!["wall_loops"]);
        assert_eq!(left.equal(&right), vec!["layer_height"]);
        assert!(!left.equals(&right));

        right.set("layer_height", 0.2)?;
        right.set("wall_loops", 3)?;
        assert!(left.equals(&right));
        assert!(left.diff(&right).is_empty());
        Ok(())
    }

    #[test]
    fn abs_values_follow_ratio_over() -> Result<(), Box<dyn Error>> {
        let mut config = config();
        config.set("outer_wall_speed", "50%")?;
        assert_eq!(config.get_abs_value("outer_wall_speed")?, 30.0);
        assert_eq!(config.get_abs_value_with_ratio("outer_wall_speed", 200.0)?, 100.0);
        assert_eq!(config.get_abs_value("layer_height")?, 0.2);
        assert_eq!(config.get_abs_value_with_ratio("layer_height", 500.0)?, 0.2);

        config.set("line_width", "150%")?;
        config.set("outer_wall_line_width", "0")?;
        assert!((config.get_abs_value("outer_wall_line_width")? - 0.6).abs() < 1e-9);

        config.set("bridge_flow", "50%")?;
        config.set("bridge_ratio_source", "50%")?;
        assert!(matches!(
            config.get_abs_value("bridge_flow"),
            Err(ConfigError::Configuration { .. })
        ));
        assert!(matches!(
            config.get_abs_value("post_process"),
            Err(ConfigError::BadOptionType { .. })
        ));
        Ok(())
    }

    #[test]
    fn null_nullables_clears_nullable_vectors() -> Result<(), Box<dyn Error>> {
        let mut config = config();
        let mut ctx = context(ForwardCompatibilitySubstitutionRule::Disable);
        config.set_deserialize("retract_length_toolchange", "1,nil,3", &mut ctx, false)?;
        config.set_deserialize("retract_restart_extra", "0,0", &mut ctx, false)?;
        let floats = config
            .option::<ConfigOptionFloatsNullable>("retract_length_toolchange")
            .ok_or_else(|| std::io::Error::other("missing floats"))?;
        assert!(!floats.is_nil());
        assert_eq!(floats.as_vector().map(|vector| vector.is_nil_at(1)), Some(true));

        config.null_nullables();
        assert_eq!(config.opt_serialize("retract_length_toolchange")?, "nil,nil,nil");
        let ints = config
            .option::<ConfigOptionIntsNullable>("retract_restart_extra")
            .ok_or_else(|| std::io::Error::other("missing ints"))?;
        assert!(ints.is_nil());
        Ok(())
    }
}
