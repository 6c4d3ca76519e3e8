//! Single-valued options.

use crate::escape::{escape_string_cstyle, unescape_string_cstyle};
use crate::errors::ConfigError;
use crate::locales::{float_to_string_decimal_point, parse_full_float};
use crate::option::ConfigOption;
use crate::option_boilerplate;
use crate::types::{ConfigOptionType, DeserializationResult, DeserializationSubstitution};

pub(crate) fn parse_bool(input: &str) -> Option<bool> {
    match input.trim() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

/// Heuristic used when a boolean fails to parse and must be substituted.
#[must_use]
pub fn looks_like_true(input: &str) -> bool {
    matches!(
        input.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

/// Strips surrounding whitespace and one trailing `%`.
pub(crate) fn strip_percent(input: &str) -> (&str, bool) {
    let trimmed = input.trim();
    trimmed
        .strip_suffix('%')
        .map_or((trimmed, false), |number| (number.trim_end(), true))
}

/// A single `f64`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConfigOptionFloat {
    /// Current value.
    pub value: f64,
}

impl ConfigOptionFloat {
    /// Creates the option.
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Self { value }
    }
}

impl ConfigOption for ConfigOptionFloat {
    option_boilerplate!();

    fn option_type(&self) -> ConfigOptionType {
        ConfigOptionType::Float
    }

    fn serialize(&self) -> String {
        float_to_string_decimal_point(self.value, None)
    }

    fn deserialize(&mut self, input: &str, append: bool) -> bool {
        if append {
            return false;
        }
        match parse_full_float(input) {
            Some(value) => {
                self.value = value;
                true
            },
            None => false,
        }
    }

    fn get_float(&self) -> Result<f64, ConfigError> {
        Ok(self.value)
    }
}

/// A single `i32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfigOptionInt {
    /// Current value.
    pub value: i32,
}

impl ConfigOptionInt {
    /// Creates the option.
    #[must_use]
    pub const fn new(value: i32) -> Self {
        Self { value }
    }
}

impl ConfigOption for ConfigOptionInt {
    option_boilerplate!();

    fn option_type(&self) -> ConfigOptionType {
        ConfigOptionType::Int
    }

    fn serialize(&self) -> String {
        self.value.to_string()
    }

    fn deserialize(&mut self, input: &str, append: bool) -> bool {
        if append {
            return false;
        }
        match input.trim().parse::<i32>() {
            Ok(value) => {
                self.value = value;
                true
            },
            Err(_) => false,
        }
    }

    fn get_int(&self) -> Result<i32, ConfigError> {
        Ok(self.value)
    }

    fn get_float(&self) -> Result<f64, ConfigError> {
        Ok(f64::from(self.value))
    }

    fn set_int(&mut self, value: i32) -> Result<(), ConfigError> {
        self.value = value;
        Ok(())
    }
}

/// A single boolean, serialized as `1`/`0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfigOptionBool {
    /// Current value.
    pub value: bool,
}

impl ConfigOptionBool {
    /// Creates the option.
    #[must_use]
    pub const fn new(value: bool) -> Self {
        Self { value }
    }
}

impl ConfigOption for ConfigOptionBool {
    option_boilerplate!();

    fn option_type(&self) -> ConfigOptionType {
        ConfigOptionType::Bool
    }

    fn serialize(&self) -> String {
        if self.value { "1" } else { "0" }.to_string()
    }

    fn deserialize(&mut self, input: &str, append: bool) -> bool {
        if append {
            return false;
        }
        match parse_bool(input) {
            Some(value) => {
                self.value = value;
                true
            },
            None => false,
        }
    }

    fn deserialize_with_substitutions(
        &mut self,
        input: &str,
        append: bool,
        substitution: DeserializationSubstitution,
    ) -> DeserializationResult {
        if self.deserialize(input, append) {
            return DeserializationResult::Loaded;
        }
        match substitution {
            DeserializationSubstitution::Disabled => DeserializationResult::Failed,
            DeserializationSubstitution::DefaultsToFalse => {
                self.value = false;
                DeserializationResult::Substituted
            },
            DeserializationSubstitution::DefaultsToTrue => {
                self.value = true;
                DeserializationResult::Substituted
            },
        }
    }

    fn get_int(&self) -> Result<i32, ConfigError> {
        Ok(i32::from(self.value))
    }

    fn get_float(&self) -> Result<f64, ConfigError> {
        Ok(if self.value { 1.0 } else { 0.0 })
    }

    fn get_bool(&self) -> Result<bool, ConfigError> {
        Ok(self.value)
    }
}

/// A single string, serialized with C-style escapes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigOptionString {
    /// Current value.
    pub value: String,
}

impl ConfigOptionString {
    /// Creates the option.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl ConfigOption for ConfigOptionString {
    option_boilerplate!();

    fn option_type(&self) -> ConfigOptionType {
        ConfigOptionType::String
    }

    fn serialize(&self) -> String {
        escape_string_cstyle(&self.value)
    }

    fn deserialize(&mut self, input: &str, append: bool) -> bool {
        let Some(value) = unescape_string_cstyle(input) else {
            return false;
        };
        if append {
            self.value.push_str(&value);
        } else {
            self.value = value;
        }
        true
    }
}

/// A percentage stored as its number (`50` for `50%`).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConfigOptionPercent {
    /// Percentage value.
    pub value: f64,
}

impl ConfigOptionPercent {
    /// Creates the option.
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Self { value }
    }

    /// Resolves the percentage against `ratio_over`.
    #[must_use]
    pub fn get_abs_value(&self, ratio_over: f64) -> f64 {
        ratio_over * self.value / 100.0
    }
}

impl ConfigOption for ConfigOptionPercent {
    option_boilerplate!();

    fn option_type(&self) -> ConfigOptionType {
        ConfigOptionType::Percent
    }

    fn serialize(&self) -> String {
        format!("{}%", float_to_string_decimal_point(self.value, None))
    }

    fn deserialize(&mut self, input: &str, append: bool) -> bool {
        if append {
            return false;
        }
        match parse_full_float(strip_percent(input).0) {
            Some(value) => {
                self.value = value;
                true
            },
            None => false,
        }
    }

    fn get_float(&self) -> Result<f64, ConfigError> {
        Ok(self.value)
    }
}

/// An absolute value or a percentage of some other value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConfigOptionFloatOrPercent {
    /// Numeric value.
    pub value: f64,
    /// Whether `value` is a percentage.
    pub percent: bool,
}

impl ConfigOptionFloatOrPercent {
    /// Creates the option.
    #[must_use]
    pub const fn new(value: f64, percent: bool) -> Self {
        Self { value, percent }
    }

    /// Resolves the value, scaling by `ratio_over` when it is a percentage.
    #[must_use]
    pub fn get_abs_value(&self, ratio_over: f64) -> f64 {
        if self.percent {
            ratio_over * self.value / 100.0
        } else {
            self.value
        }
    }
}

impl ConfigOption for ConfigOptionFloatOrPercent {
    option_boilerplate!();

    fn option_type(&self) -> ConfigOptionType {
        ConfigOptionType::FloatOrPercent
    }

    fn serialize(&self) -> String {
        let mut text = float_to_string_decimal_point(self.value, None);
        if self.percent {
            text.push('%');
        }
        text
    }

    fn deserialize(&mut self, input: &str, append: bool) -> bool {
        if append {
            return false;
        }
        let (number, percent) = strip_percent(input);
        match parse_full_float(number) {
            Some(value) => {
                self.value = value;
                self.percent = percent;
                true
            },
            None => false,
        }
    }

    fn get_float(&self) -> Result<f64, ConfigError> {
        Ok(self.value)
    }
}
