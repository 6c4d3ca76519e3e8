//! Symbolic enumeration options.

use crate::errors::ConfigError;
use crate::option::ConfigOption;
use crate::option_boilerplate;
use crate::types::ConfigOptionType;
use std::fmt;
use std::sync::Arc;

/// Bidirectional name/value table of an enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnumKeysMap {
    entries: Vec<(String, i32)>,
}

impl EnumKeysMap {
    /// Builds a table from `(name, value)` pairs in declaration order.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, i32)>,
        S: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        }
    }

    /// Builds the table for a Rust enum.
    #[must_use]
    pub fn from_enum<T: ConfigEnum>() -> Self {
        Self::new(T::ENTRIES.iter().map(|&(name, value)| (name, value.to_int())))
    }

    /// Value registered for `name`.
    #[must_use]
    pub fn value_of(&self, name: &str) -> Option<i32> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|&(_, value)| value)
    }

    /// Name registered for `value`.
    #[must_use]
    pub fn name_of(&self, value: i32) -> Option<&str> {
        self.entries
            .iter()
            .find(|&&(_, entry)| entry == value)
            .map(|(name, _)| name.as_str())
    }

    /// Names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }
}

/// A Rust enum usable as a typed enumeration option.
pub trait ConfigEnum: Copy + PartialEq + fmt::Debug + Default + Send + Sync + 'static {
    /// Names and variants in declaration order.
    const ENTRIES: &'static [(&'static str, Self)];

    /// Integer value of the variant.
    fn to_int(self) -> i32;

    /// Variant for `name`.
    fn from_name(name: &str) -> Option<Self> {
        Self::ENTRIES
            .iter()
            .find(|(entry, _)| *entry == name)
            .map(|&(_, value)| value)
    }

    /// Variant for an integer value.
    fn from_int(value: i32) -> Option<Self> {
        Self::ENTRIES
            .iter()
            .find(|(_, entry)| entry.to_int() == value)
            .map(|&(_, entry)| entry)
    }

    /// Name of the variant.
    fn name(self) -> Option<&'static str> {
        Self::ENTRIES
            .iter()
            .find(|(_, entry)| *entry == self)
            .map(|&(name, _)| name)
    }
}

/// Enumeration option bound to a Rust enum.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConfigOptionEnum<T: ConfigEnum> {
    /// Current variant.
    pub value: T,
}

impl<T: ConfigEnum> ConfigOptionEnum<T> {
    /// Creates the option.
    #[must_use]
    pub const fn new(value: T) -> Self {
        Self { value }
    }

    /// Factory used by schema entries declared with a Rust enum.
    #[must_use]
    pub fn create(value: i32) -> Box<dyn ConfigOption> {
        Box::new(Self::new(T::from_int(value).unwrap_or_default()))
    }
}

impl<T: ConfigEnum> ConfigOption for ConfigOptionEnum<T> {
    option_boilerplate!();

    fn option_type(&self) -> ConfigOptionType {
        ConfigOptionType::Enum
    }

    fn serialize(&self) -> String {
        self.value.name().unwrap_or_default().to_string()
    }

    fn deserialize(&mut self, input: &str, append: bool) -> bool {
        if append {
            return false;
        }
        match T::from_name(input.trim()) {
            Some(value) => {
                self.value = value;
                true
            },
            None => false,
        }
    }

    fn get_int(&self) -> Result<i32, ConfigError> {
        Ok(self.value.to_int())
    }

    fn set_int(&mut self, value: i32) -> Result<(), ConfigError> {
        match T::from_int(value) {
            Some(variant) => {
                self.value = variant;
                Ok(())
            },
            None => Err(ConfigError::configuration(format!(
                "{value} is not a valid enum value"
            ))),
        }
    }
}

/// Enumeration option carrying a raw integer and its name table.
#[derive(Clone)]
pub struct ConfigOptionEnumGeneric {
    /// Current integer value.
    pub value: i32,
    keys_map: Arc<EnumKeysMap>,
}

impl ConfigOptionEnumGeneric {
    /// Creates the option with a shared name table.
    #[must_use]
    pub const fn new(value: i32, keys_map: Arc<EnumKeysMap>) -> Self {
        Self { value, keys_map }
    }

    /// Name table backing the option.
    #[must_use]
    pub fn keys_map(&self) -> &EnumKeysMap {
        &self.keys_map
    }
}

impl fmt::Debug for ConfigOptionEnumGeneric {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ConfigOptionEnumGeneric")
            .field("value", &self.value)
            .field("name", &self.keys_map.name_of(self.value))
            .finish()
    }
}

impl PartialEq for ConfigOptionEnumGeneric {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl ConfigOption for ConfigOptionEnumGeneric {
    option_boilerplate!();

    fn option_type(&self) -> ConfigOptionType {
        ConfigOptionType::EnumGeneric
    }

    fn serialize(&self) -> String {
        self.keys_map
            .name_of(self.value)
            .unwrap_or_default()
            .to_string()
    }

    fn deserialize(&mut self, input: &str, append: bool) -> bool {
        if append {
            return false;
        }
        match self.keys_map.value_of(input.trim()) {
            Some(value) => {
                self.value = value;
                true
            },
            None => false,
        }
    }

    fn get_int(&self) -> Result<i32, ConfigError> {
        Ok(self.value)
    }

    fn set_int(&mut self, value: i32) -> Result<(), ConfigError> {
        if self.keys_map.name_of(value).is_none() {
            return Err(ConfigError::configuration(format!(
                "{value} is not a valid enum value"
            )));
        }
        self.value = value;
        Ok(())
    }
}
