//! Map-backed option store.

use crate::schema::ConfigDef;
use crate::store::{ConfigBase, with_key};
use slicer_config_options::{
    ConfigError, ConfigOption, ConfigOptionBool, ConfigOptionString, ConfigOptionType,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Store holding exactly the keys that were set, optionally checked against
/// a schema.
#[derive(Debug, Clone, Default)]
pub struct DynamicConfig {
    def: Option<Arc<ConfigDef>>,
    options: BTreeMap<String, Box<dyn ConfigOption>>,
}

impl DynamicConfig {
    /// Empty store without schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store bound to `def`.
    #[must_use]
    pub fn with_def(def: Arc<ConfigDef>) -> Self {
        Self {
            def: Some(def),
            options: BTreeMap::new(),
        }
    }

    /// Store holding the default of every schema key that has one.
    ///
    /// # Errors
    /// Propagates option construction failures.
    pub fn defaults(def: Arc<ConfigDef>) -> Result<Self, ConfigError> {
        let mut options = BTreeMap::new();
        for (key, entry) in def.iter() {
            if entry.default_value.is_some() {
                options.insert(key.to_string(), entry.create_default_option()?);
            }
        }
        Ok(Self {
            def: Some(def),
            options,
        })
    }

    /// Moves the contents out, leaving this store empty and schema-less.
    #[must_use]
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Removes `key`; returns true if it was stored.
    pub fn erase(&mut self, key: &str) -> bool {
        self.options.remove(key).is_some()
    }

    /// Removes every option, keeping the schema.
    pub fn clear(&mut self) {
        self.options.clear();
    }

    /// Returns true if no option is stored.
    #[must_use]
    pub fn empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Number of stored options.
    #[must_use]
    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// Returns true if no option is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Stored options in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &dyn ConfigOption)> {
        self.options
            .iter()
            .map(|(key, option)| (key.as_str(), option.as_ref()))
    }

    /// Typed view of a stored option.
    #[must_use]
    pub fn opt<T: ConfigOption>(&self, key: &str) -> Option<&T> {
        self.options.get(key)?.downcast_ref::<T>()
    }

    /// Typed mutable option, created from its default when `create` is set.
    ///
    /// # Errors
    /// See [`ConfigBase::option_mut`].
    pub fn opt_mut<T: ConfigOption>(&mut self, key: &str, create: bool) -> Result<&mut T, ConfigError> {
        self.option_mut::<T>(key, create)
    }

    /// Integer value of an int or enum option.
    ///
    /// # Errors
    /// Returns `UnknownOption` for missing keys and `BadOptionType` for other
    /// types.
    pub fn opt_int(&self, key: &str) -> Result<i32, ConfigError> {
        self.stored(key)?
            .get_int()
            .map_err(|error| with_key(error, key))
    }

    /// Float value of a numeric option.
    ///
    /// # Errors
    /// Same as [`DynamicConfig::opt_int`].
    pub fn opt_float(&self, key: &str) -> Result<f64, ConfigError> {
        self.stored(key)?
            .get_float()
            .map_err(|error| with_key(error, key))
    }

    /// Value of a bool option.
    ///
    /// # Errors
    /// Same as [`DynamicConfig::opt_int`].
    pub fn opt_bool(&self, key: &str) -> Result<bool, ConfigError> {
        let option = self.stored(key)?;
        option
            .downcast_ref::<ConfigOptionBool>()
            .map(|option| option.value)
            .ok_or_else(|| ConfigError::bad_option_type(key, ConfigOptionType::Bool, option.option_type()))
    }

    /// Value of a string option.
    ///
    /// # Errors
    /// Same as [`DynamicConfig::opt_int`].
    pub fn opt_string(&self, key: &str) -> Result<&str, ConfigError> {
        let option = self.stored(key)?;
        option
            .downcast_ref::<ConfigOptionString>()
            .map(|option| option.value.as_str())
            .ok_or_else(|| {
                ConfigError::bad_option_type(key, ConfigOptionType::String, option.option_type())
            })
    }

    fn stored(&self, key: &str) -> Result<&dyn ConfigOption, ConfigError> {
        self.optptr(key)
            .ok_or_else(|| ConfigError::unknown_option(key))
    }
}

impl ConfigBase for DynamicConfig {
    fn def(&self) -> Option<Arc<ConfigDef>> {
        self.def.clone()
    }

    fn optptr(&self, key: &str) -> Option<&dyn ConfigOption> {
        self.options.get(key).map(AsRef::as_ref)
    }

    fn optptr_mut(
        &mut self,
        key: &str,
        create: bool,
    ) -> Result<Option<&mut dyn ConfigOption>, ConfigError> {
        if !self.options.contains_key(key) {
            if !create {
                return Ok(None);
            }
            let def = self
                .def
                .as_ref()
                .ok_or_else(|| ConfigError::no_definition(key))?;
            let Some(entry) = def.get(key) else {
                return Ok(None);
            };
            let option = entry.create_default_option()?;
            self.options.insert(key.to_string(), option);
        }
        Ok(self.options.get_mut(key).map(AsMut::as_mut))
    }

    fn keys(&self) -> Vec<String> {
        self.options.keys().cloned().collect()
    }

    fn adopt_option(&mut self, key: &str, option: &dyn ConfigOption) -> Result<(), ConfigError> {
        if let Some(slot) = self.options.get_mut(key) {
            return slot.set(option).map_err(|error| with_key(error, key));
        }
        let Some(def) = &self.def else {
            self.options.insert(key.to_string(), option.clone_box());
            return Ok(());
        };
        let entry = def.get(key).ok_or_else(|| ConfigError::unknown_option(key))?;
        if entry.option_type != option.option_type() {
            return Err(ConfigError::bad_option_type(
                key,
                entry.option_type,
                option.option_type(),
            ));
        }
        self.options.insert(key.to_string(), option.clone_box());
        Ok(())
    }

    fn set_key_value(&mut self, key: &str, option: Box<dyn ConfigOption>) -> Result<(), ConfigError> {
        if let Some(entry) = self.def.as_ref().and_then(|def| def.get(key))
            && entry.option_type != option.option_type()
        {
            return Err(ConfigError::bad_option_type(
                key,
                entry.option_type,
                option.option_type(),
            ));
        }
        self.options.insert(key.to_string(), option);
        Ok(())
    }
}

impl PartialEq for DynamicConfig {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slicer_config_options::{ConfigOptionFloat, ConfigOptionInt, ConfigOptionStrings};
    use std::error::Error;

    fn def() -> Arc<ConfigDef> {
        let mut def = ConfigDef::new();
        def.add("layer_height", ConfigOptionType::Float)
            .default_value(ConfigOptionFloat::new(0.2));
        def.add("wall_loops", ConfigOptionType::Int)
            .default_value(ConfigOptionInt::new(2));
        def.add("enable_support", ConfigOptionType::Bool);
        def.add("inherits", ConfigOptionType::String);
        def.add("filament_type", ConfigOptionType::Strings);
        Arc::new(def)
    }

    #[test]
    fn keys_are_exactly_the_stored_ones() -> Result<(), Box<dyn Error>> {
        let mut config = DynamicConfig::with_def(def());
        assert!(config.keys().is_empty());
        config.set("wall_loops", 3)?;
        config.set("layer_height", 0.1)?;
        assert_eq!(config.keys(), vec!["layer_height", "wall_loops"]);
        assert_eq!(config.opt_int("wall_loops")?, 3);
        assert!(config.erase("wall_loops"));
        assert!(!config.erase("wall_loops"));
        assert!(!config.has("wall_loops"));
        Ok(())
    }

    #[test]
    fn clone_is_independent() -> Result<(), Box<dyn Error>> {
        let mut original = DynamicConfig::with_def(def());
        original.set("filament_type", "PLA;PETG")?;
        let mut copy = original.clone();
        copy.set("filament_type", "ABS")?;

        assert_eq!(original.opt_serialize("filament_type")?, "PLA;PETG");
        assert_eq!(copy.opt_serialize("filament_type")?, "ABS");
        assert_ne!(original, copy);
        Ok(())
    }

    #[test]
    fn take_leaves_source_empty() -> Result<(), Box<dyn Error>> {
        let mut source = DynamicConfig::with_def(def());
        source.set("enable_support", true)?;
        let moved = source.take();

        assert!(source.empty());
        assert!(source.def().is_none());
        assert!(moved.opt_bool("enable_support")?);
        Ok(())
    }

    #[test]
    fn defaults_materialize_every_key() -> Result<(), Box<dyn Error>> {
        let config = DynamicConfig::defaults(def())?;
        assert_eq!(config.len(), 5);
        assert_eq!(config.opt_float("layer_height")?, 0.2);
        assert_eq!(config.opt_string("inherits")?, "");
        assert!(matches!(
            config.opt_string("layer_height"),
            Err(ConfigError::BadOptionType { .. })
        ));
        assert!(matches!(
            config.opt_int("missing"),
            Err(ConfigError::UnknownOption { .. })
        ));
        Ok(())
    }

    #[test]
    fn schemaless_store_adopts_any_option() -> Result<(), Box<dyn Error>> {
        let mut source = DynamicConfig::with_def(def());
        source.set("wall_loops", 4)?;
        source.set("filament_type", "PLA")?;

        let mut target = DynamicConfig::new();
        target.apply(&source, false)?;
        assert_eq!(target.keys(), source.keys());
        assert!(target.equals(&source));

        let typed = target
            .opt::<ConfigOptionStrings>("filament_type")
            .ok_or_else(|| std::io::Error::other("missing filament_type"))?;
        assert_eq!(typed.values, vec!["PLA"]);
        Ok(())
    }

    #[test]
    fn set_key_value_checks_schema_type() -> Result<(), Box<dyn Error>> {
        let mut config = DynamicConfig::with_def(def());
        config.set_key_value("wall_loops", Box::new(ConfigOptionInt::new(7)))?;
        assert_eq!(config.opt_int("wall_loops")?, 7);
        assert!(matches!(
            config.set_key_value("wall_loops", Box::new(ConfigOptionFloat::new(1.0))),
            Err(ConfigError::BadOptionType { .. })
        ));
        Ok(())
    }

    #[test]
    fn creating_without_schema_fails() {
        let mut config = DynamicConfig::new();
        assert!(matches!(
            config.set("wall_loops", 1),
            Err(ConfigError::NoDefinition { .. })
        ));
        assert!(matches!(config.optptr_mut("wall_loops", false), Ok(None)));
    }

    #[test]
    fn opt_mut_creates_from_default() -> Result<(), Box<dyn Error>> {
        let mut config = DynamicConfig::with_def(def());
        let layer_height = config.opt_mut::<ConfigOptionFloat>("layer_height", true)?;
        assert_eq!(layer_height.value, 0.2);
        layer_height.value = 0.28;
        assert_eq!(config.opt_float("layer_height")?, 0.28);
        assert!(config.opt_mut::<ConfigOptionInt>("layer_height", false).is_err());
        Ok(())
    }
}
