//! Option schema: per-key definitions and the registry holding them.
//!
//! A [`ConfigDef`] is built once and then shared read-only (behind an `Arc`)
//! by every store that uses it. Several schemas may coexist.

use slicer_config_options::{
    ConfigEnum, ConfigError, ConfigOption, ConfigOptionBool, ConfigOptionBools,
    ConfigOptionBoolsNullable, ConfigOptionEnum, ConfigOptionEnumGeneric, ConfigOptionFloat,
    ConfigOptionFloatOrPercent, ConfigOptionFloats, ConfigOptionFloatsNullable,
    ConfigOptionFloatsOrPercents, ConfigOptionFloatsOrPercentsNullable, ConfigOptionInt,
    ConfigOptionInts, ConfigOptionIntsNullable, ConfigOptionPercent, ConfigOptionPercents,
    ConfigOptionPercentsNullable, ConfigOptionPoint, ConfigOptionPoint3, ConfigOptionPoints,
    ConfigOptionString, ConfigOptionStrings, ConfigOptionType, EnumKeysMap,
};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;

/// `cli` value that hides an option from the command line.
pub const NO_CLI: &str = "!";

/// Builds a typed enum option from its integer value.
pub type EnumFactory = fn(i32) -> Box<dyn ConfigOption>;

/// One schema entry.
#[derive(Debug, Clone)]
pub struct ConfigOptionDef {
    /// Key the entry is registered under.
    pub opt_key: String,
    /// Runtime type of values stored under the key.
    pub option_type: ConfigOptionType,
    /// Whether vector slots may hold nil.
    pub nullable: bool,
    /// Default value, absent for nullable options.
    pub default_value: Option<Arc<dyn ConfigOption>>,
    /// Short GUI label.
    pub label: String,
    /// Label including the category prefix.
    pub full_label: String,
    /// Settings page category.
    pub category: String,
    /// Help text.
    pub tooltip: String,
    /// Unit shown after the field.
    pub sidetext: String,
    /// Explicit CLI spelling: empty derives it from the key, [`NO_CLI`] hides it.
    pub cli: String,
    /// Key of the option a percentage value is relative to.
    pub ratio_over: String,
    /// Alternative keys accepted when loading.
    pub aliases: Vec<String>,
    /// Keys a value assigned to this key fans out to.
    pub shortcut: Vec<String>,
    /// Lower bound for numeric values.
    pub min: f64,
    /// Upper bound for numeric values.
    pub max: f64,
    /// Not editable from the GUI.
    pub readonly: bool,
    /// Symbolic names accepted by enum options.
    pub enum_values: Vec<String>,
    /// Human labels matching `enum_values`.
    pub enum_labels: Vec<String>,
    /// Name/value table for enum options.
    pub enum_keys_map: Option<Arc<EnumKeysMap>>,
    /// Constructor for typed enum options.
    pub enum_factory: Option<EnumFactory>,
}

impl ConfigOptionDef {
    /// Creates an entry without default value.
    pub fn new(opt_key: impl Into<String>, option_type: ConfigOptionType) -> Self {
        Self {
            opt_key: opt_key.into(),
            option_type,
            nullable: false,
            default_value: None,
            label: String::new(),
            full_label: String::new(),
            category: String::new(),
            tooltip: String::new(),
            sidetext: String::new(),
            cli: String::new(),
            ratio_over: String::new(),
            aliases: Vec::new(),
            shortcut: Vec::new(),
            min: f64::MIN,
            max: f64::MAX,
            readonly: false,
            enum_values: Vec::new(),
            enum_labels: Vec::new(),
            enum_keys_map: None,
            enum_factory: None,
        }
    }

    /// Sets the GUI label.
    pub fn label(&mut self, label: impl Into<String>) -> &mut Self {
        self.label = label.into();
        self
    }

    /// Sets the full label.
    pub fn full_label(&mut self, full_label: impl Into<String>) -> &mut Self {
        self.full_label = full_label.into();
        self
    }

    /// Sets the category.
    pub fn category(&mut self, category: impl Into<String>) -> &mut Self {
        self.category = category.into();
        self
    }

    /// Sets the tooltip.
    pub fn tooltip(&mut self, tooltip: impl Into<String>) -> &mut Self {
        self.tooltip = tooltip.into();
        self
    }

    /// Sets the unit text.
    pub fn sidetext(&mut self, sidetext: impl Into<String>) -> &mut Self {
        self.sidetext = sidetext.into();
        self
    }

    /// Sets the explicit CLI spelling.
    pub fn cli(&mut self, cli: impl Into<String>) -> &mut Self {
        self.cli = cli.into();
        self
    }

    /// Sets the key percentages are resolved against.
    pub fn ratio_over(&mut self, ratio_over: impl Into<String>) -> &mut Self {
        self.ratio_over = ratio_over.into();
        self
    }

    /// Adds alternative keys.
    pub fn aliases<I, S>(&mut self, aliases: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Adds fan-out keys.
    pub fn shortcut<I, S>(&mut self, shortcut: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shortcut.extend(shortcut.into_iter().map(Into::into));
        self
    }

    /// Sets the lower bound.
    pub const fn min(&mut self, min: f64) -> &mut Self {
        self.min = min;
        self
    }

    /// Sets the upper bound.
    pub const fn max(&mut self, max: f64) -> &mut Self {
        self.max = max;
        self
    }

    /// Marks the option read-only.
    pub const fn readonly(&mut self) -> &mut Self {
        self.readonly = true;
        self
    }

    /// Attaches human labels for enum values.
    pub fn enum_labels<I, S>(&mut self, labels: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the default value.
    pub fn default_value<T: ConfigOption>(&mut self, value: T) -> &mut Self {
        self.default_value = Some(Arc::new(value));
        self
    }

    /// Typed view of the default value.
    #[must_use]
    pub fn get_default<T: ConfigOption>(&self) -> Option<&T> {
        self.default_value
            .as_deref()
            .and_then(|value| value.as_any().downcast_ref::<T>())
    }

    /// Returns true for non-vector types.
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        !self.option_type.is_vector()
    }

    /// Instantiates a zero-valued option of this entry's type.
    ///
    /// # Errors
    /// Fails for enum entries without a name table and for nullable entries
    /// whose type has no nil sentinel.
    pub fn create_empty_option(&self) -> Result<Box<dyn ConfigOption>, ConfigError> {
        use ConfigOptionType as T;

        let option: Box<dyn ConfigOption> = match (self.option_type, self.nullable) {
            (T::Float, false) => Box::new(ConfigOptionFloat::default()),
            (T::Int, false) => Box::new(ConfigOptionInt::default()),
            (T::Bool, false) => Box::new(ConfigOptionBool::default()),
            (T::String, false) => Box::new(ConfigOptionString::default()),
            (T::Percent, false) => Box::new(ConfigOptionPercent::default()),
            (T::FloatOrPercent, false) => Box::new(ConfigOptionFloatOrPercent::default()),
            (T::Point, false) => Box::new(ConfigOptionPoint::default()),
            (T::Point3, false) => Box::new(ConfigOptionPoint3::default()),
            (T::Floats, false) => Box::new(ConfigOptionFloats::default()),
            (T::Floats, true) => Box::new(ConfigOptionFloatsNullable::default()),
            (T::Ints, false) => Box::new(ConfigOptionInts::default()),
            (T::Ints, true) => Box::new(ConfigOptionIntsNullable::default()),
            (T::Percents, false) => Box::new(ConfigOptionPercents::default()),
            (T::Percents, true) => Box::new(ConfigOptionPercentsNullable::default()),
            (T::FloatsOrPercents, false) => Box::new(ConfigOptionFloatsOrPercents::default()),
            (T::FloatsOrPercents, true) => {
                Box::new(ConfigOptionFloatsOrPercentsNullable::default())
            },
            (T::Bools, false) => Box::new(ConfigOptionBools::default()),
            (T::Bools, true) => Box::new(ConfigOptionBoolsNullable::default()),
            (T::Strings, false) => Box::new(ConfigOptionStrings::default()),
            (T::Points, false) => Box::new(ConfigOptionPoints::default()),
            (T::Enum, false) => match self.enum_factory {
                Some(factory) => factory(0),
                None => return Err(self.missing_enum_table()),
            },
            (T::EnumGeneric, false) => match &self.enum_keys_map {
                Some(keys_map) => {
                    let first = keys_map
                        .names()
                        .next()
                        .and_then(|name| keys_map.value_of(name))
                        .unwrap_or_default();
                    Box::new(ConfigOptionEnumGeneric::new(first, Arc::clone(keys_map)))
                },
                None => return Err(self.missing_enum_table()),
            },
            (other, true) => {
                return Err(ConfigError::configuration(format!(
                    "option {} has type {other}, which has no nullable variant",
                    self.opt_key
                )));
            },
        };
        Ok(option)
    }

    /// Instantiates an option holding the default value, or a zero value when
    /// the entry has no default.
    pub fn create_default_option(&self) -> Result<Box<dyn ConfigOption>, ConfigError> {
        match &self.default_value {
            Some(value) => Ok(value.clone_box()),
            None => self.create_empty_option(),
        }
    }

    /// Command line flags for `key`.
    ///
    /// Without an explicit `cli` the key is used with `_` replaced by `-`;
    /// an explicit spelling may list alternatives separated by `|`.
    #[must_use]
    pub fn cli_args(&self, key: &str) -> Vec<String> {
        match self.cli.as_str() {
            NO_CLI => Vec::new(),
            "" => vec![key.replace('_', "-")],
            cli => cli.split('|').map(str::to_string).collect(),
        }
    }

    /// Checks numeric values against `min`/`max`.
    ///
    /// # Errors
    /// Returns `BadOptionValue` for out-of-range values and `BadOptionType`
    /// when `value` does not match the entry's type.
    pub fn validate_value(&self, value: &dyn ConfigOption) -> Result<(), ConfigError> {
        if value.option_type() != self.option_type {
            return Err(ConfigError::bad_option_type(
                &self.opt_key,
                self.option_type,
                value.option_type(),
            ));
        }
        let in_range = |number: f64| number.is_nan() || (self.min..=self.max).contains(&number);
        let numbers: Vec<f64> = if let Some(floats) = value.downcast_ref::<ConfigOptionFloats>() {
            floats.values.clone()
        } else if let Some(floats) = value.downcast_ref::<ConfigOptionFloatsNullable>() {
            floats.values.clone()
        } else if let Some(ints) = value.downcast_ref::<ConfigOptionInts>() {
            ints.values.iter().map(|&v| f64::from(v)).collect()
        } else if let Some(ints) = value.downcast_ref::<ConfigOptionIntsNullable>() {
            ints.values
                .iter()
                .filter(|&&v| v != i32::MAX)
                .map(|&v| f64::from(v))
                .collect()
        } else if let Some(option) = value.downcast_ref::<ConfigOptionFloatOrPercent>() {
            if option.percent { Vec::new() } else { vec![option.value] }
        } else if matches!(
            self.option_type,
            ConfigOptionType::Float | ConfigOptionType::Int | ConfigOptionType::Percent
        ) {
            value.get_float().map(|number| vec![number]).unwrap_or_default()
        } else {
            Vec::new()
        };
        if numbers.into_iter().all(in_range) {
            Ok(())
        } else {
            Err(ConfigError::bad_option_value(
                &self.opt_key,
                value.serialize(),
            ))
        }
    }

    fn missing_enum_table(&self) -> ConfigError {
        ConfigError::configuration(format!(
            "enum option {} has no name table",
            self.opt_key
        ))
    }
}

/// Registry of option definitions keyed by option key.
#[derive(Debug, Clone, Default)]
pub struct ConfigDef {
    options: BTreeMap<String, ConfigOptionDef>,
}

impl ConfigDef {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `key` with a zero default of `option_type`.
    ///
    /// Enum types get no implicit default. Re-registering a key replaces the
    /// earlier entry.
    pub fn add(&mut self, key: &str, option_type: ConfigOptionType) -> &mut ConfigOptionDef {
        let mut def = ConfigOptionDef::new(key, option_type);
        if !option_type.is_enum() {
            def.default_value = def.create_empty_option().ok().map(Arc::from);
        }
        self.insert(def)
    }

    /// Registers a nullable vector `key` without default.
    pub fn add_nullable(
        &mut self,
        key: &str,
        option_type: ConfigOptionType,
    ) -> &mut ConfigOptionDef {
        let mut def = ConfigOptionDef::new(key, option_type);
        def.nullable = true;
        self.insert(def)
    }

    /// Registers a typed enum option defaulting to `T::default()`.
    pub fn add_enum<T: ConfigEnum>(&mut self, key: &str) -> &mut ConfigOptionDef {
        let keys_map = EnumKeysMap::from_enum::<T>();
        let mut def = ConfigOptionDef::new(key, ConfigOptionType::Enum);
        def.enum_values = keys_map.names().map(str::to_string).collect();
        def.enum_keys_map = Some(Arc::new(keys_map));
        def.enum_factory = Some(ConfigOptionEnum::<T>::create);
        def.default_value = Some(Arc::new(ConfigOptionEnum::new(T::default())));
        self.insert(def)
    }

    /// Registers an enum option backed only by a name table, defaulting to
    /// its first entry.
    pub fn add_enum_generic(&mut self, key: &str, keys_map: EnumKeysMap) -> &mut ConfigOptionDef {
        let mut def = ConfigOptionDef::new(key, ConfigOptionType::EnumGeneric);
        def.enum_values = keys_map.names().map(str::to_string).collect();
        def.enum_keys_map = Some(Arc::new(keys_map));
        def.default_value = def.create_empty_option().ok().map(Arc::from);
        self.insert(def)
    }

    fn insert(&mut self, def: ConfigOptionDef) -> &mut ConfigOptionDef {
        match self.options.entry(def.opt_key.clone()) {
            Entry::Occupied(mut occupied) => {
                tracing::warn!(key = %def.opt_key, "option definition replaced");
                occupied.insert(def);
                occupied.into_mut()
            },
            Entry::Vacant(vacant) => vacant.insert(def),
        }
    }

    /// Definition of `key`; never falls back to aliases.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ConfigOptionDef> {
        self.options.get(key)
    }

    /// Canonical key for `key`, following aliases.
    #[must_use]
    pub fn resolve_key<'a>(&'a self, key: &'a str) -> Option<&'a str> {
        if self.options.contains_key(key) {
            return Some(key);
        }
        self.options
            .values()
            .find(|def| def.aliases.iter().any(|alias| alias == key))
            .map(|def| def.opt_key.as_str())
    }

    /// Returns true if `key` is registered.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    /// Registered keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.options.keys().map(String::as_str)
    }

    /// Definitions in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigOptionDef)> {
        self.options.iter().map(|(key, def)| (key.as_str(), def))
    }

    /// Number of registered keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// CLI flags of `key`, empty for unknown keys.
    #[must_use]
    pub fn cli_args(&self, key: &str) -> Vec<String> {
        self.get(key).map(|def| def.cli_args(key)).unwrap_or_default()
    }

    /// Checks `value` against the entry of `key`.
    ///
    /// # Errors
    /// Returns `UnknownOption` for unregistered keys, otherwise see
    /// [`ConfigOptionDef::validate_value`].
    pub fn validate_value(&self, key: &str, value: &dyn ConfigOption) -> Result<(), ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::unknown_option(key))?
            .validate_value(value)
    }

    /// Verifies that every default matches its declared type.
    ///
    /// # Errors
    /// Returns `BadOptionType` naming the first mismatching key.
    pub fn validate_defaults(&self) -> Result<(), ConfigError> {
        for (key, def) in &self.options {
            let Some(value) = &def.default_value else {
                continue;
            };
            if value.option_type() != def.option_type || value.is_nullable() != def.nullable {
                return Err(ConfigError::bad_option_type(
                    key,
                    def.option_type,
                    value.option_type(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    enum Seam {
        #[default]
        Nearest,
        Aligned,
        Back,
    }

    impl ConfigEnum for Seam {
        const ENTRIES: &'static [(&'static str, Self)] = &[
            ("nearest", Self::Nearest),
            ("aligned", Self::Aligned),
            ("back", Self::Back),
        ];

        fn to_int(self) -> i32 {
            self as i32
        }
    }

    #[test]
    fn add_registers_zero_defaults() -> Result<(), Box<dyn Error>> {
        let mut def = ConfigDef::new();
        def.add("layer_height", ConfigOptionType::Float)
            .label("Layer height")
            .min(0.0);
        def.add("filament_type", ConfigOptionType::Strings);

        let entry = def
            .get("layer_height")
            .ok_or_else(|| std::io::Error::other("missing layer_height"))?;
        assert_eq!(entry.label, "Layer height");
        assert_eq!(
            entry.get_default::<ConfigOptionFloat>().map(|o| o.value),
            Some(0.0)
        );
        let filament_type = def
            .get("filament_type")
            .ok_or_else(|| std::io::Error::other("missing filament_type"))?;
        assert_eq!(filament_type.create_empty_option()?.serialize(), "");
        assert!(def.get("missing").is_none());
        assert_eq!(def.len(), 2);
        def.validate_defaults()?;
        Ok(())
    }

    #[test]
    fn nullable_entries_have_no_default() -> Result<(), Box<dyn Error>> {
        let mut def = ConfigDef::new();
        def.add_nullable("retract_length_toolchange", ConfigOptionType::Floats);
        let entry = def
            .get("retract_length_toolchange")
            .ok_or_else(|| std::io::Error::other("missing entry"))?;
        assert!(entry.default_value.is_none());
        let option = entry.create_default_option()?;
        assert!(option.is_nullable());
        assert_eq!(option.option_type(), ConfigOptionType::Floats);

        def.add_nullable("compatible_printers", ConfigOptionType::Strings);
        let strings = def
            .get("compatible_printers")
            .ok_or_else(|| std::io::Error::other("missing entry"))?;
        assert!(strings.create_empty_option().is_err());
        Ok(())
    }

    #[test]
    fn enum_entries_create_typed_options() -> Result<(), Box<dyn Error>> {
        let mut def = ConfigDef::new();
        def.add_enum::<Seam>("seam_position");
        def.add_enum_generic(
            "ironing_type",
            EnumKeysMap::new([("no ironing", 0), ("top", 1)]),
        );

        let seam = def
            .get("seam_position")
            .ok_or_else(|| std::io::Error::other("missing seam"))?;
        assert_eq!(seam.enum_values, vec!["nearest", "aligned", "back"]);
        let option = seam.create_default_option()?;
        assert!(option.downcast_ref::<ConfigOptionEnum<Seam>>().is_some());
        assert_eq!(option.serialize(), "nearest");

        let ironing = def
            .get("ironing_type")
            .ok_or_else(|| std::io::Error::other("missing ironing"))?;
        let option = ironing.create_default_option()?;
        assert_eq!(option.option_type(), ConfigOptionType::EnumGeneric);
        assert_eq!(option.serialize(), "no ironing");
        def.validate_defaults()?;
        Ok(())
    }

    #[test]
    fn cli_args_derivation() {
        let mut def = ConfigDef::new();
        def.add("first_layer_height", ConfigOptionType::Float);
        def.add("nozzle_diameter", ConfigOptionType::Floats).cli("nozzle|n");
        def.add("inherits", ConfigOptionType::String).cli(NO_CLI);

        assert_eq!(def.cli_args("first_layer_height"), vec!["first-layer-height"]);
        assert_eq!(def.cli_args("nozzle_diameter"), vec!["nozzle", "n"]);
        assert!(def.cli_args("inherits").is_empty());
        assert!(def.cli_args("unknown").is_empty());
    }

    #[test]
    fn aliases_resolve_to_canonical_key() {
        let mut def = ConfigDef::new();
        def.add("initial_layer_print_height", ConfigOptionType::Float)
            .aliases(["first_layer_height"]);
        assert_eq!(
            def.resolve_key("first_layer_height"),
            Some("initial_layer_print_height")
        );
        assert_eq!(
            def.resolve_key("initial_layer_print_height"),
            Some("initial_layer_print_height")
        );
        assert_eq!(def.resolve_key("bogus"), None);
    }

    #[test]
    fn validate_value_checks_bounds() {
        let mut def = ConfigDef::new();
        def.add("wall_loops", ConfigOptionType::Int).min(0.0).max(1000.0);
        def.add("nozzle_diameter", ConfigOptionType::Floats).min(0.0);

        assert!(def.validate_value("wall_loops", &ConfigOptionInt::new(3)).is_ok());
        assert!(matches!(
            def.validate_value("wall_loops", &ConfigOptionInt::new(-1)),
            Err(ConfigError::BadOptionValue { .. })
        ));
        assert!(matches!(
            def.validate_value("wall_loops", &ConfigOptionFloat::new(1.0)),
            Err(ConfigError::BadOptionType { .. })
        ));
        assert!(matches!(
            def.validate_value("nozzle_diameter", &ConfigOptionFloats::new(vec![0.4, -0.2])),
            Err(ConfigError::BadOptionValue { .. })
        ));
        assert!(matches!(
            def.validate_value("missing", &ConfigOptionInt::new(1)),
            Err(ConfigError::UnknownOption { .. })
        ));
    }

    #[test]
    fn re_adding_a_key_replaces_it() {
        let mut def = ConfigDef::new();
        def.add("wall_loops", ConfigOptionType::Int);
        def.add("wall_loops", ConfigOptionType::Float);
        assert_eq!(def.len(), 1);
        assert_eq!(
            def.get("wall_loops").map(|entry| entry.option_type),
            Some(ConfigOptionType::Float)
        );
    }
}
