//! Print preset schema and the store that upgrades older presets.

use crate::dynamic::DynamicConfig;
use crate::schema::ConfigDef;
use crate::store::ConfigBase;
use crate::substitution::{ConfigSubstitutions, ForwardCompatibilitySubstitutionRule};
use slicer_config_options::{
    ConfigEnum, ConfigError, ConfigOption, ConfigOptionBools,
    ConfigOptionFloat, ConfigOptionFloatOrPercent, ConfigOptionFloats, ConfigOptionFloatsNullable,
    ConfigOptionInt, ConfigOptionPercent, ConfigOptionPoint3, ConfigOptionPoints,
    ConfigOptionString, ConfigOptionStrings, ConfigOptionType, EnumKeysMap, Vec2d, Vec3d,
    float_to_string_decimal_point,
};
use slicer_config_shared::ResultExt;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::{Arc, OnceLock};

/// Support structure style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SupportMaterialStyle {
    /// Style picked by the support type.
    #[default]
    Default,
    /// Regular grid.
    Grid,
    /// Grid hugging the overhang outline.
    Snug,
    /// Thin tree branches.
    TreeSlim,
    /// Thick tree branches.
    TreeStrong,
    /// Tree branches with grid tips.
    TreeHybrid,
    /// Organic tree branches.
    Organic,
}

impl ConfigEnum for SupportMaterialStyle {
    const ENTRIES: &'static [(&'static str, Self)] = &[
        ("default", Self::Default),
        ("grid", Self::Grid),
        ("snug", Self::Snug),
        ("tree_slim", Self::TreeSlim),
        ("tree_strong", Self::TreeStrong),
        ("tree_hybrid", Self::TreeHybrid),
        ("organic", Self::Organic),
    ];

    fn to_int(self) -> i32 {
        self as i32
    }
}

/// Keys dropped from the schema; presets still carrying them load with the
/// key reported as unrecognized.
pub const REMOVED_KEYS: &[&str] = &[
    "wipe_tower_extruder",
    "gcode_binary",
    "cooling",
    "max_volumetric_extrusion_rate_slope_positive",
    "max_volumetric_extrusion_rate_slope_negative",
];

fn renamed_key(key: &str) -> Option<&'static str> {
    Some(match key {
        "infill_first" => "is_infill_first",
        "bottom_layer_speed" => "initial_layer_speed",
        "support_material" => "enable_support",
        "perimeters" => "wall_loops",
        "fill_density" => "sparse_infill_density",
        "perimeter_speed" => "inner_wall_speed",
        "external_perimeter_speed" => "outer_wall_speed",
        "extrusion_width" => "line_width",
        "external_perimeter_extrusion_width" => "outer_wall_line_width",
        "wipe_tower" => "enable_prime_tower",
        _ => return None,
    })
}

/// Splits a `wall_infill_order` value into the wall sequence and whether
/// infill goes first.
#[must_use]
pub fn wall_order_parts(order: &str) -> Option<(&'static str, bool)> {
    match order {
        "inner wall/outer wall/infill" => Some(("inner wall/outer wall", false)),
        "outer wall/inner wall/infill" => Some(("outer wall/inner wall", false)),
        "inner-outer-inner wall/infill" => Some(("inner-outer-inner wall", false)),
        "infill/inner wall/outer wall" => Some(("inner wall/outer wall", true)),
        "infill/outer wall/inner wall" => Some(("outer wall/inner wall", true)),
        _ => None,
    }
}

/// Shared print preset schema.
pub fn print_config_def() -> Arc<ConfigDef> {
    static DEF: OnceLock<Arc<ConfigDef>> = OnceLock::new();
    Arc::clone(DEF.get_or_init(|| Arc::new(build_print_config_def())))
}

fn build_print_config_def() -> ConfigDef {
    let mut def = ConfigDef::new();

    def.add("layer_height", ConfigOptionType::Float)
        .label("Layer height")
        .category("Quality")
        .tooltip("Slicing height of every layer after the first.")
        .sidetext("mm")
        .min(0.0)
        .default_value(ConfigOptionFloat::new(0.2));
    def.add("initial_layer_print_height", ConfigOptionType::Float)
        .label("Initial layer height")
        .category("Quality")
        .sidetext("mm")
        .aliases(["first_layer_height"])
        .min(0.0)
        .default_value(ConfigOptionFloat::new(0.2));
    def.add("nozzle_diameter", ConfigOptionType::Floats)
        .label("Nozzle diameter")
        .sidetext("mm")
        .default_value(ConfigOptionFloats::new(vec![0.4]));
    def.add("line_width", ConfigOptionType::FloatOrPercent)
        .label("Default")
        .full_label("Default line width")
        .category("Quality")
        .sidetext("mm or %")
        .ratio_over("nozzle_diameter")
        .min(0.0)
        .default_value(ConfigOptionFloatOrPercent::new(0.42, false));
    for (key, label) in [
        ("outer_wall_line_width", "Outer wall"),
        ("inner_wall_line_width", "Inner wall"),
    ] {
        def.add(key, ConfigOptionType::FloatOrPercent)
            .label(label)
            .category("Quality")
            .tooltip("Zero means the default line width.")
            .sidetext("mm or %")
            .ratio_over("nozzle_diameter")
            .min(0.0);
    }

    def.add("wall_loops", ConfigOptionType::Int)
        .label("Wall loops")
        .category("Strength")
        .min(0.0)
        .max(1000.0)
        .default_value(ConfigOptionInt::new(2));
    def.add("sparse_infill_density", ConfigOptionType::Percent)
        .label("Sparse infill density")
        .category("Strength")
        .sidetext("%")
        .min(0.0)
        .max(100.0)
        .default_value(ConfigOptionPercent::new(20.0));
    def.add_enum_generic(
        "sparse_infill_pattern",
        EnumKeysMap::new([
            ("grid", 0),
            ("concentric", 1),
            ("rectilinear", 2),
            ("gyroid", 3),
            ("honeycomb", 4),
            ("lightning", 5),
        ]),
    )
    .label("Sparse infill pattern")
    .category("Strength")
    .enum_labels(["Grid", "Concentric", "Rectilinear", "Gyroid", "Honeycomb", "Lightning"]);
    def.add("is_infill_first", ConfigOptionType::Bool)
        .label("Print infill first")
        .category("Quality");
    def.add("wall_infill_order", ConfigOptionType::String)
        .label("Order of walls and infill")
        .category("Quality")
        .default_value(ConfigOptionString::new("inner wall/outer wall/infill"));
    def.add("wall_sequence", ConfigOptionType::String)
        .label("Walls printing order")
        .category("Quality")
        .default_value(ConfigOptionString::new("inner wall/outer wall"));

    def.add("enable_support", ConfigOptionType::Bool)
        .label("Enable support")
        .category("Support");
    def.add("support_type", ConfigOptionType::String)
        .label("Type")
        .category("Support")
        .default_value(ConfigOptionString::new("normal(auto)"));
    def.add_enum::<SupportMaterialStyle>("support_style")
        .label("Style")
        .category("Support")
        .enum_labels([
            "Default",
            "Grid",
            "Snug",
            "Tree Slim",
            "Tree Strong",
            "Tree Hybrid",
            "Organic",
        ]);

    def.add("initial_layer_speed", ConfigOptionType::Float)
        .label("Initial layer")
        .category("Speed")
        .sidetext("mm/s")
        .min(0.0)
        .default_value(ConfigOptionFloat::new(50.0));
    def.add("inner_wall_speed", ConfigOptionType::Float)
        .label("Inner wall")
        .category("Speed")
        .sidetext("mm/s")
        .min(0.0)
        .default_value(ConfigOptionFloat::new(60.0));
    def.add("outer_wall_speed", ConfigOptionType::FloatOrPercent)
        .label("Outer wall")
        .category("Speed")
        .sidetext("mm/s or %")
        .ratio_over("inner_wall_speed")
        .min(0.0)
        .default_value(ConfigOptionFloatOrPercent::new(50.0, true));

    def.add("enable_prime_tower", ConfigOptionType::Bool)
        .label("Enable prime tower")
        .category("Others");
    def.add("wipe", ConfigOptionType::Bools)
        .label("Wipe while retracting")
        .default_value(ConfigOptionBools::from_bools(&[false]));
    def.add_nullable("retract_length_toolchange", ConfigOptionType::Floats)
        .label("Length")
        .full_label("Retraction length when changing filament")
        .sidetext("mm")
        .default_value(ConfigOptionFloatsNullable::new(vec![f64::NAN]));
    def.add("filament_type", ConfigOptionType::Strings)
        .label("Type")
        .default_value(ConfigOptionStrings::new(vec!["PLA".to_string()]));

    def.add("bed_shape", ConfigOptionType::Points)
        .label("Bed shape")
        .default_value(ConfigOptionPoints::new(vec![
            Vec2d::new(0.0, 0.0),
            Vec2d::new(200.0, 0.0),
            Vec2d::new(200.0, 200.0),
            Vec2d::new(0.0, 200.0),
        ]));
    def.add("bed_custom_origin", ConfigOptionType::Point3)
        .label("Bed origin")
        .default_value(ConfigOptionPoint3::new(Vec3d::new(0.0, 0.0, 0.0)));

    def.add("inherits", ConfigOptionType::String)
        .label("Inherits profile")
        .cli(crate::schema::NO_CLI);
    def.add("print_settings_id", ConfigOptionType::String)
        .cli(crate::schema::NO_CLI);
    def.add("filament_settings_id", ConfigOptionType::Strings)
        .cli(crate::schema::NO_CLI);
    def.add("different_settings_to_system", ConfigOptionType::Strings)
        .cli(crate::schema::NO_CLI);
    def.add("compatible_printers", ConfigOptionType::Strings)
        .label("Compatible machine")
        .cli(crate::schema::NO_CLI);
    def.add("printhost_apikey", ConfigOptionType::String)
        .label("API Key / Password")
        .cli(crate::schema::NO_CLI);

    def
}

/// Print preset store: a [`DynamicConfig`] on [`print_config_def`] that
/// upgrades keys and values written by older releases.
#[derive(Debug, Clone)]
pub struct PrintPresetConfig {
    inner: DynamicConfig,
    /// Set when the running load read `wall_infill_order`.
    wall_order_loaded: bool,
}

impl PrintPresetConfig {
    /// Empty preset.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: DynamicConfig::with_def(print_config_def()),
            wall_order_loaded: false,
        }
    }

    /// Preset holding every schema default.
    ///
    /// # Errors
    /// Propagates option construction failures.
    pub fn full() -> Result<Self, ConfigError> {
        Ok(Self {
            inner: DynamicConfig::defaults(print_config_def())?,
            wall_order_loaded: false,
        })
    }

    /// Loads a preset file (JSON by extension, INI otherwise).
    ///
    /// # Errors
    /// Returns the load failure as an envelope carrying the `path`.
    pub fn from_file(
        path: &Path,
        rule: ForwardCompatibilitySubstitutionRule,
    ) -> slicer_config_shared::Result<(Self, ConfigSubstitutions)> {
        let mut preset = Self::new();
        let substitutions = preset
            .load(path, rule)
            .with_metadata("path", path.display().to_string())?;
        tracing::debug!(
            path = %path.display(),
            keys = preset.len(),
            substitutions = substitutions.len(),
            "loaded print preset"
        );
        Ok((preset, substitutions))
    }

    /// Unwraps the underlying store.
    #[must_use]
    pub fn into_inner(self) -> DynamicConfig {
        self.inner
    }
}

impl Default for PrintPresetConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for PrintPresetConfig {
    type Target = DynamicConfig;

    fn deref(&self) -> &DynamicConfig {
        &self.inner
    }
}

impl DerefMut for PrintPresetConfig {
    fn deref_mut(&mut self) -> &mut DynamicConfig {
        &mut self.inner
    }
}

impl ConfigBase for PrintPresetConfig {
    fn def(&self) -> Option<Arc<ConfigDef>> {
        self.inner.def()
    }

    fn optptr(&self, key: &str) -> Option<&dyn ConfigOption> {
        self.inner.optptr(key)
    }

    fn optptr_mut(
        &mut self,
        key: &str,
        create: bool,
    ) -> Result<Option<&mut dyn ConfigOption>, ConfigError> {
        self.inner.optptr_mut(key, create)
    }

    fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }

    fn adopt_option(&mut self, key: &str, option: &dyn ConfigOption) -> Result<(), ConfigError> {
        self.inner.adopt_option(key, option)
    }

    fn set_key_value(&mut self, key: &str, option: Box<dyn ConfigOption>) -> Result<(), ConfigError> {
        self.inner.set_key_value(key, option)
    }

    fn handle_legacy(&mut self, key: &mut String, value: &mut String) {
        if REMOVED_KEYS.contains(&key.as_str()) {
            key.clear();
            return;
        }
        if let Some(renamed) = renamed_key(key) {
            *key = renamed.to_string();
        }
        match key.as_str() {
            // Densities were once stored as a 0..1 fraction.
            "sparse_infill_density" if !value.trim_end().ends_with('%') => {
                if let Ok(fraction) = value.trim().parse::<f64>()
                    && (0.0..=1.0).contains(&fraction)
                {
                    let percent = (fraction * 100.0 * 1e6).round() / 1e6;
                    *value = format!("{}%", float_to_string_decimal_point(percent, None));
                }
            },
            "wall_infill_order" => self.wall_order_loaded = true,
            "support_type" => match value.as_str() {
                "normal" => *value = "normal(manual)".to_string(),
                "tree" => *value = "tree(manual)".to_string(),
                _ => {},
            },
            _ => {},
        }
    }

    fn handle_legacy_composite(&mut self) -> Result<(), ConfigError> {
        // Only an order read by this load is upgraded; a stored or default
        // one must not overwrite the sequence the file set.
        let order = if std::mem::take(&mut self.wall_order_loaded) {
            self.option::<ConfigOptionString>("wall_infill_order")
                .and_then(|order| wall_order_parts(&order.value))
        } else {
            None
        };
        if let Some((sequence, infill_first)) = order {
            self.set("wall_sequence", sequence)?;
            self.set("is_infill_first", infill_first)?;
        }

        let hybrid = self
            .option::<ConfigOptionString>("support_type")
            .is_some_and(|support_type| support_type.value == "hybrid(auto)");
        if hybrid {
            self.set("support_type", "tree(auto)")?;
            self.set("support_style", "tree_hybrid")?;
        }
        Ok(())
    }
}
