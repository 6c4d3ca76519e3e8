//! JSON preset loading.
//!
//! A preset is a flat JSON object. Metadata members are captured into a
//! caller-owned map, every other member is stringified into the option wire
//! grammar and assigned through the store's legacy hook and substitution
//! policy. Failures are reported through [`JsonLoadOutcome`] instead of
//! `Err`, so callers can surface them as user notifications.

use crate::load::read_config_file;
use crate::store::ConfigBase;
use crate::substitution::ConfigSubstitutionContext;
use serde_json::{Map, Value};
use slicer_config_options::{
    CNumericLocaleGuard, ConfigError, ConfigOptionStrings, ConfigOptionType, escape_strings_cstyle,
};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Key holding the parent preset name.
pub const INHERITS_KEY: &str = "inherits";

/// Value of `name` marking a project settings preset.
pub const PROJECT_SETTINGS_NAME: &str = "project_settings";

/// Members captured into `key_values` instead of being applied.
pub const METADATA_KEYS: &[&str] = &[
    "version",
    "name",
    "type",
    "from",
    "setting_id",
    "base_id",
    "user_id",
    "filament_id",
    "url",
    "description",
    "instantiation",
    "is_custom",
    "updated_time",
];

const DIFF_SETTINGS_KEY: &str = "different_settings_to_system";
const FILAMENT_SETTINGS_KEY: &str = "filament_settings_id";

/// Result of a JSON load: code `0` on success, `-1` with a reason otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonLoadOutcome {
    /// Every member was processed.
    Loaded,
    /// Loading stopped; the store may be partially modified.
    Failed {
        /// Human readable cause, tagged `parse_error`, `JsonParseError` or
        /// `ConfigError`.
        reason: String,
    },
}

impl JsonLoadOutcome {
    /// Integer status: `0` or `-1`.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::Loaded => 0,
            Self::Failed { .. } => -1,
        }
    }

    /// Failure reason, empty on success.
    #[must_use]
    pub fn reason(&self) -> &str {
        match self {
            Self::Loaded => "",
            Self::Failed { reason } => reason,
        }
    }

    /// Returns true on success.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Loaded)
    }

    fn failed(reason: String) -> Self {
        tracing::error!(%reason, "json config load failed");
        Self::Failed { reason }
    }
}

impl fmt::Display for JsonLoadOutcome {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loaded => formatter.write_str("loaded"),
            Self::Failed { reason } => write!(formatter, "failed: {reason}"),
        }
    }
}

/// Reads `path` and loads it with [`load_from_json_str`].
pub fn load_from_json_file<C: ConfigBase + ?Sized>(
    config: &mut C,
    path: &Path,
    ctx: &mut ConfigSubstitutionContext,
    load_inherits_to_config: bool,
    key_values: &mut BTreeMap<String, String>,
) -> JsonLoadOutcome {
    tracing::debug!(path = %path.display(), "loading json config");
    match read_config_file(path) {
        Ok(text) => load_from_json_str(config, &text, ctx, load_inherits_to_config, key_values),
        Err(error) => JsonLoadOutcome::failed(format!("parse_error: {error}")),
    }
}

/// Loads a JSON preset from text.
///
/// With `load_inherits_to_config` unset, `inherits` is captured into
/// `key_values`; with it set, an `inherits` member fails the load.
pub fn load_from_json_str<C: ConfigBase + ?Sized>(
    config: &mut C,
    text: &str,
    ctx: &mut ConfigSubstitutionContext,
    load_inherits_to_config: bool,
    key_values: &mut BTreeMap<String, String>,
) -> JsonLoadOutcome {
    let members = match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(members)) => members,
        Ok(other) => {
            return JsonLoadOutcome::failed(format!(
                "JsonParseError: expected an object, found {}",
                json_kind(&other)
            ));
        },
        Err(error) => return JsonLoadOutcome::failed(format!("JsonParseError: {error}")),
    };
    let _locale = CNumericLocaleGuard::new();
    match apply_members(config, &members, ctx, load_inherits_to_config, key_values) {
        Ok(()) => {
            tracing::debug!(
                members = members.len(),
                substitutions = ctx.substitutions().len(),
                "loaded json config"
            );
            JsonLoadOutcome::Loaded
        },
        Err(error) => JsonLoadOutcome::failed(format!("ConfigError: {error}")),
    }
}

/// Values derived from several members, applied after the member pass.
#[derive(Debug, Default)]
struct Composites {
    support_style: Option<&'static str>,
    is_infill_first: Option<bool>,
    wall_sequence: Option<&'static str>,
    diff_keys: Vec<&'static str>,
}

impl Composites {
    fn observe(&mut self, key: &str, value: &mut String) {
        match key {
            "support_type" if value.as_str() == "hybrid(auto)" => {
                *value = "tree(auto)".to_string();
                self.support_style = Some("tree_hybrid");
                self.diff_keys.extend(["support_type", "support_style"]);
            },
            "wall_infill_order" => {
                if matches!(
                    value.as_str(),
                    "infill/outer wall/inner wall" | "infill/inner wall/outer wall"
                ) {
                    self.is_infill_first = Some(true);
                    self.diff_keys.push("is_infill_first");
                }
                let sequence = match value.as_str() {
                    "inner wall/outer wall/infill" | "infill/inner wall/outer wall" => {
                        Some("inner wall/outer wall")
                    },
                    "outer wall/inner wall/infill" | "infill/outer wall/inner wall" => {
                        Some("outer wall/inner wall")
                    },
                    "inner-outer-inner wall/infill" => Some("inner-outer-inner wall"),
                    _ => None,
                };
                if sequence.is_some() {
                    self.wall_sequence = sequence;
                    self.diff_keys.push("wall_sequence");
                }
            },
            _ => {},
        }
    }
}

fn apply_members<C: ConfigBase + ?Sized>(
    config: &mut C,
    members: &Map<String, Value>,
    ctx: &mut ConfigSubstitutionContext,
    load_inherits_to_config: bool,
    key_values: &mut BTreeMap<String, String>,
) -> Result<(), ConfigError> {
    let def = config
        .def()
        .ok_or_else(|| ConfigError::no_definition("json preset"))?;
    let mut composites = Composites::default();

    for (key, value) in members {
        if key == INHERITS_KEY {
            if load_inherits_to_config {
                return Err(ConfigError::configuration(
                    "inherits cannot be loaded into the config",
                ));
            }
            key_values.insert(INHERITS_KEY.to_string(), scalar_text(value));
            continue;
        }
        if let Some(meta) = METADATA_KEYS
            .iter()
            .find(|meta| meta.eq_ignore_ascii_case(key))
        {
            key_values.insert((*meta).to_string(), scalar_text(value));
            continue;
        }

        let option_type = |key: &str| {
            def.resolve_key(key)
                .and_then(|canonical| def.get(canonical))
                .map(|entry| entry.option_type)
        };
        let source_type = option_type(key.as_str());
        let source_text = wire_text(value, source_type);
        let mut opt_key = key.clone();
        let mut opt_value = source_text.clone();
        config.handle_legacy(&mut opt_key, &mut opt_value);
        if opt_key.is_empty() {
            ctx.record_unrecognized(key);
            continue;
        }
        // A renamed list is joined in the grammar of its new key unless the
        // hook rewrote the value itself.
        if value.is_array() && opt_value == source_text {
            let renamed_type = option_type(opt_key.as_str());
            if renamed_type != source_type {
                opt_value = wire_text(value, renamed_type);
            }
        }
        composites.observe(&opt_key, &mut opt_value);
        if !config.set_deserialize_raw(&opt_key, &opt_value, ctx, false)? {
            return Err(ConfigError::bad_option_value(opt_key, opt_value));
        }
    }

    if let Some(style) = composites.support_style {
        config.set_deserialize("support_style", style, ctx, false)?;
    }
    if let Some(infill_first) = composites.is_infill_first {
        let text = if infill_first { "1" } else { "0" };
        config.set_deserialize("is_infill_first", text, ctx, false)?;
    }
    if let Some(sequence) = composites.wall_sequence {
        config.set_deserialize("wall_sequence", sequence, ctx, false)?;
    }
    let is_project = key_values
        .get("name")
        .is_some_and(|name| name == PROJECT_SETTINGS_NAME);
    if is_project && !composites.diff_keys.is_empty() {
        record_project_diffs(config, &composites.diff_keys)?;
    }

    config.handle_legacy_composite()
}

/// Appends `diff_keys` to the print slot of `different_settings_to_system`.
fn record_project_diffs<C: ConfigBase + ?Sized>(
    config: &mut C,
    diff_keys: &[&str],
) -> Result<(), ConfigError> {
    let filament_count = config
        .optptr(FILAMENT_SETTINGS_KEY)
        .and_then(|option| option.downcast_ref::<ConfigOptionStrings>())
        .map_or(0, |option| option.values.len());
    let slot = config
        .optptr_mut(DIFF_SETTINGS_KEY, true)?
        .ok_or_else(|| ConfigError::unknown_option(DIFF_SETTINGS_KEY))?;
    let found = slot.option_type();
    let diffs = slot
        .downcast_mut::<ConfigOptionStrings>()
        .ok_or_else(|| ConfigError::bad_option_type(DIFF_SETTINGS_KEY, ConfigOptionType::Strings, found))?;
    if diffs.values.is_empty() {
        diffs.values.resize(filament_count + 2, String::new());
    }
    if let Some(print_slot) = diffs.values.first_mut() {
        let mut entries: Vec<String> = print_slot
            .split(';')
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect();
        for key in diff_keys {
            if !entries.iter().any(|entry| entry == key) {
                entries.push((*key).to_string());
            }
        }
        *print_slot = entries.join(";");
    }
    Ok(())
}

/// Text form of a metadata member.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Converts a member into the wire grammar of its target option.
fn wire_text(value: &Value, target_type: Option<ConfigOptionType>) -> String {
    let Value::Array(items) = value else {
        return scalar_text(value);
    };
    let elements: Vec<String> = items.iter().map(scalar_text).collect();
    if target_type == Some(ConfigOptionType::Strings) {
        escape_strings_cstyle(&elements)
    } else {
        elements.join(",")
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
