//! Integration tests for the JSON preset pipeline against fixture files and
//! hand-built stores.

use slicer_config::{
    ConfigBase, ConfigDef, ConfigSubstitutionContext, DynamicConfig,
    ForwardCompatibilitySubstitutionRule, JsonLoadOutcome, PrintPresetConfig, SupportMaterialStyle,
    load_from_json_file, load_from_json_str,
};
use slicer_config_options::{
    ConfigError, ConfigOption, ConfigOptionEnum, ConfigOptionStrings, ConfigOptionType,
};
use std::collections::BTreeMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn ctx(rule: ForwardCompatibilitySubstitutionRule) -> ConfigSubstitutionContext {
    ConfigSubstitutionContext::new(rule)
}

/// Store with a renaming legacy hook that records composite calls.
#[derive(Debug)]
struct RecordingStore {
    inner: DynamicConfig,
    composite_calls: usize,
}

impl RecordingStore {
    fn new() -> Self {
        let mut def = ConfigDef::new();
        for key in ["support_type", "wall_infill_order", "wall_sequence", "test_key", "array_key", "new_key"] {
            def.add(key, ConfigOptionType::String);
        }
        def.add_enum::<SupportMaterialStyle>("support_style");
        def.add("is_infill_first", ConfigOptionType::Bool);
        def.add("different_settings_to_system", ConfigOptionType::Strings);
        def.add("filament_settings_id", ConfigOptionType::Strings);
        Self {
            inner: DynamicConfig::with_def(Arc::new(def)),
            composite_calls: 0,
        }
    }
}

impl ConfigBase for RecordingStore {
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

    fn handle_legacy(&mut self, key: &mut String, value: &mut String) {
        match key.as_str() {
            "legacy_key" => {
                *key = "new_key".to_string();
                *value = "new_value".to_string();
            },
            "legacy_settings_ids" => *key = "filament_settings_id".to_string(),
            _ => {},
        }
    }

    fn handle_legacy_composite(&mut self) -> Result<(), ConfigError> {
        self.composite_calls += 1;
        Ok(())
    }
}

/// Store whose slots can never be created.
#[derive(Debug)]
struct BrokenStore {
    inner: RecordingStore,
}

impl ConfigBase for BrokenStore {
    fn def(&self) -> Option<Arc<ConfigDef>> {
        self.inner.def()
    }

    fn optptr(&self, key: &str) -> Option<&dyn ConfigOption> {
        self.inner.optptr(key)
    }

    fn optptr_mut(
        &mut self,
        _key: &str,
        _create: bool,
    ) -> Result<Option<&mut dyn ConfigOption>, ConfigError> {
        Err(ConfigError::configuration("storage unavailable"))
    }

    fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }
}

fn load_str(
    store: &mut RecordingStore,
    text: &str,
    key_values: &mut BTreeMap<String, String>,
) -> JsonLoadOutcome {
    let mut ctx = ctx(ForwardCompatibilitySubstitutionRule::Enable);
    load_from_json_str(store, text, &mut ctx, false, key_values)
}

#[test]
fn basic_members_and_metadata() -> Result<(), Box<dyn Error>> {
    let mut store = RecordingStore::new();
    let mut key_values = BTreeMap::new();
    let outcome = load_str(
        &mut store,
        r#"{"version": "1.0.0", "name": "test_config", "type": "test_type", "test_key": "test_value"}"#,
        &mut key_values,
    );

    assert_eq!(outcome, JsonLoadOutcome::Loaded);
    assert_eq!(store.composite_calls, 1);
    assert_eq!(key_values.get("version").map(String::as_str), Some("1.0.0"));
    assert_eq!(key_values.get("name").map(String::as_str), Some("test_config"));
    assert_eq!(key_values.get("type").map(String::as_str), Some("test_type"));
    assert_eq!(store.opt_serialize("test_key")?, "test_value");
    Ok(())
}

#[test]
fn array_members_keep_every_element() -> Result<(), Box<dyn Error>> {
    let mut store = RecordingStore::new();
    let outcome = load_str(
        &mut store,
        r#"{"array_key": ["value1", "value2", "value3"]}"#,
        &mut BTreeMap::new(),
    );

    assert!(outcome.is_ok(), "{outcome}");
    assert_eq!(store.opt_serialize("array_key")?, "value1,value2,value3");
    Ok(())
}

#[test]
fn legacy_hook_rewrites_members() -> Result<(), Box<dyn Error>> {
    let mut store = RecordingStore::new();
    let outcome = load_str(&mut store, r#"{"legacy_key": "old_value"}"#, &mut BTreeMap::new());

    assert!(outcome.is_ok(), "{outcome}");
    assert!(!store.has("legacy_key"));
    assert_eq!(store.opt_serialize("new_key")?, "new_value");
    Ok(())
}

#[test]
fn project_settings_record_composite_diffs() -> Result<(), Box<dyn Error>> {
    let mut store = RecordingStore::new();
    let mut key_values = BTreeMap::new();
    let text = std::fs::read_to_string(fixture("project_settings.json"))?;
    let outcome = load_str(&mut store, &text, &mut key_values);
    // enable_support is not part of this schema.
    assert!(outcome.is_ok(), "{outcome}");

    let style = store
        .option::<ConfigOptionEnum<SupportMaterialStyle>>("support_style")
        .ok_or_else(|| std::io::Error::other("support_style missing"))?;
    assert_eq!(style.value, SupportMaterialStyle::TreeHybrid);
    assert_eq!(store.opt_serialize("support_type")?, "tree(auto)");
    assert_eq!(store.opt_serialize("is_infill_first")?, "1");
    assert_eq!(store.opt_serialize("wall_sequence")?, "outer wall/inner wall");

    let diffs = store
        .option::<ConfigOptionStrings>("different_settings_to_system")
        .ok_or_else(|| std::io::Error::other("different_settings_to_system missing"))?;
    assert_eq!(diffs.values.len(), 4);
    assert_eq!(
        diffs.values.first().map(String::as_str),
        Some("support_type;support_style;is_infill_first;wall_sequence")
    );
    Ok(())
}

#[test]
fn diffs_are_only_recorded_for_project_settings() -> Result<(), Box<dyn Error>> {
    let mut store = RecordingStore::new();
    let outcome = load_str(
        &mut store,
        r#"{"name": "my print", "support_type": "hybrid(auto)"}"#,
        &mut BTreeMap::new(),
    );

    assert!(outcome.is_ok(), "{outcome}");
    assert_eq!(store.opt_serialize("support_style")?, "tree_hybrid");
    assert!(!store.has("different_settings_to_system"));
    Ok(())
}

#[test]
fn existing_diff_entries_are_not_duplicated() -> Result<(), Box<dyn Error>> {
    let mut store = RecordingStore::new();
    let outcome = load_str(
        &mut store,
        r#"{
            "name": "project_settings",
            "different_settings_to_system": ["layer_height;wall_sequence", "", ""],
            "wall_infill_order": "inner wall/outer wall/infill"
        }"#,
        &mut BTreeMap::new(),
    );

    assert!(outcome.is_ok(), "{outcome}");
    let diffs = store
        .option::<ConfigOptionStrings>("different_settings_to_system")
        .ok_or_else(|| std::io::Error::other("different_settings_to_system missing"))?;
    assert_eq!(diffs.values.len(), 3);
    assert_eq!(
        diffs.values.first().map(String::as_str),
        Some("layer_height;wall_sequence")
    );
    Ok(())
}

#[test]
fn renamed_list_uses_grammar_of_new_key() -> Result<(), Box<dyn Error>> {
    let mut store = RecordingStore::new();
    let outcome = load_str(
        &mut store,
        r#"{"legacy_settings_ids": ["PLA Silk", "ABS"]}"#,
        &mut BTreeMap::new(),
    );
    assert!(outcome.is_ok(), "{outcome}");
    assert!(!store.has("legacy_settings_ids"));
    let ids = store
        .optptr("filament_settings_id")
        .and_then(|option| option.downcast_ref::<ConfigOptionStrings>())
        .ok_or_else(|| std::io::Error::other("filament_settings_id missing"))?;
    assert_eq!(ids.values, ["PLA Silk", "ABS"]);
    Ok(())
}

#[test]
fn wall_infill_order_variants() -> Result<(), Box<dyn Error>> {
    let cases = [
        ("inner wall/outer wall/infill", Some("inner wall/outer wall"), false),
        ("outer wall/inner wall/infill", Some("outer wall/inner wall"), false),
        ("infill/inner wall/outer wall", Some("inner wall/outer wall"), true),
        ("infill/outer wall/inner wall", Some("outer wall/inner wall"), true),
        ("inner-outer-inner wall/infill", Some("inner-outer-inner wall"), false),
        ("inner-outer wall/infill", None, false),
    ];
    for (order, sequence, infill_first) in cases {
        let mut store = RecordingStore::new();
        let text = format!(r#"{{"wall_infill_order": "{order}"}}"#);
        let outcome = load_str(&mut store, &text, &mut BTreeMap::new());
        assert!(outcome.is_ok(), "{order}: {outcome}");

        let stored_sequence = store.optptr("wall_sequence").map(|option| option.serialize());
        assert_eq!(stored_sequence.as_deref(), sequence, "{order}");
        assert_eq!(store.has("is_infill_first"), infill_first, "{order}");
        assert_eq!(store.opt_serialize("wall_infill_order")?, order);
    }
    Ok(())
}

#[test]
fn missing_file_reports_parse_error() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let mut store = RecordingStore::new();
    let mut ctx = ctx(ForwardCompatibilitySubstitutionRule::Enable);
    let outcome = load_from_json_file(
        &mut store,
        &dir.path().join("non_existent.json"),
        &mut ctx,
        true,
        &mut BTreeMap::new(),
    );

    assert_eq!(outcome.code(), -1);
    assert!(outcome.reason().contains("parse_error"), "{outcome}");
    assert_eq!(store.composite_calls, 0);
    Ok(())
}

#[test]
fn malformed_json_reports_parse_failure() {
    let mut store = RecordingStore::new();
    let mut ctx = ctx(ForwardCompatibilitySubstitutionRule::Enable);
    let outcome = load_from_json_file(
        &mut store,
        &fixture("invalid.json"),
        &mut ctx,
        true,
        &mut BTreeMap::new(),
    );

    assert_eq!(outcome.code(), -1);
    assert!(outcome.reason().contains("JsonParseError"), "{outcome}");
}

#[test]
fn schemaless_store_fails() {
    let mut config = DynamicConfig::new();
    let mut ctx = ctx(ForwardCompatibilitySubstitutionRule::Enable);
    let outcome = load_from_json_str(
        &mut config,
        r#"{"version": "1.0.0", "test_key": "test_value"}"#,
        &mut ctx,
        true,
        &mut BTreeMap::new(),
    );
    assert_eq!(outcome.code(), -1);
}

#[test]
fn inherits_is_captured_or_refused() {
    let text = r#"{"inherits": "test_key", "version": "1.0.0"}"#;

    let mut store = RecordingStore::new();
    let mut key_values = BTreeMap::new();
    let mut ctx = ctx(ForwardCompatibilitySubstitutionRule::Disable);
    let outcome = load_from_json_str(&mut store, text, &mut ctx, false, &mut key_values);
    assert_eq!(outcome.code(), 0);
    assert!(outcome.reason().is_empty());
    assert_eq!(key_values.get("inherits").map(String::as_str), Some("test_key"));

    key_values.clear();
    let outcome = load_from_json_str(&mut store, text, &mut ctx, true, &mut key_values);
    assert_eq!(outcome.code(), -1);
    assert!(!outcome.reason().is_empty());
    assert!(!key_values.contains_key("inherits"));
}

#[test]
fn store_failures_are_reported_as_config_errors() {
    let mut store = BrokenStore {
        inner: RecordingStore::new(),
    };
    let mut ctx = ctx(ForwardCompatibilitySubstitutionRule::Enable);
    let outcome = load_from_json_str(
        &mut store,
        r#"{"version": "1.0.0", "test_key": "test_value"}"#,
        &mut ctx,
        true,
        &mut BTreeMap::new(),
    );

    assert_eq!(outcome.code(), -1);
    assert!(outcome.reason().contains("ConfigError"), "{outcome}");
    assert!(outcome.reason().contains("storage unavailable"), "{outcome}");
}

#[test]
fn print_preset_fixture_loads() -> Result<(), Box<dyn Error>> {
    let mut preset = PrintPresetConfig::new();
    let mut key_values = BTreeMap::new();
    let mut ctx = ctx(ForwardCompatibilitySubstitutionRule::Disable);
    let outcome = load_from_json_file(
        &mut preset,
        &fixture("print_preset.json"),
        &mut ctx,
        false,
        &mut key_values,
    );
    assert!(outcome.is_ok(), "{outcome}");
    assert!(ctx.is_empty());

    assert_eq!(key_values.get("type").map(String::as_str), Some("process"));
    assert_eq!(key_values.get("setting_id").map(String::as_str), Some("GP004"));
    assert_eq!(
        key_values.get("inherits").map(String::as_str),
        Some("fdm_process_common")
    );
    assert!(!preset.has("inherits"));

    assert_eq!(preset.opt_float("initial_layer_print_height")?, 0.25);
    assert_eq!(preset.opt_int("wall_loops")?, 3);
    assert_eq!(preset.opt_serialize("sparse_infill_density")?, "15%");
    assert_eq!(preset.opt_serialize("sparse_infill_pattern")?, "gyroid");
    assert_eq!(preset.get_abs_value("outer_wall_speed")?, 90.0);
    assert_eq!(preset.opt_serialize("nozzle_diameter")?, "0.4,0.6");
    assert_eq!(preset.opt_serialize("filament_type")?, "PLA;\"PLA Silk\"");
    assert_eq!(preset.opt_serialize("bed_shape")?, "0x0,250x0,250x250,0x250");
    assert_eq!(preset.opt_serialize("retract_length_toolchange")?, "nil,2");
    assert_eq!(preset.opt_serialize("wipe")?, "1,0");
    assert_eq!(preset.opt_string("wall_sequence")?, "inner wall/outer wall");
    assert!(!preset.opt_bool("is_infill_first")?);
    Ok(())
}

#[test]
fn load_dispatches_json_by_extension() -> Result<(), Box<dyn Error>> {
    let mut preset = PrintPresetConfig::new();
    let substitutions = preset.load(
        &fixture("project_settings.json"),
        ForwardCompatibilitySubstitutionRule::Enable,
    )?;
    assert!(substitutions.is_empty());
    assert!(preset.opt_bool("enable_support")?);
    assert_eq!(preset.opt_serialize("support_style")?, "tree_hybrid");

    let mut broken = PrintPresetConfig::new();
    let error = broken
        .load(&fixture("invalid.json"), ForwardCompatibilitySubstitutionRule::Enable)
        .err()
        .ok_or_else(|| std::io::Error::other("expected failure"))?;
    assert!(error.to_string().contains("JsonParseError"));
    Ok(())
}
