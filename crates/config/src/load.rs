//! File access and format detection shared by the INI and JSON loaders.

use serde::{Deserialize, Serialize};
use slicer_config_options::ConfigError;
use std::path::Path;

/// On-disk preset format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigFormat {
    /// `key = value` lines.
    Ini,
    /// Flat JSON object.
    Json,
}

/// Picks the format from the file extension: `.json` is JSON, anything
/// else (including `.ini`, `.gcode` and no extension) is INI.
#[must_use]
pub fn detect_config_format(path: &Path) -> ConfigFormat {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("json") => ConfigFormat::Json,
        _ => ConfigFormat::Ini,
    }
}

pub(crate) fn read_config_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|error| {
        let message = match error.kind() {
            std::io::ErrorKind::NotFound => {
                format!("config file not found: {}", path.display())
            },
            std::io::ErrorKind::PermissionDenied => {
                format!("permission denied reading config file: {}", path.display())
            },
            _ => format!("failed to read config file {}: {error}", path.display()),
        };
        tracing::error!(path = %path.display(), %error, "config read failed");
        ConfigError::configuration(message)
    })
}

pub(crate) fn write_config_file(path: &Path, text: &str) -> Result<(), ConfigError> {
    std::fs::write(path, text).map_err(|error| {
        tracing::error!(path = %path.display(), %error, "config write failed");
        ConfigError::configuration(format!(
            "failed to write config file {}: {error}",
            path.display()
        ))
    })
}
