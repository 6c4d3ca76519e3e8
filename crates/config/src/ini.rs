//! INI text format: one `key = value` per line, `#` comments, no sections.

use crate::load::{read_config_file, write_config_file};
use crate::store::ConfigBase;
use crate::substitution::ConfigSubstitutionContext;
use slicer_config_options::{CNumericLocaleGuard, ConfigError, ConfigOptionType};
use std::fmt::Write as _;
use std::path::Path;

/// First line written by [`to_ini_string`], before the version.
pub const GENERATED_BY: &str = "generated by slicer-config";

/// Parses INI text into `config`, then runs the composite hook once.
///
/// A `#` at the start of a line, or inside a value after whitespace or
/// before whitespace, starts a comment unless it sits within double quotes.
/// String values wrapped in double quotes are unquoted.
///
/// # Errors
/// Returns `Configuration` for lines without `=` and propagates
/// [`ConfigBase::set_deserialize`] failures.
pub fn load_from_ini_str<C: ConfigBase + ?Sized>(
    config: &mut C,
    text: &str,
    ctx: &mut ConfigSubstitutionContext,
) -> Result<(), ConfigError> {
    let _locale = CNumericLocaleGuard::new();
    let mut applied = 0_usize;
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            tracing::error!(line = index + 1, "malformed ini line");
            return Err(ConfigError::configuration(format!(
                "malformed ini line {}: {raw}",
                index + 1
            )));
        };
        let key = key.trim();
        let value = strip_trailing_comment(value.trim_start()).trim_end();
        let value = if is_string_option(config, key) {
            unquote(value)
        } else {
            value
        };
        config.set_deserialize(key, value, ctx, false)?;
        applied += 1;
    }
    config.handle_legacy_composite()?;
    tracing::debug!(
        keys = applied,
        substitutions = ctx.substitutions().len(),
        "loaded ini config"
    );
    Ok(())
}

/// Reads and parses an INI file.
///
/// # Errors
/// I/O failures become `Configuration`; see [`load_from_ini_str`].
pub fn load_from_ini_file<C: ConfigBase + ?Sized>(
    config: &mut C,
    path: &Path,
    ctx: &mut ConfigSubstitutionContext,
) -> Result<(), ConfigError> {
    tracing::debug!(path = %path.display(), "loading ini config");
    let text = read_config_file(path)?;
    load_from_ini_str(config, &text, ctx)
}

/// Converts a config block embedded as `;` comments (G-code trailer, 3MF
/// metadata) into plain INI text.
///
/// Leading blanks and one `;` are stripped from every line, CRLF becomes
/// LF, empty lines and `generated by` banners are dropped.
#[must_use]
pub fn uncomment(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let line = line.trim_start_matches([' ', '\t']);
        let line = line.strip_prefix(';').unwrap_or(line);
        let line = line.trim_start_matches([' ', '\t']);
        if line.is_empty() || line.starts_with("generated by ") {
            continue;
        }
        output.push_str(line);
        output.push('\n');
    }
    output
}

/// Renders `config` as INI text with a banner and sorted keys.
///
/// String values the loader would trim or cut at a comment are written in
/// double quotes.
#[must_use]
pub fn to_ini_string<C: ConfigBase + ?Sized>(config: &C) -> String {
    let _locale = CNumericLocaleGuard::new();
    let mut output = format!("# {GENERATED_BY} {}\n", env!("CARGO_PKG_VERSION"));
    let mut keys = config.keys();
    keys.sort();
    for key in keys {
        let Some(option) = config.optptr(&key) else {
            continue;
        };
        let text = option.serialize();
        if option.option_type() == ConfigOptionType::String && needs_quotes(&text) {
            let _ = writeln!(output, "{key} = \"{}\"", text.replace('"', "\\\""));
        } else {
            let _ = writeln!(output, "{key} = {text}");
        }
    }
    output
}

/// Writes `config` to `path` as INI text.
///
/// # Errors
/// I/O failures become `Configuration`.
pub fn save<C: ConfigBase + ?Sized>(config: &C, path: &Path) -> Result<(), ConfigError> {
    write_config_file(path, &to_ini_string(config))?;
    tracing::debug!(path = %path.display(), keys = config.keys().len(), "saved ini config");
    Ok(())
}

/// Cuts a trailing `#` comment off a value.
///
/// The `#` must be outside double quotes, not the first character, and
/// either follow whitespace or precede whitespace or the end, so colour
/// lists like `#FF0000;#00FF00` survive.
fn strip_trailing_comment(value: &str) -> &str {
    let mut in_quotes = false;
    let mut escaped = false;
    let mut previous_blank = false;
    let mut chars = value.char_indices().peekable();
    while let Some((index, ch)) = chars.next() {
        match ch {
            '\\' if in_quotes => escaped = !escaped,
            '"' if !escaped => in_quotes = !in_quotes,
            '#' if !in_quotes && index > 0 => {
                let next_blank = chars.peek().is_none_or(|(_, next)| next.is_whitespace());
                if previous_blank || next_blank {
                    return value.get(..index).unwrap_or(value);
                }
            },
            _ => {},
        }
        if ch != '\\' {
            escaped = false;
        }
        previous_blank = ch.is_whitespace();
    }
    value
}

/// Returns true when `text` would not survive [`load_from_ini_str`] as is.
fn needs_quotes(text: &str) -> bool {
    text != text.trim()
        || strip_trailing_comment(text).len() != text.len()
        || (text.len() >= 2 && text.starts_with('"') && text.ends_with('"'))
}

/// Drops one pair of surrounding double quotes; escapes inside are left for
/// the string option's own unescaping.
fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(value)
}

fn is_string_option<C: ConfigBase + ?Sized>(config: &C, key: &str) -> bool {
    config.def().is_some_and(|def| {
        def.resolve_key(key)
            .and_then(|canonical| def.get(canonical))
            .is_some_and(|entry| entry.option_type == ConfigOptionType::String)
    })
}
