//! Secret detection for option keys and env variables.
//!
//! Printer host presets carry credentials (`printhost_apikey`,
//! `printhost_password`); their values must never reach error metadata or
//! logs.

/// The redacted placeholder string.
pub const REDACTED: &str = "[REDACTED]";

/// Checks if an option key or env variable name likely holds a secret.
///
/// Matching is case-insensitive.
///
/// # Examples
///
/// ```
/// use slicer_config_shared::is_secret_key;
///
/// assert!(is_secret_key("printhost_apikey"));
/// assert!(is_secret_key("SLIC3R_PRINTHOST_PASSWORD"));
/// assert!(!is_secret_key("layer_height"));
/// ```
pub fn is_secret_key(key: &str) -> bool {
    let key = key.to_ascii_uppercase();
    key.contains("APIKEY")
        || key.contains("API_KEY")
        || key.contains("TOKEN")
        || key.contains("SECRET")
        || key.contains("PASSWORD")
        || key.contains("CREDENTIAL")
}

/// Returns [`REDACTED`] for secret keys and the value otherwise.
///
/// # Examples
///
/// ```
/// use slicer_config_shared::redact_if_secret;
///
/// assert_eq!(redact_if_secret("printhost_apikey", "abc"), "[REDACTED]");
/// assert_eq!(redact_if_secret("wall_loops", "3"), "3");
/// ```
pub fn redact_if_secret(key: &str, value: &str) -> String {
    if is_secret_key(key) {
        REDACTED.to_string()
    } else {
        value.to_string()
    }
}
