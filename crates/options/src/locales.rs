//! Locale-independent numeric formatting and parsing.
//!
//! Serialized configuration always uses `.` as the decimal separator. Rust's
//! own formatting never consults the process locale; the only ambient state
//! is a per-thread decimal separator a host UI may install for display.
//! Stores hold a [`CNumericLocaleGuard`] while they serialize or parse, which
//! pins that separator to `.` and restores the previous one on drop.

use std::cell::Cell;
use std::marker::PhantomData;

thread_local! {
    static DECIMAL_SEPARATOR: Cell<char> = const { Cell::new('.') };
}

/// Sets the current thread's display decimal separator and returns the previous one.
pub fn set_thread_decimal_separator(separator: char) -> char {
    DECIMAL_SEPARATOR.with(|cell| cell.replace(separator))
}

/// Returns true if the current thread formats decimals with `.`.
#[must_use]
pub fn is_decimal_separator_point() -> bool {
    DECIMAL_SEPARATOR.with(|cell| cell.get() == '.')
}

/// Scoped override forcing the thread's decimal separator to `.`.
///
/// The guard is tied to the thread that created it.
#[derive(Debug)]
#[must_use = "the separator is restored as soon as the guard is dropped"]
pub struct CNumericLocaleGuard {
    previous: char,
    _thread_bound: PhantomData<*const ()>,
}

impl CNumericLocaleGuard {
    /// Installs `.` as the separator until the guard is dropped.
    pub fn new() -> Self {
        Self {
            previous: set_thread_decimal_separator('.'),
            _thread_bound: PhantomData,
        }
    }
}

impl Default for CNumericLocaleGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CNumericLocaleGuard {
    fn drop(&mut self) {
        set_thread_decimal_separator(self.previous);
    }
}

/// Formats `value` with a `.` separator.
///
/// Without `precision` the shortest text that parses back to the same value
/// is produced, switching to exponent notation for very large or very small
/// magnitudes (`1e+308`). With `precision` the value is printed in fixed
/// notation with that many fractional digits. Negative zero prints as zero.
#[must_use]
pub fn float_to_string_decimal_point(value: f64, precision: Option<usize>) -> String {
    let value = if value == 0.0 { 0.0 } else { value };
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    match precision {
        Some(precision) => format!("{value:.precision$}"),
        None => format_general(value),
    }
}

fn format_general(value: f64) -> String {
    let scientific = format!("{value:e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return value.to_string();
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if (-5..17).contains(&exponent) {
        return value.to_string();
    }
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs())
}

/// Parses a leading floating point number, ignoring leading whitespace.
///
/// Returns NaN when no number could be read. When `consumed` is provided it
/// receives the byte offset just past the parsed number (zero on failure).
pub fn string_to_double_decimal_point(input: &str, consumed: Option<&mut usize>) -> f64 {
    let start = input.len() - input.trim_start().len();
    let end = start + scan_float(&input[start..]);
    let parsed = if end > start {
        input[start..end].parse::<f64>().ok()
    } else {
        None
    };
    if let Some(consumed) = consumed {
        *consumed = if parsed.is_some() { end } else { 0 };
    }
    parsed.unwrap_or(f64::NAN)
}

/// Parses `input` as a complete number, allowing surrounding whitespace only.
#[must_use]
pub fn parse_full_float(input: &str) -> Option<f64> {
    let mut consumed = 0;
    let value = string_to_double_decimal_point(input, Some(&mut consumed));
    if consumed == 0 || !input[consumed..].trim().is_empty() {
        return None;
    }
    Some(value)
}

/// Length of the longest prefix shaped like `[+-]digits[.digits][(e|E)[+-]digits]`.
fn scan_float(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut index = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        index += 1;
    }
    let integer_start = index;
    while bytes.get(index).is_some_and(u8::is_ascii_digit) {
        index += 1;
    }
    let mut digits = index - integer_start;
    if bytes.get(index) == Some(&b'.') {
        let fraction_start = index + 1;
        let mut cursor = fraction_start;
        while bytes.get(cursor).is_some_and(u8::is_ascii_digit) {
            cursor += 1;
        }
        digits += cursor - fraction_start;
        if digits > 0 {
            index = cursor;
        }
    }
    if digits == 0 {
        return 0;
    }
    if matches!(bytes.get(index), Some(b'e' | b'E')) {
        let mut cursor = index + 1;
        if matches!(bytes.get(cursor), Some(b'+' | b'-')) {
            cursor += 1;
        }
        let exponent_start = cursor;
        while bytes.get(cursor).is_some_and(u8::is_ascii_digit) {
            cursor += 1;
        }
        if cursor > exponent_start {
            index = cursor;
        }
    }
    index
}
