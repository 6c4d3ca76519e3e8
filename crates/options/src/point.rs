//! Point-valued options.

use crate::locales::{float_to_string_decimal_point, parse_full_float};
use crate::option::ConfigOption;
use crate::option_boilerplate;
use crate::types::ConfigOptionType;
use serde::{Deserialize, Serialize};

/// 2D coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2d {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
}

impl Vec2d {
    /// Creates a point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// 3D coordinate triple.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3d {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl Vec3d {
    /// Creates a point.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Parses `N` coordinates separated by any one of `separators`.
pub(crate) fn parse_coordinates<const N: usize>(
    input: &str,
    separators: &[char],
) -> Option<[f64; N]> {
    for &separator in separators {
        let parts: Vec<&str> = input.split(separator).collect();
        if parts.len() != N {
            continue;
        }
        let mut out = [0.0; N];
        let mut parsed = true;
        for (slot, part) in out.iter_mut().zip(&parts) {
            match parse_full_float(part) {
                Some(value) => *slot = value,
                None => {
                    parsed = false;
                    break;
                },
            }
        }
        if parsed {
            return Some(out);
        }
    }
    None
}

pub(crate) fn format_vec2d(point: Vec2d, separator: char) -> String {
    format!(
        "{}{separator}{}",
        float_to_string_decimal_point(point.x, None),
        float_to_string_decimal_point(point.y, None)
    )
}

/// A single 2D point serialized as `x,y`.
///
/// Parsing also accepts the `x`-separated form (`200x200`).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConfigOptionPoint {
    /// Current value.
    pub value: Vec2d,
}

impl ConfigOptionPoint {
    /// Creates the option.
    #[must_use]
    pub const fn new(value: Vec2d) -> Self {
        Self { value }
    }
}

impl ConfigOption for ConfigOptionPoint {
    option_boilerplate!();

    fn option_type(&self) -> ConfigOptionType {
        ConfigOptionType::Point
    }

    fn serialize(&self) -> String {
        format_vec2d(self.value, ',')
    }

    fn deserialize(&mut self, input: &str, append: bool) -> bool {
        if append {
            return false;
        }
        match parse_coordinates::<2>(input, &[',', 'x']) {
            Some([x, y]) => {
                self.value = Vec2d::new(x, y);
                true
            },
            None => false,
        }
    }
}

/// A single 3D point serialized as `x,y,z`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConfigOptionPoint3 {
    /// Current value.
    pub value: Vec3d,
}

impl ConfigOptionPoint3 {
    /// Creates the option.
    #[must_use]
    pub const fn new(value: Vec3d) -> Self {
        Self { value }
    }
}

impl ConfigOption for ConfigOptionPoint3 {
    option_boilerplate!();

    fn option_type(&self) -> ConfigOptionType {
        ConfigOptionType::Point3
    }

    fn serialize(&self) -> String {
        format!(
            "{},{},{}",
            float_to_string_decimal_point(self.value.x, None),
            float_to_string_decimal_point(self.value.y, None),
            float_to_string_decimal_point(self.value.z, None)
        )
    }

    fn deserialize(&mut self, input: &str, append: bool) -> bool {
        if append {
            return false;
        }
        match parse_coordinates::<3>(input, &[',']) {
            Some([x, y, z]) => {
                self.value = Vec3d::new(x, y, z);
                true
            },
            None => false,
        }
    }
}
