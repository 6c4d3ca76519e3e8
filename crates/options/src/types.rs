//! Runtime type tags for option values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of option shapes.
///
/// Nullable vectors report the same tag as their non-nullable counterpart;
/// nullability is a separate capability (`ConfigOption::is_nullable`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigOptionType {
    /// Single `f64`.
    Float,
    /// Vector of `f64`.
    Floats,
    /// Single `i32`.
    Int,
    /// Vector of `i32`.
    Ints,
    /// Single string.
    String,
    /// Vector of strings.
    Strings,
    /// Single percentage.
    Percent,
    /// Vector of percentages.
    Percents,
    /// Absolute value or percentage.
    FloatOrPercent,
    /// Vector of absolute values or percentages.
    FloatsOrPercents,
    /// 2D point.
    Point,
    /// Vector of 2D points.
    Points,
    /// 3D point.
    Point3,
    /// Single boolean.
    Bool,
    /// Vector of booleans.
    Bools,
    /// Enumeration bound to a Rust enum type.
    Enum,
    /// Enumeration carrying a raw integer and a shared name table.
    EnumGeneric,
}

impl ConfigOptionType {
    /// Returns true for vector shapes.
    #[must_use]
    pub const fn is_vector(self) -> bool {
        matches!(
            self,
            Self::Floats
                | Self::Ints
                | Self::Strings
                | Self::Percents
                | Self::FloatsOrPercents
                | Self::Points
                | Self::Bools
        )
    }

    /// Returns true when a nullable variant of this shape exists.
    #[must_use]
    pub const fn supports_nil(self) -> bool {
        matches!(
            self,
            Self::Floats | Self::Ints | Self::Percents | Self::FloatsOrPercents | Self::Bools
        )
    }

    /// Returns true for both enumeration shapes.
    #[must_use]
    pub const fn is_enum(self) -> bool {
        matches!(self, Self::Enum | Self::EnumGeneric)
    }

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Floats => "floats",
            Self::Int => "int",
            Self::Ints => "ints",
            Self::String => "string",
            Self::Strings => "strings",
            Self::Percent => "percent",
            Self::Percents => "percents",
            Self::FloatOrPercent => "float_or_percent",
            Self::FloatsOrPercents => "floats_or_percents",
            Self::Point => "point",
            Self::Points => "points",
            Self::Point3 => "point3",
            Self::Bool => "bool",
            Self::Bools => "bools",
            Self::Enum => "enum",
            Self::EnumGeneric => "enum_generic",
        }
    }
}

impl fmt::Display for ConfigOptionType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Outcome of a deserialization that may fall back to a substitute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeserializationResult {
    /// The input could not be parsed; the value is unchanged.
    Failed,
    /// The input parsed cleanly.
    Loaded,
    /// At least one element was replaced by a fallback.
    Substituted,
}

/// Fallback used for boolean elements that fail to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeserializationSubstitution {
    /// Do not substitute; fail instead.
    Disabled,
    /// Substitute `false`.
    DefaultsToFalse,
    /// Substitute `true`.
    DefaultsToTrue,
}
