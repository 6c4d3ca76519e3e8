//! # slicer-config-options
//!
//! Typed configuration values: the [`ConfigOption`] contract, its scalar,
//! point, vector and enumeration implementations, and the text helpers
//! they share.
//!
//! All wire text is locale independent and uses `.` as the decimal
//! separator.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod enums;
pub mod errors;
pub mod escape;
pub mod locales;
pub mod option;
pub mod point;
pub mod scalar;
pub mod types;
pub mod vector;

pub use enums::{ConfigEnum, ConfigOptionEnum, ConfigOptionEnumGeneric, EnumKeysMap};
pub use errors::ConfigError;
pub use escape::{
    escape_string_cstyle, escape_strings_cstyle, unescape_string_cstyle, unescape_strings_cstyle,
};
pub use locales::{
    CNumericLocaleGuard, float_to_string_decimal_point, is_decimal_separator_point,
    string_to_double_decimal_point,
};
pub use option::{ConfigOption, ConfigOptionVectorBase};
pub use point::{ConfigOptionPoint, ConfigOptionPoint3, Vec2d, Vec3d};
pub use scalar::{
    ConfigOptionBool, ConfigOptionFloat, ConfigOptionFloatOrPercent, ConfigOptionInt,
    ConfigOptionPercent, ConfigOptionString, looks_like_true,
};
pub use types::{ConfigOptionType, DeserializationResult, DeserializationSubstitution};
pub use vector::{
    BOOL_NIL, ConfigOptionBools, ConfigOptionBoolsNullable, ConfigOptionFloats,
    ConfigOptionFloatsNullable, ConfigOptionFloatsOrPercents, ConfigOptionFloatsOrPercentsNullable,
    ConfigOptionInts, ConfigOptionIntsNullable, ConfigOptionPercents, ConfigOptionPercentsNullable,
    ConfigOptionPoints, ConfigOptionStrings, ConfigOptionVector, FloatOrPercent, NIL_TOKEN,
    VectorKind,
};

/// Returns the options crate version.
#[must_use]
pub const fn options_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
