//! Vector options, generic over element kind and nullability.

use crate::errors::ConfigError;
use crate::escape::{escape_strings_cstyle, unescape_strings_cstyle};
use crate::locales::{float_to_string_decimal_point, parse_full_float};
use crate::option::{ConfigOption, ConfigOptionVectorBase};
use crate::option_boilerplate;
use crate::point::{Vec2d, format_vec2d, parse_coordinates};
use crate::scalar::{looks_like_true, parse_bool, strip_percent};
use crate::types::{ConfigOptionType, DeserializationResult, DeserializationSubstitution};
use std::fmt;

/// Wire text for a nil slot.
pub const NIL_TOKEN: &str = "nil";

/// Element behaviour of a vector option.
pub trait VectorKind: 'static {
    /// Element type.
    type Item: Clone + fmt::Debug + PartialEq + Default + Send + Sync + 'static;

    /// Tag reported by vectors of this kind.
    const TYPE: ConfigOptionType;

    /// Sentinel stored in nil slots, if the kind supports nil.
    fn nil() -> Option<Self::Item> {
        None
    }

    /// Returns true if `item` is the nil sentinel.
    fn is_nil(item: &Self::Item) -> bool {
        Self::nil().is_some_and(|nil| *item == nil)
    }

    /// Element equality; nil slots compare equal to each other.
    fn item_eq(left: &Self::Item, right: &Self::Item) -> bool {
        left == right || (Self::is_nil(left) && Self::is_nil(right))
    }

    /// Formats one non-nil element.
    fn format_item(item: &Self::Item) -> String;

    /// Parses one trimmed token.
    fn parse_item(token: &str) -> Option<Self::Item>;

    /// Fallback element for a token that failed to parse.
    fn substitute_item(token: &str, substitution: DeserializationSubstitution) -> Option<Self::Item> {
        let _ = (token, substitution);
        None
    }

    /// Splits the wire text into element tokens.
    fn split_items(input: &str) -> Option<Vec<String>> {
        if input.trim().is_empty() {
            return Some(Vec::new());
        }
        let mut tokens: Vec<String> = input.split(',').map(|t| t.trim().to_string()).collect();
        if tokens.len() > 1 && tokens.last().is_some_and(String::is_empty) {
            tokens.pop();
        }
        Some(tokens)
    }

    /// Joins formatted elements into the wire text.
    fn join_items(tokens: &[String]) -> String {
        tokens.join(",")
    }
}

fn nan_is_nil(item: f64) -> bool {
    item.is_nan()
}

/// `f64` elements; nil is NaN.
#[derive(Debug)]
pub enum FloatsKind {}

impl VectorKind for FloatsKind {
    type Item = f64;
    const TYPE: ConfigOptionType = ConfigOptionType::Floats;

    fn nil() -> Option<f64> {
        Some(f64::NAN)
    }

    fn is_nil(item: &f64) -> bool {
        nan_is_nil(*item)
    }

    fn format_item(item: &f64) -> String {
        float_to_string_decimal_point(*item, None)
    }

    fn parse_item(token: &str) -> Option<f64> {
        parse_full_float(token)
    }
}

/// `i32` elements; nil is `i32::MAX`.
#[derive(Debug)]
pub enum IntsKind {}

impl VectorKind for IntsKind {
    type Item = i32;
    const TYPE: ConfigOptionType = ConfigOptionType::Ints;

    fn nil() -> Option<i32> {
        Some(i32::MAX)
    }

    fn format_item(item: &i32) -> String {
        item.to_string()
    }

    fn parse_item(token: &str) -> Option<i32> {
        token.parse().ok()
    }
}

/// Percentage elements; nil is NaN.
#[derive(Debug)]
pub enum PercentsKind {}

impl VectorKind for PercentsKind {
    type Item = f64;
    const TYPE: ConfigOptionType = ConfigOptionType::Percents;

    fn nil() -> Option<f64> {
        Some(f64::NAN)
    }

    fn is_nil(item: &f64) -> bool {
        nan_is_nil(*item)
    }

    fn format_item(item: &f64) -> String {
        format!("{}%", float_to_string_decimal_point(*item, None))
    }

    fn parse_item(token: &str) -> Option<f64> {
        parse_full_float(strip_percent(token).0)
    }
}

/// Element of a floats-or-percents vector.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FloatOrPercent {
    /// Numeric value.
    pub value: f64,
    /// Whether `value` is a percentage.
    pub percent: bool,
}

impl FloatOrPercent {
    /// Creates an element.
    #[must_use]
    pub const fn new(value: f64, percent: bool) -> Self {
        Self { value, percent }
    }
}

/// Absolute-or-percentage elements; nil has a NaN value.
#[derive(Debug)]
pub enum FloatsOrPercentsKind {}

impl VectorKind for FloatsOrPercentsKind {
    type Item = FloatOrPercent;
    const TYPE: ConfigOptionType = ConfigOptionType::FloatsOrPercents;

    fn nil() -> Option<FloatOrPercent> {
        Some(FloatOrPercent::new(f64::NAN, false))
    }

    fn is_nil(item: &FloatOrPercent) -> bool {
        nan_is_nil(item.value)
    }

    fn format_item(item: &FloatOrPercent) -> String {
        let mut text = float_to_string_decimal_point(item.value, None);
        if item.percent {
            text.push('%');
        }
        text
    }

    fn parse_item(token: &str) -> Option<FloatOrPercent> {
        let (number, percent) = strip_percent(token);
        parse_full_float(number).map(|value| FloatOrPercent::new(value, percent))
    }
}

/// Boolean elements stored as bytes; nil is `0xFF`.
#[derive(Debug)]
pub enum BoolsKind {}

/// Nil sentinel for boolean vectors.
pub const BOOL_NIL: u8 = 0xFF;

impl VectorKind for BoolsKind {
    type Item = u8;
    const TYPE: ConfigOptionType = ConfigOptionType::Bools;

    fn nil() -> Option<u8> {
        Some(BOOL_NIL)
    }

    fn format_item(item: &u8) -> String {
        if *item == 0 { "0" } else { "1" }.to_string()
    }

    fn parse_item(token: &str) -> Option<u8> {
        parse_bool(token).map(u8::from)
    }

    fn substitute_item(token: &str, substitution: DeserializationSubstitution) -> Option<u8> {
        match substitution {
            DeserializationSubstitution::Disabled => None,
            DeserializationSubstitution::DefaultsToFalse => Some(u8::from(looks_like_true(token))),
            DeserializationSubstitution::DefaultsToTrue => Some(1),
        }
    }
}

/// String elements, joined with `;` and quoted when needed.
#[derive(Debug)]
pub enum StringsKind {}

impl VectorKind for StringsKind {
    type Item = String;
    const TYPE: ConfigOptionType = ConfigOptionType::Strings;

    fn format_item(item: &String) -> String {
        item.clone()
    }

    fn parse_item(token: &str) -> Option<String> {
        Some(token.to_string())
    }

    fn split_items(input: &str) -> Option<Vec<String>> {
        unescape_strings_cstyle(input)
    }

    fn join_items(tokens: &[String]) -> String {
        escape_strings_cstyle(tokens)
    }
}

/// 2D point elements written as `XxY`.
#[derive(Debug)]
pub enum PointsKind {}

impl VectorKind for PointsKind {
    type Item = Vec2d;
    const TYPE: ConfigOptionType = ConfigOptionType::Points;

    fn format_item(item: &Vec2d) -> String {
        format_vec2d(*item, 'x')
    }

    fn parse_item(token: &str) -> Option<Vec2d> {
        parse_coordinates::<2>(token, &['x']).map(|[x, y]| Vec2d::new(x, y))
    }
}

/// A vector option of kind `K`; `NULLABLE` vectors accept nil slots.
pub struct ConfigOptionVector<K: VectorKind, const NULLABLE: bool> {
    /// Slot values.
    pub values: Vec<K::Item>,
}

/// Vector of floats.
pub type ConfigOptionFloats = ConfigOptionVector<FloatsKind, false>;
/// Vector of floats with nil slots.
pub type ConfigOptionFloatsNullable = ConfigOptionVector<FloatsKind, true>;
/// Vector of ints.
pub type ConfigOptionInts = ConfigOptionVector<IntsKind, false>;
/// Vector of ints with nil slots.
pub type ConfigOptionIntsNullable = ConfigOptionVector<IntsKind, true>;
/// Vector of percentages.
pub type ConfigOptionPercents = ConfigOptionVector<PercentsKind, false>;
/// Vector of percentages with nil slots.
pub type ConfigOptionPercentsNullable = ConfigOptionVector<PercentsKind, true>;
/// Vector of absolute-or-percentage values.
pub type ConfigOptionFloatsOrPercents = ConfigOptionVector<FloatsOrPercentsKind, false>;
/// Vector of absolute-or-percentage values with nil slots.
pub type ConfigOptionFloatsOrPercentsNullable = ConfigOptionVector<FloatsOrPercentsKind, true>;
/// Vector of booleans.
pub type ConfigOptionBools = ConfigOptionVector<BoolsKind, false>;
/// Vector of booleans with nil slots.
pub type ConfigOptionBoolsNullable = ConfigOptionVector<BoolsKind, true>;
/// Vector of strings.
pub type ConfigOptionStrings = ConfigOptionVector<StringsKind, false>;
/// Vector of 2D points.
pub type ConfigOptionPoints = ConfigOptionVector<PointsKind, false>;

impl<K: VectorKind, const NULLABLE: bool> ConfigOptionVector<K, NULLABLE> {
    /// Creates the option from its slots.
    #[must_use]
    pub const fn new(values: Vec<K::Item>) -> Self {
        Self { values }
    }

    /// Creates `len` copies of `item`.
    #[must_use]
    pub fn with_len(len: usize, item: &K::Item) -> Self {
        Self {
            values: vec![item.clone(); len],
        }
    }

    /// Returns slot `index`, falling back to the first slot and then the
    /// element default when out of range.
    #[must_use]
    pub fn get_at(&self, index: usize) -> K::Item {
        self.values
            .get(index)
            .or_else(|| self.values.first())
            .cloned()
            .unwrap_or_default()
    }

    /// Nil sentinel, present only for nullable vectors of a nil-capable kind.
    #[must_use]
    pub fn nil_value() -> Option<K::Item> {
        if NULLABLE { K::nil() } else { None }
    }

    fn parse_tokens(
        input: &str,
        substitution: DeserializationSubstitution,
    ) -> Option<(Vec<K::Item>, bool)> {
        let tokens = K::split_items(input)?;
        let mut items = Vec::with_capacity(tokens.len());
        let mut substituted = false;
        for token in tokens {
            if K::nil().is_some() && token.eq_ignore_ascii_case(NIL_TOKEN) {
                if let Some(nil) = Self::nil_value() {
                    items.push(nil);
                } else {
                    // nil is never valid in a non-nullable numeric or boolean vector
                    items.push(K::substitute_item(&token, substitution)?);
                    substituted = true;
                }
                continue;
            }
            match K::parse_item(&token) {
                Some(item) => items.push(item),
                None => {
                    items.push(K::substitute_item(&token, substitution)?);
                    substituted = true;
                },
            }
        }
        Some((items, substituted))
    }
}

impl ConfigOptionBools {
    /// Creates a boolean vector from plain booleans.
    #[must_use]
    pub fn from_bools(values: &[bool]) -> Self {
        Self::new(values.iter().map(|&v| u8::from(v)).collect())
    }

    /// Boolean value of slot `index`, with `get_at` fallback rules.
    #[must_use]
    pub fn get_bool_at(&self, index: usize) -> bool {
        self.get_at(index) != 0
    }
}

impl ConfigOptionBoolsNullable {
    /// Creates a nullable boolean vector; `None` becomes nil.
    #[must_use]
    pub fn from_optional_bools(values: &[Option<bool>]) -> Self {
        Self::new(
            values
                .iter()
                .map(|v| v.map_or(BOOL_NIL, u8::from))
                .collect(),
        )
    }
}

impl ConfigOptionStrings {
    /// Creates a string vector from anything string-like.
    pub fn from_strs<S: AsRef<str>>(values: &[S]) -> Self {
        Self::new(values.iter().map(|v| v.as_ref().to_string()).collect())
    }
}

impl<const NULLABLE: bool> ConfigOptionVector<FloatsOrPercentsKind, NULLABLE> {
    /// Resolves slot `index` against `ratio_over`.
    #[must_use]
    pub fn get_abs_value(&self, index: usize, ratio_over: f64) -> f64 {
        let item = self.get_at(index);
        if item.percent {
            ratio_over * item.value / 100.0
        } else {
            item.value
        }
    }
}

impl<K: VectorKind, const NULLABLE: bool> Clone for ConfigOptionVector<K, NULLABLE> {
    fn clone(&self) -> Self {
        Self {
            values: self.values.clone(),
        }
    }
}

impl<K: VectorKind, const NULLABLE: bool> Default for ConfigOptionVector<K, NULLABLE> {
    fn default() -> Self {
        Self { values: Vec::new() }
    }
}

impl<K: VectorKind, const NULLABLE: bool> fmt::Debug for ConfigOptionVector<K, NULLABLE> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ConfigOptionVector")
            .field("type", &K::TYPE)
            .field("nullable", &NULLABLE)
            .field("values", &self.values)
            .finish()
    }
}

impl<K: VectorKind, const NULLABLE: bool> PartialEq for ConfigOptionVector<K, NULLABLE> {
    fn eq(&self, other: &Self) -> bool {
        self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(&other.values)
                .all(|(left, right)| K::item_eq(left, right))
    }
}

impl<K: VectorKind, const NULLABLE: bool> ConfigOption for ConfigOptionVector<K, NULLABLE>
where
    Self: Send + Sync,
{
    option_boilerplate!();

    fn option_type(&self) -> ConfigOptionType {
        K::TYPE
    }

    fn serialize(&self) -> String {
        K::join_items(&self.vserialize())
    }

    fn deserialize(&mut self, input: &str, append: bool) -> bool {
        self.deserialize_with_substitutions(input, append, DeserializationSubstitution::Disabled)
            != DeserializationResult::Failed
    }

    fn deserialize_with_substitutions(
        &mut self,
        input: &str,
        append: bool,
        substitution: DeserializationSubstitution,
    ) -> DeserializationResult {
        let Some((items, substituted)) = Self::parse_tokens(input, substitution) else {
            return DeserializationResult::Failed;
        };
        if !append {
            self.values.clear();
        }
        self.values.extend(items);
        if substituted {
            DeserializationResult::Substituted
        } else {
            DeserializationResult::Loaded
        }
    }

    fn is_nullable(&self) -> bool {
        NULLABLE
    }

    fn is_nil(&self) -> bool {
        NULLABLE && self.values.iter().all(K::is_nil)
    }

    fn as_vector(&self) -> Option<&dyn ConfigOptionVectorBase> {
        Some(self)
    }

    fn as_vector_mut(&mut self) -> Option<&mut dyn ConfigOptionVectorBase> {
        Some(self)
    }
}

impl<K: VectorKind, const NULLABLE: bool> ConfigOptionVectorBase for ConfigOptionVector<K, NULLABLE>
where
    Self: ConfigOption,
{
    fn size(&self) -> usize {
        self.values.len()
    }

    fn is_nil_at(&self, index: usize) -> bool {
        NULLABLE && self.values.get(index).is_some_and(K::is_nil)
    }

    fn vserialize(&self) -> Vec<String> {
        self.values
            .iter()
            .map(|item| {
                if NULLABLE && K::is_nil(item) {
                    NIL_TOKEN.to_string()
                } else {
                    K::format_item(item)
                }
            })
            .collect()
    }

    fn resize(&mut self, len: usize, fill: Option<&dyn ConfigOption>) -> Result<(), ConfigError> {
        let fill_item = match fill {
            None => K::Item::default(),
            Some(fill) => match fill.as_any().downcast_ref::<Self>() {
                Some(fill) => fill.values.first().cloned().unwrap_or_default(),
                None => {
                    return Err(ConfigError::bad_option_type(
                        "",
                        K::TYPE,
                        fill.option_type(),
                    ));
                },
            },
        };
        self.values.resize(len, fill_item);
        Ok(())
    }

    fn clear(&mut self) {
        self.values.clear();
    }

    fn nullify(&mut self) -> bool {
        let Some(nil) = Self::nil_value() else {
            return false;
        };
        for slot in &mut self.values {
            *slot = nil.clone();
        }
        true
    }
}
