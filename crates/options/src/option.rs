//! The polymorphic option value contract.

use crate::errors::ConfigError;
use crate::types::{ConfigOptionType, DeserializationResult, DeserializationSubstitution};
use std::any::Any;
use std::fmt;

/// A single typed configuration value.
///
/// Every concrete option reports one [`ConfigOptionType`], converts to and
/// from its wire text, and can be cloned and compared through a trait
/// object.
pub trait ConfigOption: fmt::Debug + Send + Sync + Any + 'static {
    /// Runtime type tag.
    fn option_type(&self) -> ConfigOptionType;

    /// Wire representation of the current value.
    fn serialize(&self) -> String;

    /// Parses `input` into this option.
    ///
    /// With `append` the parsed items extend a vector (or a string); plain
    /// numeric and boolean scalars reject `append`. Returns false and leaves
    /// the value unchanged when the input cannot be parsed.
    fn deserialize(&mut self, input: &str, append: bool) -> bool;

    /// Like [`ConfigOption::deserialize`], substituting booleans that fail to
    /// parse when `substitution` allows it.
    fn deserialize_with_substitutions(
        &mut self,
        input: &str,
        append: bool,
        substitution: DeserializationSubstitution,
    ) -> DeserializationResult {
        let _ = substitution;
        if self.deserialize(input, append) {
            DeserializationResult::Loaded
        } else {
            DeserializationResult::Failed
        }
    }

    /// Copies the value of `other`, which must be of the same concrete type.
    ///
    /// # Errors
    /// Returns `BadOptionType` when the dynamic types differ.
    fn set(&mut self, other: &dyn ConfigOption) -> Result<(), ConfigError>;

    /// Deep copy behind a fresh box.
    fn clone_box(&self) -> Box<dyn ConfigOption>;

    /// Structural equality: same dynamic type and equal values.
    fn equals(&self, other: &dyn ConfigOption) -> bool;

    /// Upcast for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete type.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Integer view of the value.
    ///
    /// # Errors
    /// Returns `BadOptionType` for options without an integer view.
    fn get_int(&self) -> Result<i32, ConfigError> {
        Err(ConfigError::bad_option_type("", "int", self.option_type()))
    }

    /// Floating point view of the value.
    ///
    /// # Errors
    /// Returns `BadOptionType` for options without a numeric view.
    fn get_float(&self) -> Result<f64, ConfigError> {
        Err(ConfigError::bad_option_type("", "float", self.option_type()))
    }

    /// Boolean view of the value.
    ///
    /// # Errors
    /// Returns `BadOptionType` for options without a boolean view.
    fn get_bool(&self) -> Result<bool, ConfigError> {
        Err(ConfigError::bad_option_type("", "bool", self.option_type()))
    }

    /// Overwrites the value from an integer, used for enums.
    ///
    /// # Errors
    /// Returns `BadOptionType` for options that cannot be set from an integer.
    fn set_int(&mut self, value: i32) -> Result<(), ConfigError> {
        let _ = value;
        Err(ConfigError::bad_option_type("", "int", self.option_type()))
    }

    /// Returns true for vector options.
    fn is_vector(&self) -> bool {
        self.option_type().is_vector()
    }

    /// Returns true for options whose slots may hold a nil sentinel.
    fn is_nullable(&self) -> bool {
        false
    }

    /// Returns true when every slot holds the nil sentinel.
    fn is_nil(&self) -> bool {
        false
    }

    /// Vector view of this option.
    fn as_vector(&self) -> Option<&dyn ConfigOptionVectorBase> {
        None
    }

    /// Mutable vector view of this option.
    fn as_vector_mut(&mut self) -> Option<&mut dyn ConfigOptionVectorBase> {
        None
    }
}

/// Operations shared by all vector options regardless of element type.
pub trait ConfigOptionVectorBase {
    /// Number of slots.
    fn size(&self) -> usize;

    /// Returns true if the vector holds no slots.
    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Returns true if slot `index` holds the nil sentinel.
    fn is_nil_at(&self, index: usize) -> bool;

    /// Serializes every slot individually.
    fn vserialize(&self) -> Vec<String>;

    /// Resizes to `len` slots, filling new slots from the first element of
    /// `fill` or from the element default.
    ///
    /// # Errors
    /// Returns `BadOptionType` when `fill` is a different vector type.
    fn resize(&mut self, len: usize, fill: Option<&dyn ConfigOption>) -> Result<(), ConfigError>;

    /// Removes every slot.
    fn clear(&mut self);

    /// Sets every slot to nil. Returns false for non-nullable vectors.
    fn nullify(&mut self) -> bool;
}

impl dyn ConfigOption {
    /// Borrows the concrete option type.
    #[must_use]
    pub fn downcast_ref<T: ConfigOption>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Mutably borrows the concrete option type.
    pub fn downcast_mut<T: ConfigOption>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

impl PartialEq for dyn ConfigOption {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl Clone for Box<dyn ConfigOption> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Expands to the `set`, `clone_box`, `equals` and `as_any*` methods for a
/// concrete option type that is `Clone + PartialEq`.
#[macro_export]
macro_rules! option_boilerplate {
    () => {
        fn set(
            &mut self,
            other: &dyn $crate::option::ConfigOption,
        ) -> ::std::result::Result<(), $crate::errors::ConfigError> {
            match other.as_any().downcast_ref::<Self>() {
                Some(other) => {
                    self.clone_from(other);
                    Ok(())
                },
                None => Err($crate::errors::ConfigError::bad_option_type(
                    "",
                    $crate::option::ConfigOption::option_type(self),
                    other.option_type(),
                )),
            }
        }

        fn clone_box(&self) -> ::std::boxed::Box<dyn $crate::option::ConfigOption> {
            ::std::boxed::Box::new(self.clone())
        }

        fn equals(&self, other: &dyn $crate::option::ConfigOption) -> bool {
            other
                .as_any()
                .downcast_ref::<Self>()
                .is_some_and(|other| self == other)
        }

        fn as_any(&self) -> &dyn ::std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
            self
        }
    };
}
