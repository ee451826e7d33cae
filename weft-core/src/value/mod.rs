//! Value Model
//!
//! Reactive state is dynamically shaped: an object property may hold a
//! number today and a nested array tomorrow. [`Value`] is the dynamic value
//! that flows through reads and writes.
//!
//! # Compounds and observables
//!
//! A compound value appears in two forms:
//!
//! - [`Value::Compound`] holds a [`Raw`] handle, the caller's plain data.
//!   Reads and writes through it are invisible to the runtime.
//! - [`Value::Observable`] holds an [`Observable`] wrapper around a raw value.
//!   Reads through it record dependencies and writes fire reactions.
//!
//! Reading a compound out of an observable always yields the observable form,
//! so nested structures are tracked at every level.
//!
//! # Equality
//!
//! `PartialEq` on `Value` is strict equality: scalars compare by value
//! (`NaN` is unequal to itself), compounds and observables by identity. A raw
//! value and its wrapper are not equal. This is the comparison writes use to
//! decide whether a value actually changed.

mod buffer;
mod json;
mod key;
mod raw;

use std::rc::Rc;

pub use buffer::{BufferKind, NumericBuffer};
pub use key::{MapKey, PropertyKey};
pub use raw::{Compound, ContainerKind, Raw, RawId};
pub(crate) use raw::WeakRaw;

use crate::reactive::Observable;

/// A dynamically typed value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absence marker: what reading a missing key yields.
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    /// Unwrapped compound data.
    Compound(Raw),
    /// Tracking wrapper around compound data.
    Observable(Observable),
}

impl Value {
    /// Short name of the value's type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Str(_) => "string",
            Self::Compound(_) => "compound",
            Self::Observable(_) => "observable",
        }
    }

    /// Check for the absence marker.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// True for raw compounds and observables alike.
    pub fn is_compound(&self) -> bool {
        matches!(self, Self::Compound(_) | Self::Observable(_))
    }

    /// Check for a tracking wrapper.
    pub fn is_observable(&self) -> bool {
        matches!(self, Self::Observable(_))
    }

    /// The boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The number, if this is one. No conversion is attempted.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The string slice, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The wrapper, if this is an observable.
    pub fn as_observable(&self) -> Option<&Observable> {
        match self {
            Self::Observable(observable) => Some(observable),
            _ => None,
        }
    }

    /// The raw value behind a compound, unwrapping observables.
    pub fn as_raw(&self) -> Option<&Raw> {
        match self {
            Self::Compound(raw) => Some(raw),
            Self::Observable(observable) => Some(observable.raw()),
            _ => None,
        }
    }

    /// Numeric conversion used when storing into a numeric buffer.
    /// Compounds have no numeric value.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Self::Undefined => Some(f64::NAN),
            Self::Null => Some(0.0),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Number(n) => Some(*n),
            Self::Str(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Some(0.0)
                } else {
                    Some(trimmed.parse().unwrap_or(f64::NAN))
                }
            }
            Self::Compound(_) | Self::Observable(_) => None,
        }
    }

    /// Short human-readable rendering for error messages.
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Str(s) => s.to_string(),
            Self::Number(n) => Self::format_number(*n),
            Self::Bool(b) => b.to_string(),
            other => other.type_name().to_string(),
        }
    }

    /// Render a number the way it would appear as a property name:
    /// integral values drop the fractional part.
    pub(crate) fn format_number(n: f64) -> String {
        if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e21 {
            format!("{}", n as i128)
        } else if n.is_nan() {
            "NaN".to_string()
        } else if n.is_infinite() {
            if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
        } else {
            n.to_string()
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Compound(a), Self::Compound(b)) => a.ptr_eq(b),
            (Self::Observable(a), Self::Observable(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

macro_rules! impl_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(n: $ty) -> Self {
                    Self::Number(n as f64)
                }
            }
        )*
    };
}

impl_from_number!(i8, i16, i32, i64, u8, u16, u32, u64, usize, f32, f64);

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(Rc::from(s))
    }
}

impl From<Rc<str>> for Value {
    fn from(s: Rc<str>) -> Self {
        Self::Str(s)
    }
}

impl From<Raw> for Value {
    fn from(raw: Raw) -> Self {
        Self::Compound(raw)
    }
}

impl From<&Raw> for Value {
    fn from(raw: &Raw) -> Self {
        Self::Compound(raw.clone())
    }
}

impl From<Compound> for Value {
    fn from(compound: Compound) -> Self {
        Self::Compound(Raw::new(compound))
    }
}

impl From<Observable> for Value {
    fn from(observable: Observable) -> Self {
        Self::Observable(observable)
    }
}

impl From<&Observable> for Value {
    fn from(observable: &Observable) -> Self {
        Self::Observable(observable.clone())
    }
}

impl From<PropertyKey> for Value {
    fn from(key: PropertyKey) -> Self {
        match key {
            PropertyKey::Name(name) => Self::Str(name),
            PropertyKey::Index(index) => Self::Number(index as f64),
        }
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_equality() {
        assert_eq!(Value::from(1), Value::from(1.0));
        assert_ne!(Value::from(f64::NAN), Value::from(f64::NAN));
        assert_ne!(Value::from(1), Value::from("1"));
        assert_ne!(Value::Null, Value::Undefined);

        let raw = Raw::object();
        assert_eq!(Value::from(&raw), Value::from(&raw));
        assert_ne!(Value::from(Raw::object()), Value::from(Raw::object()));
    }

    #[test]
    fn numeric_conversion() {
        assert_eq!(Value::from(true).to_number(), Some(1.0));
        assert_eq!(Value::Null.to_number(), Some(0.0));
        assert_eq!(Value::from(" 42 ").to_number(), Some(42.0));
        assert!(Value::from("abc").to_number().unwrap().is_nan());
        assert_eq!(Value::from(Raw::object()).to_number(), None);
    }

    #[test]
    fn number_formatting() {
        assert_eq!(Value::format_number(3.0), "3");
        assert_eq!(Value::format_number(-2.0), "-2");
        assert_eq!(Value::format_number(0.5), "0.5");
        assert_eq!(Value::format_number(f64::NAN), "NaN");
    }

    #[test]
    fn options_map_none_to_null() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::from("x"));
    }
}
