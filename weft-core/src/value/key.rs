//! Keys for objects, arrays, maps and sets.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use super::Value;

/// A property key of an object, array or buffer.
///
/// Names that spell a canonical array index (`"0"`, `"17"`, but not `"07"`)
/// are the same key as the corresponding [`PropertyKey::Index`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    Name(Rc<str>),
    Index(usize),
}

impl PropertyKey {
    /// Largest array index. Integers above it name ordinary properties.
    pub const MAX_INDEX: usize = u32::MAX as usize - 1;

    /// Interpret a value as a property key. Strings and non-negative
    /// integral numbers qualify; everything else does not name a property.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Str(name) => Some(Self::Name(name.clone()).canonical()),
            Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 && *n <= Self::MAX_INDEX as f64 => {
                Some(Self::Index(*n as usize))
            }
            Value::Number(n) => Some(Self::Name(Rc::from(Value::format_number(*n)))),
            Value::Bool(b) => Some(Self::Name(Rc::from(b.to_string()))),
            _ => None,
        }
    }

    /// Fold index-like names into [`PropertyKey::Index`].
    pub fn canonical(self) -> Self {
        match self {
            Self::Name(name) => match parse_index(&name) {
                Some(index) => Self::Index(index),
                None => Self::Name(name),
            },
            index => index,
        }
    }

    /// The string form used as an object property name.
    pub fn to_name(&self) -> Rc<str> {
        match self {
            Self::Name(name) => name.clone(),
            Self::Index(index) => Rc::from(index.to_string()),
        }
    }

    /// The array index, if this key is one.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(index) => Some(*index),
            Self::Name(_) => None,
        }
    }

    /// Check if this is the `length` property.
    pub fn is_length(&self) -> bool {
        matches!(self, Self::Name(name) if &**name == "length")
    }
}

fn parse_index(name: &str) -> Option<usize> {
    if name.is_empty() || (name.len() > 1 && name.starts_with('0')) {
        return None;
    }
    if !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse::<u64>()
        .ok()
        .filter(|index| *index <= PropertyKey::MAX_INDEX as u64)
        .map(|index| index as usize)
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(name: &str) -> Self {
        Self::Name(Rc::from(name)).canonical()
    }
}

impl From<String> for PropertyKey {
    fn from(name: String) -> Self {
        Self::Name(Rc::from(name)).canonical()
    }
}

impl From<Rc<str>> for PropertyKey {
    fn from(name: Rc<str>) -> Self {
        Self::Name(name).canonical()
    }
}

impl From<usize> for PropertyKey {
    fn from(index: usize) -> Self {
        if index <= Self::MAX_INDEX {
            Self::Index(index)
        } else {
            Self::Name(Rc::from(index.to_string()))
        }
    }
}

/// A map key or set member, compared with SameValueZero: `NaN` equals
/// itself, `0` equals `-0`, and compounds compare by identity.
///
/// Observables are stored as their raw value, so a wrapper and the value it
/// wraps address the same entry.
#[derive(Debug, Clone)]
pub struct MapKey(Value);

impl MapKey {
    /// Key for `value`; observables are reduced to their raw value.
    pub fn new(value: Value) -> Self {
        match value {
            Value::Observable(observable) => Self(Value::Compound(observable.raw().clone())),
            other => Self(other),
        }
    }

    /// The key as a value.
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Unwrap into the key's value.
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl PartialEq for MapKey {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Value::Number(a), Value::Number(b)) => (a.is_nan() && b.is_nan()) || a == b,
            (a, b) => a == b,
        }
    }
}

impl Eq for MapKey {}

impl Hash for MapKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(&self.0).hash(state);
        match &self.0 {
            Value::Undefined | Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Number(n) => {
                let bits = if n.is_nan() {
                    f64::NAN.to_bits()
                } else if *n == 0.0 {
                    0.0f64.to_bits()
                } else {
                    n.to_bits()
                };
                bits.hash(state);
            }
            Value::Str(s) => s.hash(state),
            Value::Compound(raw) => raw.id().hash(state),
            // `new` never stores an observable.
            Value::Observable(observable) => observable.raw().id().hash(state),
        }
    }
}

impl From<Value> for MapKey {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}
