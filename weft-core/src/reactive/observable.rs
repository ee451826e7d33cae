//! Observable Wrappers
//!
//! An [`Observable`] stands in for a raw compound value. It offers the same
//! logical operations as the raw container (property access for objects,
//! arrays and buffers; method-style access for maps and sets) and routes
//! each one through the matching adapter, which records dependencies on
//! reads and fires reactions on writes.
//!
//! The container kind is resolved once, when the wrapper is created, and
//! every operation dispatches on it.
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use serde_json::json;
//! use weft_core::{observe, reactive};
//!
//! let counter = reactive(json!({ "count": 1 })).unwrap();
//! let seen = Rc::new(Cell::new(0.0));
//!
//! let (state, out) = (counter.clone(), seen.clone());
//! let _reaction = observe(move || {
//!     out.set(state.get("count").as_f64().unwrap_or_default());
//!     Ok(())
//! })
//! .unwrap();
//!
//! counter.set("count", 2).unwrap();
//! assert_eq!(seen.get(), 2.0);
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};

use super::runtime::Runtime;
use crate::adapter::{collection, plain};
use crate::error::{ReactiveError, Result};
use crate::value::{Compound, ContainerKind, Raw, Value};

/// Tracking wrapper around a raw compound value.
///
/// A handle is the pair of a raw value and the runtime that tracks it, so
/// every handle to the same raw value in the same runtime is the same
/// wrapper. It stays valid for as long as the raw value does. Cheap to clone.
#[derive(Clone)]
pub struct Observable {
    raw: Raw,
    kind: ContainerKind,
    runtime: Runtime,
}

impl Observable {
    pub(crate) fn new(runtime: &Runtime, raw: Raw, kind: ContainerKind) -> Self {
        Self {
            raw,
            kind,
            runtime: runtime.clone(),
        }
    }

    /// The wrapped raw value. Access through it is not tracked.
    pub fn raw(&self) -> &Raw {
        &self.raw
    }

    /// Container kind, resolved when the raw value was first wrapped.
    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    /// The runtime that records reads and fires writes for this wrapper.
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Check if both handles wrap the same raw value in the same runtime.
    pub fn ptr_eq(&self, other: &Observable) -> bool {
        self.raw.ptr_eq(&other.raw) && self.runtime.ptr_eq(&other.runtime)
    }

    fn unsupported(&self, op: &'static str) -> ReactiveError {
        ReactiveError::Unsupported {
            op,
            kind: self.kind(),
        }
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Read a property (objects, arrays, buffers) or a map entry.
    ///
    /// Missing keys read as [`Value::Undefined`]. Compound results come back
    /// as observables.
    pub fn get(&self, key: impl Into<Value>) -> Value {
        if self.kind().is_collection() {
            collection::get(self, key.into())
        } else {
            plain::get(self, key.into())
        }
    }

    /// Check whether a property, map entry or set member exists.
    pub fn has(&self, key: impl Into<Value>) -> bool {
        if self.kind().is_collection() {
            collection::has(self, key.into())
        } else {
            plain::has(self, key.into())
        }
    }

    /// Keys in order: property names for objects, indices for arrays and
    /// buffers, keys for maps, members for sets.
    pub fn keys(&self) -> Vec<Value> {
        if self.kind().is_collection() {
            collection::keys(self)
        } else {
            plain::keys(self)
        }
    }

    /// Values in key order. Compound values come back as observables.
    pub fn values(&self) -> Vec<Value> {
        if self.kind().is_collection() {
            collection::values(self)
        } else {
            plain::values(self)
        }
    }

    /// `(key, value)` pairs in key order; sets pair each member with itself.
    pub fn entries(&self) -> Vec<(Value, Value)> {
        if self.kind().is_collection() {
            collection::entries(self)
        } else {
            plain::entries(self)
        }
    }

    /// Number of properties, elements, entries or members.
    pub fn len(&self) -> usize {
        if self.kind().is_collection() {
            collection::len(self)
        } else {
            plain::len(self)
        }
    }

    /// Check if there are no properties, elements, entries or members.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` against the raw payload without recording anything.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&Compound) -> R) -> R {
        f(&self.raw().borrow())
    }

    // ------------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------------

    /// Write a property or map entry, firing dependent reactions if the key
    /// is new or the value changed.
    pub fn set(&self, key: impl Into<Value>, value: impl Into<Value>) -> Result<()> {
        if self.kind().is_collection() {
            collection::set(self, key.into(), value.into())
        } else {
            plain::set(self, key.into(), value.into())
        }
    }

    /// Remove a property, map entry or set member. Returns false if it was
    /// absent, in which case nothing fires.
    pub fn delete(&self, key: impl Into<Value>) -> Result<bool> {
        if self.kind().is_collection() {
            collection::delete(self, key.into())
        } else {
            plain::delete(self, key.into())
        }
    }

    /// Append to an array. Returns the new length.
    pub fn push(&self, value: impl Into<Value>) -> Result<usize> {
        match self.kind() {
            ContainerKind::Array => plain::push(self, value.into()),
            _ => Err(self.unsupported("push")),
        }
    }

    /// Remove and return the last element of an array.
    pub fn pop(&self) -> Result<Value> {
        match self.kind() {
            ContainerKind::Array => plain::pop(self),
            _ => Err(self.unsupported("pop")),
        }
    }

    /// Insert a member into a set. Returns false if it was already present.
    pub fn add(&self, value: impl Into<Value>) -> Result<bool> {
        match self.kind() {
            ContainerKind::Set => collection::add(self, value.into()),
            _ => Err(self.unsupported("add")),
        }
    }

    /// Remove every entry of a map or member of a set.
    pub fn clear(&self) -> Result<()> {
        if self.kind().is_collection() {
            collection::clear(self)
        } else {
            Err(self.unsupported("clear"))
        }
    }
}

impl PartialEq for Observable {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Observable {}

impl Hash for Observable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.id().hash(state);
    }
}

impl fmt::Debug for Observable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("kind", &self.kind())
            .field("raw", self.raw())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn equality_is_identity() {
        let runtime = Runtime::new();
        let a = runtime.reactive(json!({})).unwrap();
        let b = runtime.reactive(json!({})).unwrap();

        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn kind_specific_operations_are_rejected_elsewhere() {
        let runtime = Runtime::new();
        let object = runtime.reactive(json!({})).unwrap();
        let map = runtime.reactive(Raw::map(Vec::<(Value, Value)>::new())).unwrap();

        assert!(matches!(
            object.push(1),
            Err(ReactiveError::Unsupported { op: "push", kind: ContainerKind::Object })
        ));
        assert!(matches!(
            map.pop(),
            Err(ReactiveError::Unsupported { op: "pop", kind: ContainerKind::Map })
        ));
        assert!(matches!(
            object.add(1),
            Err(ReactiveError::Unsupported { op: "add", .. })
        ));
        assert!(matches!(
            object.clear(),
            Err(ReactiveError::Unsupported { op: "clear", .. })
        ));
    }

    #[test]
    fn untracked_access_records_nothing() {
        let runtime = Runtime::new();
        let state = runtime.reactive(json!({ "a": 1 })).unwrap();
        let inner = state.clone();

        let _reaction = runtime
            .observe(move || {
                let len = inner.with_untracked(Compound::len);
                assert_eq!(len, 1);
                Ok(())
            })
            .unwrap();

        assert_eq!(runtime.stats().edges, 0);
    }
}
