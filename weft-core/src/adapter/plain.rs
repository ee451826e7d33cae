//! Property interception for objects, arrays and numeric buffers.
//!
//! # Writes
//!
//! A write first checks whether the key already exists and captures the old
//! value, then stores the new one:
//!
//! - key did not exist: `Add`, which also fires the structural key;
//! - key existed, value not strictly equal: `Set`;
//! - otherwise nothing fires.
//!
//! # Arrays
//!
//! `length` is tracked as [`TrackKey::Length`], the array's structural key,
//! so anything that enumerates, measures or maps over an array re-runs when
//! elements are added or removed. Writing past the end pads with holes;
//! deleting an element leaves a hole.

use std::rc::Rc;

use crate::error::{ReactiveError, Result};
use crate::reactive::{Observable, OperationKind, TrackKey};
use crate::value::{Compound, ContainerKind, PropertyKey, Value};

/// What a write did, if anything worth reporting.
type Change = Option<(TrackKey, OperationKind)>;

/// Arrays are stored densely, so a single write may pad at most this many
/// holes past the current end.
pub(crate) const MAX_ARRAY_GAP: usize = 1 << 16;

fn within_gap(len: usize, target: usize) -> bool {
    target <= len.saturating_add(MAX_ARRAY_GAP)
}

fn invalid_key(key: &Value, kind: ContainerKind) -> ReactiveError {
    ReactiveError::InvalidKey {
        key: key.describe(),
        kind,
    }
}

/// The tracking key a read of `key` records, and the value it sees.
fn read(compound: &Compound, key: &PropertyKey) -> (TrackKey, Value) {
    match compound {
        Compound::Object(props) => {
            let value = props.get(&*key.to_name()).cloned().unwrap_or_default();
            (TrackKey::Property(key.clone()), value)
        }
        Compound::Array(slots) if key.is_length() => (TrackKey::Length, Value::from(slots.len())),
        Compound::Array(slots) => {
            let value = key
                .as_index()
                .and_then(|index| slots.get(index).cloned().flatten())
                .unwrap_or_default();
            (TrackKey::Property(key.clone()), value)
        }
        Compound::Buffer(buffer) if key.is_length() => {
            (TrackKey::Length, Value::from(buffer.len()))
        }
        Compound::Buffer(buffer) => {
            let value = key
                .as_index()
                .and_then(|index| buffer.get(index))
                .map_or(Value::Undefined, Value::Number);
            (TrackKey::Property(key.clone()), value)
        }
        Compound::Map(_) | Compound::Set(_) => (TrackKey::Property(key.clone()), Value::Undefined),
    }
}

fn has_own(compound: &Compound, key: &PropertyKey) -> bool {
    match compound {
        Compound::Object(props) => props.contains_key(&*key.to_name()),
        Compound::Array(_) | Compound::Buffer(_) if key.is_length() => true,
        Compound::Array(slots) => key
            .as_index()
            .is_some_and(|index| matches!(slots.get(index), Some(Some(_)))),
        Compound::Buffer(buffer) => key.as_index().is_some_and(|index| index < buffer.len()),
        Compound::Map(_) | Compound::Set(_) => false,
    }
}

/// Read `key`, crediting the running reaction and wrapping compound results.
pub(crate) fn get(target: &Observable, key: Value) -> Value {
    let Some(key) = PropertyKey::from_value(&key) else {
        return Value::Undefined;
    };
    let raw = target.raw();
    let (track_key, value) = read(&raw.borrow(), &key);

    let runtime = target.runtime();
    runtime.track(raw, track_key, OperationKind::Get);
    runtime.wrap_value(value)
}

/// Check for an own property, crediting the running reaction with the key.
pub(crate) fn has(target: &Observable, key: Value) -> bool {
    let Some(key) = PropertyKey::from_value(&key) else {
        return false;
    };
    let raw = target.raw();
    let (present, track_key) = {
        let compound = raw.borrow();
        let track_key = read(&compound, &key).0;
        (has_own(&compound, &key), track_key)
    };
    target.runtime().track(raw, track_key, OperationKind::Has);
    present
}

pub(crate) fn set(target: &Observable, key: Value, value: Value) -> Result<()> {
    let kind = target.kind();
    let property = PropertyKey::from_value(&key).ok_or_else(|| invalid_key(&key, kind))?;

    let raw = target.raw();
    let change = write(&mut raw.borrow_mut(), &key, property, value)?;
    match change {
        Some((track_key, op)) => target.runtime().trigger(raw, kind, track_key, op),
        None => Ok(()),
    }
}

fn write(compound: &mut Compound, key: &Value, property: PropertyKey, value: Value) -> Result<Change> {
    let kind = compound.kind();
    match compound {
        Compound::Object(props) => {
            let name = property.to_name();
            let track_key = TrackKey::Property(property);
            match props.get_mut(&*name) {
                Some(slot) if *slot == value => Ok(None),
                Some(slot) => {
                    *slot = value;
                    Ok(Some((track_key, OperationKind::Set)))
                }
                None => {
                    props.insert(name, value);
                    Ok(Some((track_key, OperationKind::Add)))
                }
            }
        }
        Compound::Array(slots) if property.is_length() => {
            let len = value
                .as_f64()
                .filter(|n| *n >= 0.0 && n.fract() == 0.0 && *n <= u32::MAX as f64)
                .ok_or_else(|| ReactiveError::InvalidLength(value.describe()))?
                as usize;
            if len == slots.len() {
                return Ok(None);
            }
            if !within_gap(slots.len(), len) {
                return Err(ReactiveError::InvalidLength(value.describe()));
            }
            slots.resize(len, None);
            Ok(Some((TrackKey::Length, OperationKind::Set)))
        }
        Compound::Array(slots) => {
            let Some(index) = property.as_index() else {
                return Err(invalid_key(key, kind));
            };
            if index >= slots.len() {
                if !within_gap(slots.len(), index) {
                    return Err(ReactiveError::SparseWrite {
                        index,
                        len: slots.len(),
                    });
                }
                slots.resize(index + 1, None);
            }
            let track_key = TrackKey::Property(property);
            match &mut slots[index] {
                Some(slot) if *slot == value => Ok(None),
                Some(slot) => {
                    *slot = value;
                    Ok(Some((track_key, OperationKind::Set)))
                }
                None => {
                    slots[index] = Some(value);
                    Ok(Some((track_key, OperationKind::Add)))
                }
            }
        }
        Compound::Buffer(buffer) => {
            let Some(index) = property.as_index() else {
                return Err(invalid_key(key, kind));
            };
            let number = value
                .to_number()
                .ok_or(ReactiveError::NotNumeric(value.type_name()))?;
            let len = buffer.len();
            let old = buffer
                .set(index, number)
                .ok_or(ReactiveError::IndexOutOfBounds { index, len })?;
            let new = buffer.get(index).unwrap_or(number);
            if old == new {
                Ok(None)
            } else {
                Ok(Some((TrackKey::Property(property), OperationKind::Set)))
            }
        }
        Compound::Map(_) | Compound::Set(_) => Err(ReactiveError::Unsupported {
            op: "property write",
            kind,
        }),
    }
}

pub(crate) fn delete(target: &Observable, key: Value) -> Result<bool> {
    let Some(property) = PropertyKey::from_value(&key) else {
        return Ok(false);
    };

    let raw = target.raw();
    let removed = {
        let mut compound = raw.borrow_mut();
        let kind = compound.kind();
        match &mut *compound {
            Compound::Object(props) => props.shift_remove(&*property.to_name()).is_some(),
            Compound::Array(slots) => property
                .as_index()
                .and_then(|index| slots.get_mut(index))
                .and_then(Option::take)
                .is_some(),
            Compound::Buffer(_) | Compound::Map(_) | Compound::Set(_) => {
                return Err(ReactiveError::Unsupported {
                    op: "property delete",
                    kind,
                });
            }
        }
    };

    if removed {
        target.runtime().trigger(
            raw,
            target.kind(),
            TrackKey::Property(property),
            OperationKind::Delete,
        )?;
    }
    Ok(removed)
}

/// Own keys in order, crediting the running reaction with the structural key.
pub(crate) fn keys(target: &Observable) -> Vec<Value> {
    let raw = target.raw();
    target
        .runtime()
        .track(raw, TrackKey::structural(target.kind()), OperationKind::Iterate);

    let compound = raw.borrow();
    match &*compound {
        Compound::Object(props) => props
            .keys()
            .map(|name| Value::Str(Rc::clone(name)))
            .collect(),
        Compound::Array(slots) => slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(index, _)| Value::from(index))
            .collect(),
        Compound::Buffer(buffer) => (0..buffer.len()).map(Value::from).collect(),
        Compound::Map(_) | Compound::Set(_) => Vec::new(),
    }
}

/// Positions read by `values` and `entries`. Arrays visit every index,
/// holes included, the way a mapping pass would.
fn positions(target: &Observable) -> Vec<Value> {
    let raw = target.raw();
    let len = match &*raw.borrow() {
        Compound::Array(slots) => Some(slots.len()),
        _ => None,
    };
    match len {
        Some(len) => {
            target
                .runtime()
                .track(raw, TrackKey::Length, OperationKind::Iterate);
            (0..len).map(Value::from).collect()
        }
        None => keys(target),
    }
}

pub(crate) fn values(target: &Observable) -> Vec<Value> {
    positions(target)
        .into_iter()
        .map(|key| get(target, key))
        .collect()
}

pub(crate) fn entries(target: &Observable) -> Vec<(Value, Value)> {
    positions(target)
        .into_iter()
        .map(|key| {
            let value = get(target, key.clone());
            (key, value)
        })
        .collect()
}

pub(crate) fn len(target: &Observable) -> usize {
    let raw = target.raw();
    target
        .runtime()
        .track(raw, TrackKey::structural(target.kind()), OperationKind::Iterate);
    raw.borrow().len()
}

pub(crate) fn push(target: &Observable, value: Value) -> Result<usize> {
    let raw = target.raw();
    let (index, len) = {
        let mut compound = raw.borrow_mut();
        let kind = compound.kind();
        let Compound::Array(slots) = &mut *compound else {
            return Err(ReactiveError::Unsupported { op: "push", kind });
        };
        slots.push(Some(value));
        (slots.len() - 1, slots.len())
    };

    target.runtime().trigger(
        raw,
        target.kind(),
        TrackKey::Property(PropertyKey::Index(index)),
        OperationKind::Add,
    )?;
    Ok(len)
}

pub(crate) fn pop(target: &Observable) -> Result<Value> {
    let raw = target.raw();
    let popped = {
        let mut compound = raw.borrow_mut();
        let kind = compound.kind();
        let Compound::Array(slots) = &mut *compound else {
            return Err(ReactiveError::Unsupported { op: "pop", kind });
        };
        slots.pop().map(|slot| (slots.len(), slot.unwrap_or_default()))
    };

    let Some((index, value)) = popped else {
        return Ok(Value::Undefined);
    };
    let runtime = target.runtime();
    runtime.trigger(
        raw,
        target.kind(),
        TrackKey::Property(PropertyKey::Index(index)),
        OperationKind::Delete,
    )?;
    Ok(runtime.wrap_value(value))
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use serde_json::json;

    use crate::error::ReactiveError;
    use crate::reactive::{Observable, Reaction, Runtime, TrackKey};
    use crate::value::{BufferKind, PropertyKey, Raw, Value};

    /// Observe `read` and count its runs.
    fn watch(
        runtime: &Runtime,
        target: &Observable,
        read: impl Fn(&Observable) + 'static,
    ) -> (Reaction, Rc<Cell<usize>>) {
        let runs = Rc::new(Cell::new(0));
        let (state, counter) = (target.clone(), runs.clone());
        let reaction = runtime
            .observe(move || {
                counter.set(counter.get() + 1);
                read(&state);
                Ok(())
            })
            .unwrap();
        (reaction, runs)
    }

    #[test]
    fn reads_are_tracked_per_key() {
        let runtime = Runtime::new();
        let state = runtime.reactive(json!({ "a": 1, "b": 2 })).unwrap();
        let (_r, runs) = watch(&runtime, &state, |s| {
            s.get("a");
        });

        state.set("b", 3).unwrap();
        assert_eq!(runs.get(), 1);

        state.set("a", 5).unwrap();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn same_value_writes_do_not_fire() {
        let runtime = Runtime::new();
        let state = runtime.reactive(json!({ "count": 1 })).unwrap();
        let (_r, runs) = watch(&runtime, &state, |s| {
            s.get("count");
        });

        state.set("count", 1).unwrap();
        assert_eq!(runs.get(), 1);
        state.set("count", 2).unwrap();
        state.set("count", 2).unwrap();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn nested_compounds_are_returned_wrapped() {
        let runtime = Runtime::new();
        let state = runtime.reactive(json!({ "data": { "count": 1 } })).unwrap();

        let first = state.get("data");
        let second = state.get("data");
        assert!(first.is_observable());
        assert_eq!(first, second);
    }

    #[test]
    fn reading_a_missing_key_tracks_its_later_addition() {
        let runtime = Runtime::new();
        let state = runtime.reactive(json!({})).unwrap();
        let seen = Rc::new(RefCell::new(Value::Undefined));
        let (s, out) = (state.clone(), seen.clone());
        let _r = runtime
            .observe(move || {
                *out.borrow_mut() = s.get("late");
                Ok(())
            })
            .unwrap();

        state.set("late", "here").unwrap();
        assert_eq!(*seen.borrow(), Value::from("here"));
    }

    #[test]
    fn enumeration_follows_membership_not_values() {
        let runtime = Runtime::new();
        let state = runtime.reactive(json!({ "a": 1, "b": 2 })).unwrap();
        let (_r, runs) = watch(&runtime, &state, |s| {
            s.keys();
        });

        state.set("a", 10).unwrap();
        assert_eq!(runs.get(), 1);

        state.set("c", 3).unwrap();
        assert_eq!(runs.get(), 2);

        assert!(state.delete("c").unwrap());
        assert_eq!(runs.get(), 3);

        assert!(!state.delete("c").unwrap());
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn object_keys_keep_insertion_order_after_delete() {
        let runtime = Runtime::new();
        let state = runtime.reactive(json!({ "a": 1, "b": 2, "c": 3 })).unwrap();
        state.delete("b").unwrap();
        state.set("b", 4).unwrap();
        assert_eq!(
            state.keys(),
            vec![Value::from("a"), Value::from("c"), Value::from("b")]
        );
    }

    #[test]
    fn has_tracks_presence() {
        let runtime = Runtime::new();
        let state = runtime.reactive(json!({})).unwrap();
        let (_r, runs) = watch(&runtime, &state, |s| {
            s.has("flag");
        });

        state.set("flag", true).unwrap();
        assert_eq!(runs.get(), 2);
        assert!(state.has("flag"));
    }

    #[test]
    fn array_push_and_pop_fire_length_observers() {
        let runtime = Runtime::new();
        let list = runtime.reactive(json!([1, 2])).unwrap();
        let (_r, runs) = watch(&runtime, &list, |l| {
            l.values();
        });

        assert_eq!(list.push(3).unwrap(), 3);
        assert_eq!(runs.get(), 2);

        assert_eq!(list.pop().unwrap(), Value::from(3));
        assert_eq!(runs.get(), 3);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn pop_on_empty_array_fires_nothing() {
        let runtime = Runtime::new();
        let list = runtime.reactive(json!([])).unwrap();
        let (_r, runs) = watch(&runtime, &list, |l| {
            l.len();
        });

        assert_eq!(list.pop().unwrap(), Value::Undefined);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn element_writes_fire_element_readers_only() {
        let runtime = Runtime::new();
        let list = runtime.reactive(json!([1, 2, 3])).unwrap();
        let (_first, first_runs) = watch(&runtime, &list, |l| {
            l.get(0);
        });
        let (_length, length_runs) = watch(&runtime, &list, |l| {
            l.len();
        });

        list.set(0, 9).unwrap();
        assert_eq!(first_runs.get(), 2);
        assert_eq!(length_runs.get(), 1);

        // Writing past the end adds an element and pads with holes.
        list.set(5, 1).unwrap();
        assert_eq!(length_runs.get(), 2);
        assert_eq!(list.len(), 6);
        assert_eq!(list.get(4), Value::Undefined);
        assert!(!list.has(4));
    }

    #[test]
    fn array_delete_leaves_a_hole() {
        let runtime = Runtime::new();
        let list = runtime.reactive(json!(["a", "b"])).unwrap();
        let (_r, runs) = watch(&runtime, &list, |l| {
            l.keys();
        });

        assert!(list.delete(0).unwrap());
        assert_eq!(runs.get(), 2);
        assert_eq!(list.len(), 2);
        assert_eq!(list.keys(), vec![Value::from(1)]);

        // Filling the hole is an addition.
        list.set(0, "z").unwrap();
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn length_writes_truncate() {
        let runtime = Runtime::new();
        let list = runtime.reactive(json!([1, 2, 3])).unwrap();
        let (_r, runs) = watch(&runtime, &list, |l| {
            l.get("length");
        });

        list.set("length", 1).unwrap();
        assert_eq!(runs.get(), 2);
        assert_eq!(list.values(), vec![Value::from(1)]);

        list.set("length", 1).unwrap();
        assert_eq!(runs.get(), 2);

        assert!(matches!(
            list.set("length", -1),
            Err(ReactiveError::InvalidLength(_))
        ));
        assert!(matches!(
            list.set("name", 1),
            Err(ReactiveError::InvalidKey { .. })
        ));
    }

    #[test]
    fn buffers_coerce_and_reject_out_of_range_writes() {
        let runtime = Runtime::new();
        let bytes = runtime.reactive(Raw::buffer(BufferKind::Uint8, 2)).unwrap();
        let (_r, runs) = watch(&runtime, &bytes, |b| {
            b.get(0);
        });

        bytes.set(0, 257).unwrap();
        assert_eq!(bytes.get(0), Value::from(1));
        assert_eq!(runs.get(), 2);

        // 513 also stores 1, so nothing changed.
        bytes.set(0, 513).unwrap();
        assert_eq!(runs.get(), 2);

        assert!(matches!(
            bytes.set(2, 1),
            Err(ReactiveError::IndexOutOfBounds { index: 2, len: 2 })
        ));
        assert!(matches!(
            bytes.set(0, Raw::object()),
            Err(ReactiveError::NotNumeric("compound"))
        ));
        assert!(bytes.delete(0).is_err());
        assert_eq!(bytes.get("length"), Value::from(2));
    }

    #[test]
    fn huge_indices_do_not_grow_arrays() {
        let runtime = Runtime::new();
        let list = runtime.reactive(json!([1])).unwrap();
        let (_r, runs) = watch(&runtime, &list, |l| {
            l.len();
        });

        // Past the index range, digits are an ordinary property name.
        assert!(matches!(
            list.set("18446744073709551615", 1),
            Err(ReactiveError::InvalidKey { .. })
        ));
        assert!(matches!(
            list.set(PropertyKey::MAX_INDEX, 1),
            Err(ReactiveError::SparseWrite { len: 1, .. })
        ));
        assert!(matches!(
            list.set("length", 1_000_000_000),
            Err(ReactiveError::InvalidLength(_))
        ));
        assert_eq!(list.raw().borrow().len(), 1);
        assert_eq!(runs.get(), 1);

        list.set(4, "e").unwrap();
        assert_eq!(list.raw().borrow().len(), 5);
        assert_eq!(list.get(2), Value::Undefined);
        assert_eq!(runs.get(), 2);

        let state = runtime.reactive(json!({})).unwrap();
        state.set("18446744073709551615", 1).unwrap();
        assert_eq!(state.keys(), vec![Value::from("18446744073709551615")]);
    }

    #[test]
    fn scalar_keys_of_other_types_address_named_properties() {
        let runtime = Runtime::new();
        let state = runtime.reactive(json!({})).unwrap();
        state.set(true, 1).unwrap();
        state.set(1.5, 2).unwrap();

        assert_eq!(state.get("true"), Value::from(1));
        assert_eq!(state.get("1.5"), Value::from(2));
        assert!(matches!(
            state.set(Value::Null, 3),
            Err(ReactiveError::InvalidKey { .. })
        ));
        assert_eq!(state.get(Value::Null), Value::Undefined);
    }

    #[test]
    fn index_names_and_numbers_share_a_dependency() {
        let runtime = Runtime::new();
        let state = runtime.reactive(json!({ "0": "zero" })).unwrap();
        let (_r, runs) = watch(&runtime, &state, |s| {
            s.get(0);
        });

        state.set("0", "nil").unwrap();
        assert_eq!(runs.get(), 2);
        assert_eq!(
            runtime.dependent_count(&state, &TrackKey::Property(PropertyKey::Index(0))),
            1
        );
    }
}
