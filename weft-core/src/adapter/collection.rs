//! Method interception for maps and sets.
//!
//! Maps and sets are driven through methods, not property access, so each
//! instrumented method records or fires against [`TrackKey::Entry`] for the
//! key it touches and [`TrackKey::Iterate`] for anything that walks the
//! whole container. Keys compare with SameValueZero (see [`MapKey`]).
//!
//! Compound values read out of a collection are only wrapped while a
//! reaction is running. Outside one, a wrapper could not record anything,
//! so the existing wrapper is returned if there is one and the raw value
//! otherwise.

use crate::error::{ReactiveError, Result};
use crate::reactive::{Observable, OperationKind, TrackKey};
use crate::value::{Compound, MapKey, Value};

fn unsupported(target: &Observable, op: &'static str) -> ReactiveError {
    ReactiveError::Unsupported {
        op,
        kind: target.kind(),
    }
}

pub(crate) fn get(target: &Observable, key: Value) -> Value {
    let key = MapKey::new(key);
    let raw = target.raw();
    let runtime = target.runtime();
    runtime.track(raw, TrackKey::Entry(key.clone()), OperationKind::Get);

    let value = match &*raw.borrow() {
        Compound::Map(entries) => entries.get(&key).cloned().unwrap_or_default(),
        _ => Value::Undefined,
    };
    runtime.wrap_value_if_tracking(value)
}

pub(crate) fn has(target: &Observable, key: Value) -> bool {
    let key = MapKey::new(key);
    let raw = target.raw();
    let present = match &*raw.borrow() {
        Compound::Map(entries) => entries.contains_key(&key),
        Compound::Set(members) => members.contains(&key),
        _ => false,
    };
    target
        .runtime()
        .track(raw, TrackKey::Entry(key), OperationKind::Has);
    present
}

pub(crate) fn set(target: &Observable, key: Value, value: Value) -> Result<()> {
    let key = MapKey::new(key);
    let raw = target.raw();
    let op = {
        let mut compound = raw.borrow_mut();
        let Compound::Map(entries) = &mut *compound else {
            return Err(unsupported(target, "set"));
        };
        match entries.get_mut(&key) {
            Some(slot) if *slot == value => None,
            Some(slot) => {
                *slot = value;
                Some(OperationKind::Set)
            }
            None => {
                entries.insert(key.clone(), value);
                Some(OperationKind::Add)
            }
        }
    };

    match op {
        Some(op) => target
            .runtime()
            .trigger(raw, target.kind(), TrackKey::Entry(key), op),
        None => Ok(()),
    }
}

pub(crate) fn add(target: &Observable, value: Value) -> Result<bool> {
    let member = MapKey::new(value);
    let raw = target.raw();
    let inserted = {
        let mut compound = raw.borrow_mut();
        let Compound::Set(members) = &mut *compound else {
            return Err(unsupported(target, "add"));
        };
        members.insert(member.clone())
    };

    if inserted {
        target.runtime().trigger(
            raw,
            target.kind(),
            TrackKey::Entry(member),
            OperationKind::Add,
        )?;
    }
    Ok(inserted)
}

pub(crate) fn delete(target: &Observable, key: Value) -> Result<bool> {
    let key = MapKey::new(key);
    let raw = target.raw();
    let removed = match &mut *raw.borrow_mut() {
        Compound::Map(entries) => entries.shift_remove(&key).is_some(),
        Compound::Set(members) => members.shift_remove(&key),
        _ => return Err(unsupported(target, "delete")),
    };

    if removed {
        target.runtime().trigger(
            raw,
            target.kind(),
            TrackKey::Entry(key),
            OperationKind::Delete,
        )?;
    }
    Ok(removed)
}

/// Empty the collection and fire everything that depended on any part of it.
pub(crate) fn clear(target: &Observable) -> Result<()> {
    let raw = target.raw();
    let had_members = {
        let mut compound = raw.borrow_mut();
        let had_members = !compound.is_empty();
        match &mut *compound {
            Compound::Map(entries) => entries.clear(),
            Compound::Set(members) => members.clear(),
            _ => return Err(unsupported(target, "clear")),
        }
        had_members
    };

    if had_members {
        target.runtime().trigger_all(raw, OperationKind::Clear)?;
    }
    Ok(())
}

fn track_iteration(target: &Observable) {
    target
        .runtime()
        .track(target.raw(), TrackKey::Iterate, OperationKind::Iterate);
}

pub(crate) fn keys(target: &Observable) -> Vec<Value> {
    track_iteration(target);
    let raw = target.raw();
    let compound = raw.borrow();
    match &*compound {
        Compound::Map(entries) => entries.keys().map(|key| key.value().clone()).collect(),
        Compound::Set(members) => members.iter().map(|member| member.value().clone()).collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn values(target: &Observable) -> Vec<Value> {
    track_iteration(target);
    let raw = target.raw();
    let values: Vec<Value> = match &*raw.borrow() {
        Compound::Map(entries) => entries.values().cloned().collect(),
        Compound::Set(members) => members.iter().map(|member| member.value().clone()).collect(),
        _ => Vec::new(),
    };

    let runtime = target.runtime();
    values
        .into_iter()
        .map(|value| runtime.wrap_value_if_tracking(value))
        .collect()
}

pub(crate) fn entries(target: &Observable) -> Vec<(Value, Value)> {
    track_iteration(target);
    let raw = target.raw();
    let pairs: Vec<(Value, Value)> = match &*raw.borrow() {
        Compound::Map(entries) => entries
            .iter()
            .map(|(key, value)| (key.value().clone(), value.clone()))
            .collect(),
        Compound::Set(members) => members
            .iter()
            .map(|member| (member.value().clone(), member.value().clone()))
            .collect(),
        _ => Vec::new(),
    };

    let runtime = target.runtime();
    pairs
        .into_iter()
        .map(|(key, value)| (key, runtime.wrap_value_if_tracking(value)))
        .collect()
}

pub(crate) fn len(target: &Observable) -> usize {
    track_iteration(target);
    target.raw().borrow().len()
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use serde_json::json;

    use crate::error::ReactiveError;
    use crate::reactive::{Observable, Reaction, Runtime};
    use crate::value::{Raw, Value};

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
    fn map_get_tracks_its_key() {
        let runtime = Runtime::new();
        let map = runtime.reactive(Raw::map([(1, "a"), (2, "b")])).unwrap();
        let seen = Rc::new(RefCell::new(Value::Undefined));
        let (m, out) = (map.clone(), seen.clone());
        let _r = runtime
            .observe(move || {
                *out.borrow_mut() = m.get(1);
                Ok(())
            })
            .unwrap();

        map.set(1, "b").unwrap();
        assert_eq!(*seen.borrow(), Value::from("b"));

        map.set(2, "z").unwrap();
        assert_eq!(*seen.borrow(), Value::from("b"));
    }

    #[test]
    fn map_same_value_set_is_a_no_op() {
        let runtime = Runtime::new();
        let map = runtime.reactive(Raw::map([(1, "a")])).unwrap();
        let (_r, runs) = watch(&runtime, &map, |m| {
            m.get(1);
        });

        map.set(1, "b").unwrap();
        map.set(1, "b").unwrap();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn new_entries_fire_size_observers() {
        let runtime = Runtime::new();
        let map = runtime.reactive(Raw::map([(1, "a")])).unwrap();
        let (_r, runs) = watch(&runtime, &map, |m| {
            m.len();
        });

        map.set(1, "changed").unwrap();
        assert_eq!(runs.get(), 1);

        map.set(2, "new").unwrap();
        assert_eq!(runs.get(), 2);

        assert!(map.delete(2).unwrap());
        assert_eq!(runs.get(), 3);
        assert!(!map.delete(2).unwrap());
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn values_are_wrapped_only_under_tracking() {
        let runtime = Runtime::new();
        let map = runtime
            .reactive(Raw::map([(2, Value::from(json!({ "a": "1" })))]))
            .unwrap();

        let outside = map.get(2);
        assert!(matches!(outside, Value::Compound(_)));

        let inside = Rc::new(RefCell::new(Value::Undefined));
        let (m, out) = (map.clone(), inside.clone());
        let _r = runtime
            .observe(move || {
                *out.borrow_mut() = m.get(2);
                Ok(())
            })
            .unwrap();
        assert!(inside.borrow().is_observable());

        // The wrapper created under tracking is reused outside it.
        assert_eq!(map.get(2), *inside.borrow());
    }

    #[test]
    fn nested_values_are_tracked() {
        let runtime = Runtime::new();
        let map = runtime
            .reactive(Raw::map([(2, Value::from(json!({ "a": "1" })))]))
            .unwrap();
        let seen = Rc::new(RefCell::new(Value::Undefined));
        let (m, out) = (map.clone(), seen.clone());
        let _r = runtime
            .observe(move || {
                if let Value::Observable(inner) = m.get(2) {
                    *out.borrow_mut() = inner.get("a");
                }
                Ok(())
            })
            .unwrap();

        // The wrapper made during the tracked read outlives the run.
        let nested = map.get(2);
        let nested = nested.as_observable().unwrap();
        nested.set("a", "2").unwrap();
        assert_eq!(*seen.borrow(), Value::from("2"));
    }

    #[test]
    fn set_membership() {
        let runtime = Runtime::new();
        let set = runtime.reactive(Raw::set(["x"])).unwrap();
        let (_has, has_runs) = watch(&runtime, &set, |s| {
            s.has("y");
        });
        let (_all, all_runs) = watch(&runtime, &set, |s| {
            s.values();
        });

        assert!(set.add("y").unwrap());
        assert_eq!(has_runs.get(), 2);
        assert_eq!(all_runs.get(), 2);

        assert!(!set.add("y").unwrap());
        assert_eq!(all_runs.get(), 2);

        assert!(set.delete("x").unwrap());
        assert_eq!(has_runs.get(), 2);
        assert_eq!(all_runs.get(), 3);
        assert_eq!(set.keys(), vec![Value::from("y")]);
    }

    #[test]
    fn clear_fires_every_dependent() {
        let runtime = Runtime::new();
        let map = runtime.reactive(Raw::map([(1, "a"), (2, "b")])).unwrap();
        let (_one, one_runs) = watch(&runtime, &map, |m| {
            m.get(1);
        });
        let (_keys, keys_runs) = watch(&runtime, &map, |m| {
            m.keys();
        });

        map.clear().unwrap();
        assert_eq!(one_runs.get(), 2);
        assert_eq!(keys_runs.get(), 2);
        assert!(map.is_empty());

        // Clearing an empty map changes nothing.
        map.clear().unwrap();
        assert_eq!(one_runs.get(), 2);
    }

    #[test]
    fn observable_keys_address_their_raw_entry() {
        let runtime = Runtime::new();
        let key = Raw::object();
        let map = runtime.reactive(Raw::map([(key.clone(), "v")])).unwrap();
        let wrapped_key = runtime.reactive(&key).unwrap();

        assert_eq!(map.get(&wrapped_key), Value::from("v"));
        assert!(map.has(&key));
    }

    #[test]
    fn entries_pair_keys_with_values() {
        let runtime = Runtime::new();
        let map = runtime.reactive(Raw::map([("a", 1), ("b", 2)])).unwrap();
        assert_eq!(
            map.entries(),
            vec![
                (Value::from("a"), Value::from(1)),
                (Value::from("b"), Value::from(2))
            ]
        );
    }

    #[test]
    fn kind_specific_methods() {
        let runtime = Runtime::new();
        let map = runtime.reactive(Raw::map(Vec::<(Value, Value)>::new())).unwrap();
        let set = runtime.reactive(Raw::set(Vec::<Value>::new())).unwrap();

        assert!(matches!(map.add(1), Err(ReactiveError::Unsupported { op: "add", .. })));
        assert!(matches!(set.set(1, 2), Err(ReactiveError::Unsupported { op: "set", .. })));
        assert_eq!(set.get(1), Value::Undefined);
    }
}
