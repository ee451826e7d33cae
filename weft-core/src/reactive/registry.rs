//! Identity Registry
//!
//! Records which raw values have been wrapped by a runtime, so that wrapping
//! the same value twice yields the same wrapper and reads outside a reaction
//! can tell whether a wrapper exists. Dependencies are keyed by raw identity,
//! and callers compare wrappers for equality, so this has to hold for the
//! lifetime of the raw value.
//!
//! An entry holds its raw value weakly and is tied to it: it lives until the
//! raw value dies, whether or not any wrapper handle is currently held.

use std::collections::HashMap;

use super::observable::Observable;
use super::runtime::Runtime;
use crate::value::{ContainerKind, Raw, RawId, WeakRaw};

struct RegistryEntry {
    raw: WeakRaw,
    kind: ContainerKind,
}

#[derive(Default)]
pub(crate) struct IdentityRegistry {
    entries: HashMap<RawId, RegistryEntry>,
}

impl IdentityRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The wrapper of `raw` in `runtime`, if `raw` has been wrapped.
    pub(crate) fn wrapper_of(&self, runtime: &Runtime, raw: &Raw) -> Option<Observable> {
        let entry = self.entries.get(&raw.id())?;
        if !entry.raw.refers_to(raw) {
            return None;
        }
        Some(Observable::new(runtime, raw.clone(), entry.kind))
    }

    /// Remember `wrapper` as the wrapper of its raw value, replacing any
    /// association left by a dead value at the same address.
    pub(crate) fn insert(&mut self, wrapper: &Observable) {
        let raw = wrapper.raw();
        let entry = RegistryEntry {
            raw: raw.downgrade(),
            kind: wrapper.kind(),
        };
        self.entries.insert(raw.id(), entry);
    }

    /// Drop associations whose raw value has died.
    pub(crate) fn sweep(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.raw.is_alive());
        before - self.entries.len()
    }

    /// Number of wrapped raw values that are still alive.
    pub(crate) fn live_len(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.raw.is_alive())
            .count()
    }
}
