//! Dependency Store
//!
//! For each tracked raw value, a map from [`TrackKey`] to the set of
//! reactions that read it. This is the dependency graph: edges run from
//! `(raw value, key)` to reaction.
//!
//! # Weak references
//!
//! Entries are keyed by the raw value's address and hold it weakly; reaction
//! sets hold reactions weakly. The store therefore never keeps state or
//! reactions alive. An entry whose raw value has died is replaced if the
//! address is reused and dropped on the next sweep; dead or disposed
//! reactions are pruned whenever their set is read.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::operation::{OperationKind, TrackKey};
use super::reaction::{ReactionCell, ReactionId};
use crate::value::{ContainerKind, Raw, RawId, WeakRaw};

/// Reactions collected for one trigger, in firing order, without duplicates.
pub(crate) type Batch = SmallVec<[Rc<ReactionCell>; 8]>;

/// Insertion-ordered set of reactions.
#[derive(Default)]
struct ReactionSet {
    members: IndexMap<ReactionId, Weak<ReactionCell>>,
}

impl ReactionSet {
    /// Returns true if the reaction was not already present.
    fn insert(&mut self, reaction: &Rc<ReactionCell>) -> bool {
        match self.members.entry(reaction.id()) {
            indexmap::map::Entry::Occupied(_) => false,
            indexmap::map::Entry::Vacant(slot) => {
                slot.insert(Rc::downgrade(reaction));
                true
            }
        }
    }

    fn prune(&mut self) {
        self.members
            .retain(|_, weak| weak.upgrade().is_some_and(|r| !r.is_disposed()));
    }

    /// Append the live members to `batch`, skipping ones already there.
    fn gather_into(&mut self, batch: &mut Batch) {
        self.prune();
        for weak in self.members.values() {
            if let Some(reaction) = weak.upgrade() {
                if !batch.iter().any(|queued| queued.id() == reaction.id()) {
                    batch.push(reaction);
                }
            }
        }
    }

    fn live_len(&self) -> usize {
        self.members
            .values()
            .filter(|weak| weak.upgrade().is_some_and(|r| !r.is_disposed()))
            .count()
    }
}

struct DepEntry {
    raw: WeakRaw,
    keys: IndexMap<TrackKey, ReactionSet>,
}

impl DepEntry {
    fn new(raw: &Raw) -> Self {
        Self {
            raw: raw.downgrade(),
            keys: IndexMap::new(),
        }
    }

    fn gather(&mut self, key: &TrackKey, batch: &mut Batch) {
        if let Some(set) = self.keys.get_mut(key) {
            set.gather_into(batch);
        }
    }
}

/// Counts reported by [`DependencyStore::stats`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StoreStats {
    pub(crate) objects: usize,
    pub(crate) edges: usize,
}

#[derive(Default)]
pub(crate) struct DependencyStore {
    entries: HashMap<RawId, DepEntry>,
}

impl DependencyStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Create the entry for `raw` if it has none. Idempotent.
    pub(crate) fn ensure_entry(&mut self, raw: &Raw) {
        self.entry_mut(raw);
    }

    fn entry_mut(&mut self, raw: &Raw) -> &mut DepEntry {
        match self.entries.entry(raw.id()) {
            Entry::Occupied(mut occupied) => {
                // A dead value's address was reused; its edges are meaningless now.
                if !occupied.get().raw.refers_to(raw) {
                    occupied.insert(DepEntry::new(raw));
                }
                occupied.into_mut()
            }
            Entry::Vacant(vacant) => vacant.insert(DepEntry::new(raw)),
        }
    }

    fn live_entry_mut(&mut self, raw: &Raw) -> Option<&mut DepEntry> {
        self.entries
            .get_mut(&raw.id())
            .filter(|entry| entry.raw.refers_to(raw))
    }

    /// Add `reaction` to the set for `(raw, key)`. Returns true if the edge is new.
    pub(crate) fn record(&mut self, raw: &Raw, key: TrackKey, reaction: &Rc<ReactionCell>) -> bool {
        self.entry_mut(raw)
            .keys
            .entry(key)
            .or_default()
            .insert(reaction)
    }

    /// Reactions to fire for `op` on `(raw, key)`.
    ///
    /// Additions and deletions also fire the container's structural key, so
    /// enumeration and length observers re-run without having read `key`.
    pub(crate) fn collect(
        &mut self,
        raw: &Raw,
        kind: ContainerKind,
        key: &TrackKey,
        op: OperationKind,
    ) -> Batch {
        let mut batch = Batch::new();
        let Some(entry) = self.live_entry_mut(raw) else {
            return batch;
        };

        entry.gather(key, &mut batch);
        if op.is_structural() {
            entry.gather(&TrackKey::structural(kind), &mut batch);
        }
        batch
    }

    /// Every reaction registered on any key of `raw`.
    pub(crate) fn collect_all(&mut self, raw: &Raw) -> Batch {
        let mut batch = Batch::new();
        if let Some(entry) = self.live_entry_mut(raw) {
            for set in entry.keys.values_mut() {
                set.gather_into(&mut batch);
            }
        }
        batch
    }

    /// Number of live reactions registered on `(raw, key)`.
    pub(crate) fn dependent_count(&self, raw: &Raw, key: &TrackKey) -> usize {
        self.entries
            .get(&raw.id())
            .filter(|entry| entry.raw.refers_to(raw))
            .and_then(|entry| entry.keys.get(key))
            .map_or(0, ReactionSet::live_len)
    }

    /// Drop entries of dead raw values, dead reactions and empty sets.
    /// Returns the number of entries removed.
    pub(crate) fn sweep(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.raw.is_alive());
        for entry in self.entries.values_mut() {
            for set in entry.keys.values_mut() {
                set.prune();
            }
            entry.keys.retain(|_, set| !set.members.is_empty());
        }
        before - self.entries.len()
    }

    pub(crate) fn stats(&self) -> StoreStats {
        StoreStats {
            objects: self.entries.len(),
            edges: self
                .entries
                .values()
                .flat_map(|entry| entry.keys.values())
                .map(|set| set.members.len())
                .sum(),
        }
    }
}
