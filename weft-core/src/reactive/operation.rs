//! Operation kinds and tracking keys.

use std::fmt;

use crate::value::{ContainerKind, MapKey, PropertyKey};

/// Why a dependency is recorded, or which kind of mutation fires reactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// A key was read.
    Get,
    /// A key's presence was checked.
    Has,
    /// The container's members were enumerated.
    Iterate,
    /// An existing key got a different value.
    Set,
    /// A key that did not exist was created.
    Add,
    /// An existing key was removed.
    Delete,
    /// Every member was removed at once.
    Clear,
}

impl OperationKind {
    /// Mutations that change which keys exist, and therefore what
    /// enumeration or length observers see.
    pub fn is_structural(self) -> bool {
        matches!(self, Self::Add | Self::Delete | Self::Clear)
    }
}

/// The key under which a dependency edge is stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrackKey {
    /// A property of an object, array or buffer.
    Property(PropertyKey),
    /// An entry of a map or a member of a set.
    Entry(MapKey),
    /// The length of a sequence.
    Length,
    /// Enumeration of an object's keys or a collection's members. Distinct
    /// from every real key.
    Iterate,
}

impl TrackKey {
    /// The key whose observers must hear about added or removed members.
    pub fn structural(kind: ContainerKind) -> Self {
        if kind.is_sequence() {
            Self::Length
        } else {
            Self::Iterate
        }
    }
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Property(key) => write!(f, "{key}"),
            Self::Entry(key) => write!(f, "entry({:?})", key.value()),
            Self::Length => f.write_str("length"),
            Self::Iterate => f.write_str("<iterate>"),
        }
    }
}
