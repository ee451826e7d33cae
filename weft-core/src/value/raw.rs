//! Raw compound values.
//!
//! A [`Raw`] is the caller's own data: a shared, interior-mutable container
//! whose identity is its allocation. Wrappers, dependency edges and registry
//! entries all key off that identity.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::{IndexMap, IndexSet};

use super::buffer::{BufferKind, NumericBuffer};
use super::key::MapKey;
use super::Value;

/// The shape of a compound value, resolved once when it is wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// String-keyed object.
    Object,
    /// Ordered, growable sequence.
    Array,
    /// Fixed-length numeric buffer.
    Buffer,
    /// Associative container keyed by arbitrary values.
    Map,
    /// Set of arbitrary values.
    Set,
}

impl ContainerKind {
    /// Maps and sets expose their behavior through methods rather than
    /// property access, so they go through the collection adapter.
    pub fn is_collection(self) -> bool {
        matches!(self, Self::Map | Self::Set)
    }

    /// Sequence-shaped containers report membership changes through their length.
    pub fn is_sequence(self) -> bool {
        matches!(self, Self::Array | Self::Buffer)
    }

    /// Lowercase name, used in messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::Buffer => "buffer",
            Self::Map => "map",
            Self::Set => "set",
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The payload of a raw value.
///
/// Array slots are `None` where an element was deleted, leaving a hole.
#[derive(Debug, Clone)]
pub enum Compound {
    Object(IndexMap<Rc<str>, Value>),
    Array(Vec<Option<Value>>),
    Buffer(NumericBuffer),
    Map(IndexMap<MapKey, Value>),
    Set(IndexSet<MapKey>),
}

impl Compound {
    /// The container kind tag.
    pub fn kind(&self) -> ContainerKind {
        match self {
            Self::Object(_) => ContainerKind::Object,
            Self::Array(_) => ContainerKind::Array,
            Self::Buffer(_) => ContainerKind::Buffer,
            Self::Map(_) => ContainerKind::Map,
            Self::Set(_) => ContainerKind::Set,
        }
    }

    /// Number of members: properties, slots (holes included), or entries.
    pub fn len(&self) -> usize {
        match self {
            Self::Object(props) => props.len(),
            Self::Array(slots) => slots.len(),
            Self::Buffer(buffer) => buffer.len(),
            Self::Map(entries) => entries.len(),
            Self::Set(members) => members.len(),
        }
    }

    /// Check if there are no members.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Address-based identity of a raw value.
///
/// Only meaningful while the raw value is alive; stores that key on it also
/// hold a [`WeakRaw`] to detect address reuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawId(usize);

/// A shared handle to a caller-owned compound value.
///
/// Cloning the handle does not copy the data; all clones see the same
/// container and compare identical.
#[derive(Clone)]
pub struct Raw(Rc<RefCell<Compound>>);

impl Raw {
    /// Wrap `compound` in a fresh shared handle.
    pub fn new(compound: Compound) -> Self {
        Self(Rc::new(RefCell::new(compound)))
    }

    /// An empty object.
    pub fn object() -> Self {
        Self::new(Compound::Object(IndexMap::new()))
    }

    /// An object with the given properties, in order.
    pub fn object_from<K, V, I>(props: I) -> Self
    where
        K: Into<Rc<str>>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let props = props
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self::new(Compound::Object(props))
    }

    /// An array holding the given elements.
    pub fn array<V, I>(items: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        Self::new(Compound::Array(
            items.into_iter().map(|item| Some(item.into())).collect(),
        ))
    }

    /// A zero-filled buffer of `len` elements.
    pub fn buffer(kind: BufferKind, len: usize) -> Self {
        Self::new(Compound::Buffer(NumericBuffer::zeroed(kind, len)))
    }

    /// A buffer initialized from numbers, coerced to the element kind.
    pub fn buffer_from<I>(kind: BufferKind, items: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        Self::new(Compound::Buffer(NumericBuffer::from_values(kind, items)))
    }

    /// A map holding the given entries. Later duplicates overwrite earlier ones.
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<Value>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let entries = entries
            .into_iter()
            .map(|(key, value)| (MapKey::new(key.into()), value.into()))
            .collect();
        Self::new(Compound::Map(entries))
    }

    /// A set holding the given members.
    pub fn set<V, I>(members: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        let members = members
            .into_iter()
            .map(|member| MapKey::new(member.into()))
            .collect();
        Self::new(Compound::Set(members))
    }

    /// Identity of this raw value, its address.
    pub fn id(&self) -> RawId {
        RawId(Rc::as_ptr(&self.0) as *const () as usize)
    }

    /// The container kind of the current payload.
    pub fn kind(&self) -> ContainerKind {
        self.0.borrow().kind()
    }

    /// Check if both handles refer to the same raw value.
    pub fn ptr_eq(&self, other: &Raw) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Borrow the payload. Reads through this borrow are not tracked.
    pub fn borrow(&self) -> Ref<'_, Compound> {
        self.0.borrow()
    }

    /// Mutably borrow the payload. Writes through this borrow do not fire
    /// reactions; go through the observable for that.
    pub fn borrow_mut(&self) -> RefMut<'_, Compound> {
        self.0.borrow_mut()
    }

    pub(crate) fn downgrade(&self) -> WeakRaw {
        WeakRaw(Rc::downgrade(&self.0))
    }
}

impl PartialEq for Raw {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Raw {}

impl fmt::Debug for Raw {
    // Containers may hold themselves, so only the shape is printed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(compound) => f
                .debug_struct("Raw")
                .field("kind", &compound.kind())
                .field("len", &compound.len())
                .finish(),
            Err(_) => f.debug_struct("Raw").finish_non_exhaustive(),
        }
    }
}

impl From<Compound> for Raw {
    fn from(compound: Compound) -> Self {
        Self::new(compound)
    }
}

/// Non-owning counterpart of [`Raw`].
#[derive(Clone)]
pub(crate) struct WeakRaw(Weak<RefCell<Compound>>);

impl WeakRaw {
    pub(crate) fn upgrade(&self) -> Option<Raw> {
        self.0.upgrade().map(Raw)
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    /// True if this still points at the live value `raw`.
    pub(crate) fn refers_to(&self, raw: &Raw) -> bool {
        self.is_alive() && std::ptr::eq(self.0.as_ptr(), Rc::as_ptr(&raw.0))
    }
}
