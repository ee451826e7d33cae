//! Reactive Runtime
//!
//! This module implements dependency tracking over plain data: observable
//! wrappers, reactions, and the bookkeeping that connects them.
//!
//! # Concepts
//!
//! ## Observables
//!
//! An [`Observable`] wraps a raw compound value (object, array, buffer, map
//! or set). Reads through it are recorded against the running reaction, and
//! writes through it re-run every reaction that read what changed. Each raw
//! value has at most one wrapper per runtime, so wrapping is idempotent.
//!
//! ## Reactions
//!
//! A [`Reaction`] is a registered function. Every time it runs, the reads it
//! performs are recorded as dependencies, keyed by `(raw value, key)`. A
//! reaction lives as long as some handle to it does.
//!
//! # Implementation Notes
//!
//! The runtime keeps three pieces of state:
//!
//! - the identity registry, mapping raw values to their wrappers;
//! - the dependency store, mapping `(raw value, key)` to reactions;
//! - the execution stack of reactions currently running.
//!
//! The registry and the store hold only weak references, so neither keeps a
//! raw value, wrapper or reaction alive. Entries whose referent is gone are
//! swept periodically.

mod context;
mod observable;
mod operation;
mod reaction;
mod registry;
mod runtime;
mod store;

pub use observable::Observable;
pub use operation::{OperationKind, TrackKey};
pub use reaction::{Reaction, ReactionFn, ReactionId};
pub use runtime::{Runtime, RuntimeStats};
