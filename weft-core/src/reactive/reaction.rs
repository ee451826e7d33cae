//! Reactions
//!
//! A reaction is a re-runnable computation registered with `observe`. Every
//! run happens inside an execution frame, so the observables it reads credit
//! it with a dependency. When one of those inputs changes, the runtime runs
//! it again.
//!
//! # Ownership
//!
//! The dependency store only holds weak references to reactions. The
//! [`Reaction`] handle returned by `observe` owns it: once every clone of the
//! handle is dropped, the reaction is retired and never fires again. This
//! mirrors how a subscription handle works and avoids reference cycles
//! between state and the closures that read it.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use super::runtime::Runtime;
use crate::error::Result;
use crate::value::Value;

/// Unique identifier for a reaction.
///
/// Used to keep reaction sets free of duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReactionId(u64);

impl ReactionId {
    /// Generate a new unique reaction ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ReactionId {
    fn default() -> Self {
        Self::new()
    }
}

/// The body of a reaction: receives call arguments, returns a value.
pub type ReactionFn = dyn Fn(&[Value]) -> Result<Value>;

pub(crate) struct ReactionCell {
    id: ReactionId,
    runtime: Runtime,
    run: Box<ReactionFn>,
    run_count: Cell<usize>,
    disposed: Cell<bool>,
}

impl ReactionCell {
    pub(crate) fn id(&self) -> ReactionId {
        self.id
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Run the body with this reaction as the current frame.
    ///
    /// The frame is popped when the guard drops, whether the body returns
    /// normally, returns an error, or panics.
    pub(crate) fn run_tracked(self: &Rc<Self>, args: &[Value]) -> Result<Value> {
        if self.disposed.get() {
            return Ok(Value::Undefined);
        }

        let _frame = self.runtime.context().enter(Rc::clone(self));
        self.run_count.set(self.run_count.get() + 1);
        trace!(reaction = ?self.id, runs = self.run_count.get(), "running reaction");

        (self.run)(args)
    }
}

/// Handle to a registered reaction.
///
/// Calling [`run`](Reaction::run) or [`call`](Reaction::call) re-runs the
/// reaction under tracking, exactly as the runtime does when an input changes.
#[must_use = "a reaction stops firing once every handle to it is dropped"]
#[derive(Clone)]
pub struct Reaction(Rc<ReactionCell>);

impl Reaction {
    pub(crate) fn new(runtime: Runtime, run: Box<ReactionFn>) -> Self {
        Self(Rc::new(ReactionCell {
            id: ReactionId::new(),
            runtime,
            run,
            run_count: Cell::new(0),
            disposed: Cell::new(false),
        }))
    }

    #[cfg(test)]
    pub(crate) fn cell(&self) -> &Rc<ReactionCell> {
        &self.0
    }

    /// Unique id of this reaction.
    pub fn id(&self) -> ReactionId {
        self.0.id
    }

    /// The runtime this reaction tracks reads in.
    pub fn runtime(&self) -> &Runtime {
        &self.0.runtime
    }

    /// Re-run with no arguments.
    pub fn run(&self) -> Result<Value> {
        self.call(&[])
    }

    /// Re-run, forwarding `args` to the body.
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        self.0.run_tracked(args)
    }

    /// Stop the reaction. Later triggers and manual runs are no-ops.
    pub fn dispose(&self) {
        self.0.disposed.set(true);
    }

    /// Check if the reaction has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.0.disposed.get()
    }

    /// How many times the body has run, including the initial run.
    pub fn run_count(&self) -> usize {
        self.0.run_count.get()
    }
}

impl PartialEq for Reaction {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Reaction {}

impl fmt::Debug for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reaction")
            .field("id", &self.0.id)
            .field("run_count", &self.run_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
