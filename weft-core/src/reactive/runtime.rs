//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects observables and
//! reactions. It owns the identity registry, the dependency store and the
//! execution context, and it runs reactions when their inputs change.
//!
//! # How It Works
//!
//! 1. `reactive(raw)` returns the raw value's wrapper, creating it (and the
//!    value's dependency entry) on first use.
//!
//! 2. `observe(f)` runs `f` inside an execution frame. Every observable read
//!    made while the frame is on top records an edge from `(raw, key)` to
//!    the reaction.
//!
//! 3. A write through an observable asks the store which reactions depend on
//!    the written key and runs each of them, synchronously, before the write
//!    returns.
//!
//! # Threading
//!
//! A runtime is single-threaded (`Rc`/`RefCell` throughout). Each thread has
//! its own default runtime behind [`Runtime::current`]; explicit runtimes can
//! be created for isolation.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use super::context::ExecutionStack;
use super::observable::Observable;
use super::operation::{OperationKind, TrackKey};
use super::reaction::{Reaction, ReactionId};
use super::registry::IdentityRegistry;
use super::store::{Batch, DependencyStore};
use crate::config::RuntimeConfig;
use crate::error::{ReactiveError, Result};
use crate::value::{ContainerKind, Raw, Value};

thread_local! {
    static DEFAULT_RUNTIME: Runtime = Runtime::new();
}

/// Snapshot of a runtime's bookkeeping, as returned by [`Runtime::stats`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Wrapped raw values that are still alive.
    pub wrappers: usize,
    /// Raw values with a dependency entry (including ones not yet swept).
    pub tracked_objects: usize,
    /// Dependency edges across all tracked values.
    pub edges: usize,
}

struct RuntimeInner {
    config: RuntimeConfig,
    registry: RefCell<IdentityRegistry>,
    store: RefCell<DependencyStore>,
    context: ExecutionStack,
    trigger_depth: Cell<usize>,
    wraps_since_sweep: Cell<usize>,
}

/// A reactive runtime.
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Runtime(Rc<RuntimeInner>);

impl Runtime {
    /// Create a runtime with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a runtime with an explicit configuration.
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self(Rc::new(RuntimeInner {
            config,
            registry: RefCell::new(IdentityRegistry::new()),
            store: RefCell::new(DependencyStore::new()),
            context: ExecutionStack::new(),
            trigger_depth: Cell::new(0),
            wraps_since_sweep: Cell::new(0),
        }))
    }

    /// This thread's default runtime, used by the crate-level
    /// [`reactive`](crate::reactive()) and [`observe`](crate::observe) functions.
    pub fn current() -> Self {
        DEFAULT_RUNTIME.with(Runtime::clone)
    }

    /// The configuration this runtime was created with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.0.config
    }

    pub(crate) fn context(&self) -> &ExecutionStack {
        &self.0.context
    }

    /// Check if both handles refer to the same runtime.
    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    // ------------------------------------------------------------------------
    // Entry points
    // ------------------------------------------------------------------------

    /// Get the observable wrapper for a compound value.
    ///
    /// An observable is returned unchanged. A raw compound gets its existing
    /// wrapper, or a new one on first use. Scalars are rejected.
    pub fn reactive(&self, value: impl Into<Value>) -> Result<Observable> {
        match value.into() {
            Value::Observable(observable) => Ok(observable),
            Value::Compound(raw) => Ok(self.wrap(&raw)),
            other => Err(ReactiveError::NotCompound(other.type_name())),
        }
    }

    /// Register `f` as a reaction and run it once.
    ///
    /// The reaction re-runs whenever an observable it read changes, for as
    /// long as the returned handle (or a clone of it) is alive. An error from
    /// the initial run is returned and the reaction is discarded.
    pub fn observe<F>(&self, f: F) -> Result<Reaction>
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.observe_with(move |_| f().map(|()| Value::Undefined))
    }

    /// Like [`observe`](Self::observe), for bodies that take arguments and
    /// return a value. Runs triggered by the runtime pass no arguments;
    /// [`Reaction::call`] passes its own.
    pub fn observe_with<F>(&self, f: F) -> Result<Reaction>
    where
        F: Fn(&[Value]) -> Result<Value> + 'static,
    {
        let reaction = Reaction::new(self.clone(), Box::new(f));
        debug!(reaction = ?reaction.id(), "registered reaction");
        reaction.run()?;
        Ok(reaction)
    }

    /// Check if a reaction is running.
    pub fn is_tracking(&self) -> bool {
        self.0.context.is_active()
    }

    /// The innermost running reaction, if any.
    pub fn current_reaction(&self) -> Option<ReactionId> {
        self.0.context.current().map(|reaction| reaction.id())
    }

    // ------------------------------------------------------------------------
    // Wrapping
    // ------------------------------------------------------------------------

    /// The wrapper of `raw`, registering it on first use.
    pub(crate) fn wrap(&self, raw: &Raw) -> Observable {
        let existing = self.existing_wrapper(raw);
        if let Some(wrapper) = existing {
            return wrapper;
        }

        let kind = raw.kind();
        let wrapper = Observable::new(self, raw.clone(), kind);
        self.0.registry.borrow_mut().insert(&wrapper);
        self.0.store.borrow_mut().ensure_entry(raw);
        debug!(%kind, "created observable wrapper");

        self.maybe_sweep();
        wrapper
    }

    pub(crate) fn existing_wrapper(&self, raw: &Raw) -> Option<Observable> {
        self.0.registry.borrow().wrapper_of(self, raw)
    }

    /// Wrap a compound read out of an object, array or buffer.
    pub(crate) fn wrap_value(&self, value: Value) -> Value {
        match value {
            Value::Compound(raw) => Value::Observable(self.wrap(&raw)),
            other => other,
        }
    }

    /// Wrap a compound read out of a map or set.
    ///
    /// Outside a reaction nothing can be tracked through a new wrapper, so an
    /// existing wrapper is reused but none is created.
    pub(crate) fn wrap_value_if_tracking(&self, value: Value) -> Value {
        match value {
            Value::Compound(raw) if self.is_tracking() => Value::Observable(self.wrap(&raw)),
            Value::Compound(raw) => match self.existing_wrapper(&raw) {
                Some(wrapper) => Value::Observable(wrapper),
                None => Value::Compound(raw),
            },
            other => other,
        }
    }

    // ------------------------------------------------------------------------
    // Tracking and triggering
    // ------------------------------------------------------------------------

    /// Credit the running reaction, if any, with a dependency on `(raw, key)`.
    pub(crate) fn track(&self, raw: &Raw, key: TrackKey, op: OperationKind) {
        let Some(reaction) = self.0.context.current() else {
            return;
        };
        trace!(reaction = ?reaction.id(), ?op, %key, "tracked read");
        self.0.store.borrow_mut().record(raw, key, &reaction);
    }

    /// Run every reaction that depends on `op` applied to `(raw, key)`.
    pub(crate) fn trigger(
        &self,
        raw: &Raw,
        kind: ContainerKind,
        key: TrackKey,
        op: OperationKind,
    ) -> Result<()> {
        let batch = self.0.store.borrow_mut().collect(raw, kind, &key, op);
        self.fire(batch, &key, op)
    }

    /// Run every reaction that depends on any key of `raw`.
    pub(crate) fn trigger_all(&self, raw: &Raw, op: OperationKind) -> Result<()> {
        let batch = self.0.store.borrow_mut().collect_all(raw);
        self.fire(batch, &TrackKey::Iterate, op)
    }

    fn fire(&self, batch: Batch, key: &TrackKey, op: OperationKind) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        debug!(?op, %key, reactions = batch.len(), "firing reactions");

        let _depth = self.enter_trigger()?;
        for reaction in &batch {
            reaction.run_tracked(&[])?;
        }
        Ok(())
    }

    fn enter_trigger(&self) -> Result<TriggerDepth<'_>> {
        let depth = self.0.trigger_depth.get();
        if let Some(limit) = self.0.config.max_trigger_depth {
            if depth >= limit {
                warn!(limit, "reaction trigger depth exceeded");
                return Err(ReactiveError::TriggerDepthExceeded { limit });
            }
        }
        self.0.trigger_depth.set(depth + 1);
        Ok(TriggerDepth(&self.0.trigger_depth))
    }

    // ------------------------------------------------------------------------
    // Introspection and housekeeping
    // ------------------------------------------------------------------------

    /// Number of live reactions that depend on `key` of `target`.
    pub fn dependent_count(&self, target: &Observable, key: &TrackKey) -> usize {
        self.0.store.borrow().dependent_count(target.raw(), key)
    }

    /// Sweep registry and dependency entries whose values have died.
    /// Returns the number of entries removed.
    pub fn purge(&self) -> usize {
        self.0.wraps_since_sweep.set(0);
        let wrappers = self.0.registry.borrow_mut().sweep();
        let objects = self.0.store.borrow_mut().sweep();
        debug!(wrappers, objects, "purged dead entries");
        wrappers + objects
    }

    fn maybe_sweep(&self) {
        let interval = self.0.config.sweep_interval;
        if interval == 0 {
            return;
        }
        let count = self.0.wraps_since_sweep.get() + 1;
        if count >= interval {
            self.purge();
        } else {
            self.0.wraps_since_sweep.set(count);
        }
    }

    /// Snapshot the registry and dependency store sizes.
    pub fn stats(&self) -> RuntimeStats {
        let store = self.0.store.borrow().stats();
        RuntimeStats {
            wrappers: self.0.registry.borrow().live_len(),
            tracked_objects: store.objects,
            edges: store.edges,
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Runtime {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Runtime {}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.0.config)
            .field("stats", &self.stats())
            .field("tracking", &self.is_tracking())
            .finish()
    }
}

/// Decrements the trigger depth when a batch finishes, even on error.
struct TriggerDepth<'a>(&'a Cell<usize>);

impl Drop for TriggerDepth<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
