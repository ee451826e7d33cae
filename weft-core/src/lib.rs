//! Weft Core
//!
//! This crate provides a transparent reactive runtime for plain data.
//! It implements:
//!
//! - Observable wrappers over objects, arrays, numeric buffers, maps and sets
//! - Automatic dependency tracking of every read made inside a reaction
//! - Re-running of exactly the reactions that read what a write changed
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `value`: the dynamic value model and raw compound containers
//! - `reactive`: the runtime, observable wrappers and reactions
//! - `config`: runtime tuning knobs
//! - `error`: the crate error type
//!
//! Interception of individual operations lives in a private `adapter`
//! module, split between property-addressed containers and method-addressed
//! collections.
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use serde_json::json;
//! use weft_core::{observe, reactive, Value};
//!
//! // Wrap plain data
//! let person = reactive(json!({ "name": "Ada", "langs": ["en"] })).unwrap();
//!
//! // Register a reaction; it runs once immediately
//! let greeting = Rc::new(RefCell::new(String::new()));
//! let (state, out) = (person.clone(), greeting.clone());
//! let _reaction = observe(move || {
//!     let name = state.get("name");
//!     *out.borrow_mut() = format!("hello {}", name.as_str().unwrap_or("?"));
//!     Ok(())
//! })
//! .unwrap();
//! assert_eq!(*greeting.borrow(), "hello Ada");
//!
//! // Writing a property the reaction read re-runs it
//! person.set("name", "Grace").unwrap();
//! assert_eq!(*greeting.borrow(), "hello Grace");
//!
//! // Nested compounds come back wrapped
//! assert!(matches!(person.get("langs"), Value::Observable(_)));
//! ```

mod adapter;
pub mod config;
pub mod error;
pub mod reactive;
pub mod value;

pub use config::RuntimeConfig;
pub use error::{ReactiveError, Result};
pub use reactive::{
    Observable, OperationKind, Reaction, ReactionFn, ReactionId, Runtime, RuntimeStats, TrackKey,
};
pub use value::{
    BufferKind, Compound, ContainerKind, MapKey, NumericBuffer, PropertyKey, Raw, RawId, Value,
};

/// Wrap a compound value in the current thread's default runtime.
///
/// See [`Runtime::reactive`].
pub fn reactive(value: impl Into<Value>) -> Result<Observable> {
    Runtime::current().reactive(value)
}

/// Register a reaction in the current thread's default runtime and run it once.
///
/// The reaction keeps firing only while the returned [`Reaction`] (or a
/// clone) is held. `let _ = observe(..)` drops the handle at once, so the
/// reaction runs that first time and never again.
///
/// See [`Runtime::observe`].
pub fn observe<F>(f: F) -> Result<Reaction>
where
    F: Fn() -> Result<()> + 'static,
{
    Runtime::current().observe(f)
}

/// Register a reaction that takes arguments and returns a value.
///
/// See [`Runtime::observe_with`].
pub fn observe_with<F>(f: F) -> Result<Reaction>
where
    F: Fn(&[Value]) -> Result<Value> + 'static,
{
    Runtime::current().observe_with(f)
}
