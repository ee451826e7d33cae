//! Execution Context
//!
//! The execution context tracks which reaction is currently running. This
//! enables automatic dependency tracking: when an observable is read, the
//! reaction on top of the stack is credited with the dependency.
//!
//! # Implementation
//!
//! Each runtime owns a stack of frames. Running a reaction pushes a frame and
//! returns a guard; dropping the guard pops it. Because popping lives in
//! `Drop`, the stack is unwound when the reaction returns, when it returns an
//! error, and when it panics. A stale frame would credit every later read to
//! a reaction that is no longer running.
//!
//! Nested frames are supported (a reaction that calls `observe` or runs
//! another reaction); only the innermost one receives credit.

use std::cell::RefCell;
use std::rc::Rc;

use super::reaction::{ReactionCell, ReactionId};

/// The per-runtime stack of running reactions.
#[derive(Default)]
pub(crate) struct ExecutionStack {
    frames: RefCell<Vec<Rc<ReactionCell>>>,
}

impl ExecutionStack {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Push `reaction` as the current frame until the guard is dropped.
    pub(crate) fn enter(&self, reaction: Rc<ReactionCell>) -> Frame<'_> {
        let id = reaction.id();
        self.frames.borrow_mut().push(reaction);
        Frame { stack: self, id }
    }

    /// Check if a reaction is running.
    pub(crate) fn is_active(&self) -> bool {
        !self.frames.borrow().is_empty()
    }

    /// The innermost running reaction, if any.
    pub(crate) fn current(&self) -> Option<Rc<ReactionCell>> {
        self.frames.borrow().last().cloned()
    }

    #[cfg(test)]
    pub(crate) fn depth(&self) -> usize {
        self.frames.borrow().len()
    }
}

/// Guard that pops its frame when dropped.
pub(crate) struct Frame<'a> {
    stack: &'a ExecutionStack,
    id: ReactionId,
}

impl Drop for Frame<'_> {
    fn drop(&mut self) {
        let popped = self.stack.frames.borrow_mut().pop();

        // Frames are strictly nested; anything else means a guard escaped.
        if let Some(reaction) = popped {
            debug_assert_eq!(
                reaction.id(),
                self.id,
                "execution frame mismatch: expected {:?}, got {:?}",
                self.id,
                reaction.id()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{self, AssertUnwindSafe};

    use super::*;
    use crate::reactive::{Reaction, Runtime};
    use crate::value::Value;

    fn noop(runtime: &Runtime) -> Reaction {
        Reaction::new(runtime.clone(), Box::new(|_| Ok(Value::Undefined)))
    }

    #[test]
    fn stack_tracks_current_reaction() {
        let runtime = Runtime::new();
        let stack = ExecutionStack::new();
        let reaction = noop(&runtime);

        assert!(!stack.is_active());
        assert!(stack.current().is_none());

        {
            let _frame = stack.enter(Rc::clone(reaction.cell()));
            assert!(stack.is_active());
            assert_eq!(stack.current().map(|r| r.id()), Some(reaction.id()));
        }

        // Frame should be popped after drop
        assert!(!stack.is_active());
        assert!(stack.current().is_none());
    }

    #[test]
    fn nested_frames() {
        let runtime = Runtime::new();
        let stack = ExecutionStack::new();
        let outer = noop(&runtime);
        let inner = noop(&runtime);

        {
            let _outer = stack.enter(Rc::clone(outer.cell()));
            assert_eq!(stack.current().map(|r| r.id()), Some(outer.id()));

            {
                let _inner = stack.enter(Rc::clone(inner.cell()));
                assert_eq!(stack.current().map(|r| r.id()), Some(inner.id()));
                assert_eq!(stack.depth(), 2);
            }

            // After the inner frame drops, the outer one is current again
            assert_eq!(stack.current().map(|r| r.id()), Some(outer.id()));
        }

        assert!(stack.current().is_none());
    }

    #[test]
    fn frame_is_popped_on_panic() {
        let runtime = Runtime::new();
        let stack = ExecutionStack::new();
        let reaction = noop(&runtime);

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _frame = stack.enter(Rc::clone(reaction.cell()));
            panic!("reaction blew up");
        }));

        assert!(result.is_err());
        assert!(!stack.is_active());
    }
}
