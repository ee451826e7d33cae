//! Interception Adapters
//!
//! Translate operations on an [`Observable`](crate::reactive::Observable)
//! into reads and writes of its raw value, recording dependencies on reads
//! and firing reactions on writes.
//!
//! - [`plain`]: objects, arrays and numeric buffers, addressed by property key.
//! - [`collection`]: maps and sets, addressed through their methods.
//!
//! Both follow the same discipline: borrow the raw value only for the
//! duration of the underlying operation, then release it before recording
//! or firing, since reactions read the same value.

pub(crate) mod collection;
pub(crate) mod plain;
