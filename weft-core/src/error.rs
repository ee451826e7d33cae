//! Error Types
//!
//! Everything the runtime can report, plus a pair of variants that let
//! reaction closures surface their own failures through the write that
//! triggered them.

use thiserror::Error;

use crate::value::ContainerKind;

/// Result alias used throughout the crate.
pub type Result<T, E = ReactiveError> = std::result::Result<T, E>;

/// Errors produced by the reactive runtime.
#[derive(Debug, Error)]
pub enum ReactiveError {
    /// `reactive()` was handed a scalar.
    #[error("cannot observe a {0} value; only objects, arrays, buffers, maps and sets are observable")]
    NotCompound(&'static str),

    /// The operation does not exist for this kind of container.
    #[error("`{op}` is not supported on {kind} containers")]
    Unsupported {
        op: &'static str,
        kind: ContainerKind,
    },

    /// The key cannot address a slot of this container.
    #[error("invalid key `{key}` for {kind} container")]
    InvalidKey { key: String, kind: ContainerKind },

    /// Buffer writes outside the fixed layout.
    #[error("index {index} is out of bounds for a buffer of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// An array write would pad the array with too many holes.
    #[error("writing index {index} would leave too many holes in an array of length {len}")]
    SparseWrite { index: usize, len: usize },

    /// A numeric buffer was given something that has no numeric value.
    #[error("a {0} value cannot be stored in a numeric buffer")]
    NotNumeric(&'static str),

    /// Array `length` writes must be non-negative integers.
    #[error("invalid array length {0}")]
    InvalidLength(String),

    /// Reactions kept triggering each other past the configured limit.
    #[error("reactions triggered each other more than {limit} levels deep")]
    TriggerDepthExceeded { limit: usize },

    /// Runtime configuration could not be parsed.
    #[error("invalid runtime configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// A reaction reported a failure of its own.
    #[error("reaction failed: {0}")]
    Reaction(String),

    /// Any other error raised from inside a reaction.
    #[error("{0}")]
    Other(Box<dyn std::error::Error + 'static>),
}

impl ReactiveError {
    /// Build a [`ReactiveError::Reaction`] from a message.
    pub fn reaction(message: impl Into<String>) -> Self {
        Self::Reaction(message.into())
    }

    /// Wrap an arbitrary error raised inside a reaction.
    pub fn other<E>(error: E) -> Self
    where
        E: std::error::Error + 'static,
    {
        Self::Other(Box::new(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_container_kind() {
        let err = ReactiveError::Unsupported {
            op: "push",
            kind: ContainerKind::Map,
        };
        assert_eq!(err.to_string(), "`push` is not supported on map containers");
    }

    #[test]
    fn other_wraps_foreign_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = ReactiveError::other(io);
        assert_eq!(err.to_string(), "disk gone");
    }
}
