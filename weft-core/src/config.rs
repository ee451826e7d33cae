//! Runtime Configuration
//!
//! Knobs that change how a [`Runtime`](crate::reactive::Runtime) behaves.
//! The defaults suit almost every program; they exist mainly to bound
//! runaway reaction cycles and to tune how often dead bookkeeping is swept.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default limit on nested triggers before a write fails.
pub const DEFAULT_MAX_TRIGGER_DEPTH: usize = 128;

/// Default number of newly created wrappers between automatic sweeps.
pub const DEFAULT_SWEEP_INTERVAL: usize = 256;

/// Configuration for a reactive runtime.
///
/// # Example
///
/// ```rust
/// use weft_core::RuntimeConfig;
///
/// let config = RuntimeConfig::from_json(r#"{ "max_trigger_depth": 16 }"#).unwrap();
/// assert_eq!(config.max_trigger_depth, Some(16));
/// assert_eq!(config.sweep_interval, 256);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// How many levels deep a write may fire reactions whose own writes fire
    /// further reactions. `None` removes the limit, in which case a pair of
    /// reactions writing each other's inputs recurses until the stack runs out.
    pub max_trigger_depth: Option<usize>,

    /// Sweep dead registry and dependency entries after this many new
    /// wrappers. Zero turns automatic sweeping off; `Runtime::purge` still works.
    pub sweep_interval: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_trigger_depth: Some(DEFAULT_MAX_TRIGGER_DEPTH),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Set the nested trigger limit.
    pub fn max_trigger_depth(mut self, depth: Option<usize>) -> Self {
        self.max_trigger_depth = depth;
        self
    }

    /// Set the automatic sweep interval.
    pub fn sweep_interval(mut self, interval: usize) -> Self {
        self.sweep_interval = interval;
        self
    }
}
