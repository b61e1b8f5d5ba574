//! Scratch Configuration - How fresh stores are built
//!
//! A host creates one [`Scratch`](crate::Scratch) per rendering pass. The
//! configuration describes what every one of those stores starts with: a
//! capacity hint and a set of default values that templates can read (or
//! overwrite) without setting them first.
//!
//! Configurations are plain serde types and are usually kept in RON:
//!
//! ```ron
//! (
//!     initial_capacity: 32,
//!     defaults: {
//!         "section": String("blog"),
//!         "weight": Int(0),
//!     },
//! )
//! ```

use crate::{Result, Value, ValueMap};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration for newly created scratch stores
///
/// # Example
///
/// ```
/// use scratch_core::{Scratch, ScratchConfig, Value};
///
/// let config = ScratchConfig::default().with_default("weight", 10i64);
/// let scratch = Scratch::with_config(&config);
/// assert_eq!(scratch.get("weight"), Some(Value::Int(10)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScratchConfig {
    /// Number of keys to reserve up front
    ///
    /// Defaults to `0`; the store grows as needed either way.
    initial_capacity: usize,
    /// Values copied into every new store
    defaults: ValueMap,
}

impl ScratchConfig {
    /// Parse a configuration from a RON string
    ///
    /// Missing fields fall back to their defaults.
    ///
    /// # Example
    ///
    /// ```
    /// use scratch_core::ScratchConfig;
    ///
    /// let config = ScratchConfig::from_ron_str("(initial_capacity: 16)").unwrap();
    /// assert_eq!(config.initial_capacity(), 16);
    /// assert!(config.defaults().is_empty());
    /// ```
    pub fn from_ron_str(text: &str) -> Result<Self> {
        Ok(ron::from_str(text)?)
    }

    /// Load a configuration from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_ron_str(&content)
    }

    /// Set the capacity hint
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Add a default value, replacing any earlier default for `key`
    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(key.into(), value.into());
        self
    }

    /// Get the capacity hint
    pub fn initial_capacity(&self) -> usize {
        self.initial_capacity
    }

    /// Get the default values
    pub fn defaults(&self) -> &ValueMap {
        &self.defaults
    }
}
