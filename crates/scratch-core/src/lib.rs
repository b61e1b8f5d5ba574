//! Scratch Core - Per-render mutable context for templates
//!
//! This crate provides a small, thread-safe key/value store that a rendering
//! engine hands to templates for the duration of one rendering pass:
//! - Dynamic value types (`Value`, `ValueMap`)
//! - Accumulation: add numbers, concatenate strings, append to lists
//! - Direct assignment: set and get a single value
//! - Aggregation maps: build a keyed map, read its values back sorted by key
//!
//! ## Lifetime
//!
//! A [`Scratch`] is created fresh for each render scope and dropped with it.
//! It is never global; the host passes it explicitly to whoever needs it.
//!
//! ```
//! use scratch_core::{Scratch, Value};
//!
//! let scratch = Scratch::new();
//! scratch.add("tags", vec!["rust"]).unwrap();
//! scratch.add("tags", "web").unwrap();
//! assert_eq!(scratch.get("tags"), Some(Value::from(vec!["rust", "web"])));
//! assert_eq!(scratch.get("missing"), None);
//! ```
//!
//! ## Logging
//!
//! Mutations emit `tracing` events at `trace` level and rejected operations
//! at `debug` level. The crate never installs a subscriber.

mod arith;
mod config;
mod error;
mod scratch;
mod value;

pub use config::ScratchConfig;
pub use error::{Error, Result};
pub use scratch::Scratch;
pub use value::{Value, ValueMap};
