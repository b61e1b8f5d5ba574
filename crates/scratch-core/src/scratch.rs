//! The per-render scratch store
//!
//! A [`Scratch`] is a writable context that templates use for stateful work
//! during one rendering pass: counters, accumulated strings or lists, and
//! keyed maps that are read back in sorted order.
//!
//! # Thread Safety
//!
//! All state lives behind a single `parking_lot::RwLock`. Reads take the
//! shared lock, writes take the exclusive lock, and every public method holds
//! its lock for the whole operation, so each call is atomic with respect to
//! all others. Nothing calls back into the store while a lock is held.
//!
//! # Example
//!
//! ```
//! use scratch_core::{Scratch, Value};
//!
//! let scratch = Scratch::new();
//! scratch.set("count", 1i64);
//! scratch.add("count", 2i64).unwrap();
//! assert_eq!(scratch.get("count"), Some(Value::Int(3)));
//!
//! scratch.set_in_map("toc", "b", "Second").unwrap();
//! scratch.set_in_map("toc", "a", "First").unwrap();
//! assert_eq!(
//!     scratch.get_sorted_map_values("toc").unwrap(),
//!     Some(vec![Value::from("First"), Value::from("Second")])
//! );
//! ```

use crate::arith;
use crate::{Error, Result, ScratchConfig, Value, ValueMap};
use parking_lot::RwLock;
use tracing::{debug, trace};

/// A thread-safe key/value context for a single rendering pass
#[derive(Debug, Default)]
pub struct Scratch {
    values: RwLock<ValueMap>,
}

impl Scratch {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store sized and pre-populated from a configuration
    pub fn with_config(config: &ScratchConfig) -> Self {
        let mut values = ValueMap::with_capacity(config.initial_capacity());
        values.extend(
            config
                .defaults()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        Self {
            values: RwLock::new(values),
        }
    }

    /// Add `addend` to the value stored under `key`
    ///
    /// - No value yet: `addend` is stored as is.
    /// - A list: `addend` is appended in place; a list addend is appended
    ///   element by element.
    /// - A string: a string addend is pushed onto it in place.
    /// - A number: the two are added (ints stay ints, mixing in a float gives
    ///   a float).
    ///
    /// # Errors
    ///
    /// [`Error::Arithmetic`] or [`Error::IntegerOverflow`] if the values
    /// cannot be added, and [`Error::TypeMismatch`] if either side is a map.
    /// The stored value is left unchanged on error.
    pub fn add(&self, key: impl Into<String>, addend: impl Into<Value>) -> Result<()> {
        let key = key.into();
        let addend = addend.into();
        let mut values = self.values.write();

        match values.get_mut(&key) {
            Some(existing) => {
                arith::accumulate(&key, existing, addend).map_err(|err| {
                    debug!(key = %key, error = %err, "scratch add rejected");
                    err
                })?;
                trace!(key = %key, kind = existing.type_name(), "scratch add");
            }
            None => {
                trace!(key = %key, kind = addend.type_name(), "scratch add");
                values.insert(key, addend);
            }
        }
        Ok(())
    }

    /// Store `value` under `key`, replacing whatever was there
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        trace!(key = %key, kind = value.type_name(), "scratch set");
        self.values.write().insert(key, value);
    }

    /// Get a copy of the value stored under `key`
    ///
    /// Returns `None` if the key was never set.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    /// Remove `key`, returning its previous value
    pub fn delete(&self, key: &str) -> Option<Value> {
        let removed = self.values.write().shift_remove(key);
        if removed.is_some() {
            trace!(key = %key, "scratch delete");
        }
        removed
    }

    /// Check whether `key` holds a value
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Check if the store holds no keys
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    /// Copy every entry at a single point in time
    pub fn values(&self) -> ValueMap {
        self.values.read().clone()
    }

    /// Set `map_key` to `value` inside the map stored under `key`
    ///
    /// The map is created on first use. An existing entry for `map_key` is
    /// overwritten.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] if `key` already holds something other than a
    /// map; nothing is written in that case.
    pub fn set_in_map(
        &self,
        key: impl Into<String>,
        map_key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<()> {
        let key = key.into();
        let map_key = map_key.into();
        let value = value.into();
        let mut values = self.values.write();

        match values.get_mut(&key) {
            Some(Value::Map(map)) => {
                map.insert(map_key, value);
            }
            Some(other) => {
                let found = other.type_name();
                debug!(key = %key, found, "scratch set_in_map rejected");
                return Err(Error::type_mismatch(&key, "map", found));
            }
            None => {
                let mut map = ValueMap::new();
                map.insert(map_key, value);
                values.insert(key.clone(), Value::Map(map));
            }
        }

        trace!(key = %key, "scratch set_in_map");
        Ok(())
    }

    /// Remove `map_key` from the map stored under `key`
    ///
    /// Returns `Ok(None)` if either key is missing.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] if `key` holds something other than a map.
    pub fn delete_in_map(&self, key: &str, map_key: &str) -> Result<Option<Value>> {
        let mut values = self.values.write();
        match values.get_mut(key) {
            None => Ok(None),
            Some(Value::Map(map)) => Ok(map.shift_remove(map_key)),
            Some(other) => Err(Error::type_mismatch(key, "map", other.type_name())),
        }
    }

    /// Get the values of the map stored under `key`, ordered by map key
    ///
    /// Map keys are compared as strings in ascending order and then dropped;
    /// only the values are returned. Returns `Ok(None)` if `key` was never
    /// set.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] if `key` holds something other than a map.
    pub fn get_sorted_map_values(&self, key: &str) -> Result<Option<Vec<Value>>> {
        let values = self.values.read();
        match values.get(key) {
            None => Ok(None),
            Some(Value::Map(map)) => {
                let mut entries: Vec<(&String, &Value)> = map.iter().collect();
                entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
                Ok(Some(entries.into_iter().map(|(_, v)| v.clone()).collect()))
            }
            Some(other) => Err(Error::type_mismatch(key, "map", other.type_name())),
        }
    }
}

// The store is shared between rendering threads.
fn _assert_scratch_send_sync<T: Send + Sync>() {}
fn _scratch_is_send_sync() {
    _assert_scratch_send_sync::<Scratch>();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_add_to_absent_key() {
        let scratch = Scratch::new();
        scratch.add("x", 5i64).unwrap();
        assert_eq!(scratch.get("x"), Some(Value::Int(5)));
    }

    #[test]
    fn test_add_numbers() {
        let scratch = Scratch::new();
        scratch.set("n", 2i64);
        scratch.add("n", 3i64).unwrap();
        assert_eq!(scratch.get("n"), Some(Value::Int(5)));

        scratch.add("n", 0.5).unwrap();
        assert_eq!(scratch.get("n"), Some(Value::Float(5.5)));
    }

    #[test]
    fn test_add_strings() {
        let scratch = Scratch::new();
        scratch.set("s", "foo");
        scratch.add("s", "bar").unwrap();
        assert_eq!(scratch.get("s"), Some(Value::from("foobar")));
    }

    #[test]
    fn test_add_to_list() {
        let scratch = Scratch::new();
        scratch.set("arr", vec![1i64, 2]);
        scratch.add("arr", 3i64).unwrap();
        assert_eq!(scratch.get("arr"), Some(Value::from(vec![1i64, 2, 3])));

        scratch.add("arr", vec![4i64, 5]).unwrap();
        assert_eq!(
            scratch.get("arr"),
            Some(Value::from(vec![1i64, 2, 3, 4, 5]))
        );
    }

    #[test]
    fn test_add_many_items_one_at_a_time() {
        const N: i64 = 20_000;

        let scratch = Scratch::new();
        scratch.set("list", Vec::<Value>::new());
        scratch.set("s", "");
        for i in 0..N {
            scratch.add("list", i).unwrap();
            scratch.add("s", "ab").unwrap();
        }

        let list = scratch.get("list").unwrap();
        let items = list.as_list().unwrap();
        assert_eq!(items.len(), N as usize);
        assert_eq!(items.first(), Some(&Value::Int(0)));
        assert_eq!(items.last(), Some(&Value::Int(N - 1)));
        assert!(items.iter().zip(0..N).all(|(v, i)| *v == Value::Int(i)));

        let s = scratch.get("s").unwrap();
        let s = s.as_str().unwrap();
        assert_eq!(s.len(), 2 * N as usize);
        assert_eq!(&s[..4], "abab");
    }

    #[test]
    fn test_add_incompatible_leaves_value() {
        let scratch = Scratch::new();
        scratch.set("m", 5i64);

        let err = scratch.add("m", "text").unwrap_err();
        assert!(err.is_arithmetic());
        assert_eq!(scratch.get("m"), Some(Value::Int(5)));
    }

    #[test]
    fn test_add_overflow_leaves_value() {
        let scratch = Scratch::new();
        scratch.set("big", i64::MAX);

        let err = scratch.add("big", 1i64).unwrap_err();
        assert!(matches!(err, Error::IntegerOverflow { .. }));
        assert_eq!(scratch.get("big"), Some(Value::Int(i64::MAX)));
    }

    #[test]
    fn test_add_to_map_is_type_mismatch() {
        let scratch = Scratch::new();
        scratch.set_in_map("grp", "a", 1i64).unwrap();

        let err = scratch.add("grp", 1i64).unwrap_err();
        assert!(err.is_type_mismatch());
        assert_eq!(
            scratch.get_sorted_map_values("grp").unwrap(),
            Some(vec![Value::Int(1)])
        );
    }

    #[test]
    fn test_set_in_map_on_scalar_is_type_mismatch() {
        let scratch = Scratch::new();
        scratch.set("title", "Home");

        let err = scratch.set_in_map("title", "a", 1i64).unwrap_err();
        assert!(matches!(
            err,
            Error::TypeMismatch { ref key, expected: "map", found: "string" } if key == "title"
        ));
        assert_eq!(scratch.get("title"), Some(Value::from("Home")));
        assert!(scratch.get_sorted_map_values("title").unwrap_err().is_type_mismatch());
    }

    #[test]
    fn test_set_overwrites_any_shape() {
        let scratch = Scratch::new();
        scratch.set_in_map("k", "a", 1i64).unwrap();
        scratch.set("k", "plain");
        assert_eq!(scratch.get("k"), Some(Value::from("plain")));
    }

    #[test]
    fn test_sorted_map_values() {
        let scratch = Scratch::new();
        scratch.set_in_map("grp", "b", 2i64).unwrap();
        scratch.set_in_map("grp", "a", 1i64).unwrap();
        assert_eq!(
            scratch.get_sorted_map_values("grp").unwrap(),
            Some(vec![Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn test_sorted_map_values_overwrite_and_order() {
        let scratch = Scratch::new();
        for (k, v) in [("b", "x"), ("B", "upper"), ("a", "first"), ("b", "second")] {
            scratch.set_in_map("grp", k, v).unwrap();
        }

        let expected = Some(vec![
            Value::from("upper"),
            Value::from("first"),
            Value::from("second"),
        ]);
        assert_eq!(scratch.get_sorted_map_values("grp").unwrap(), expected);
        // Stable across repeated reads
        assert_eq!(scratch.get_sorted_map_values("grp").unwrap(), expected);
    }

    #[test]
    fn test_absent_reads() {
        let scratch = Scratch::new();
        assert_eq!(scratch.get("missing"), None);
        assert_eq!(scratch.get_sorted_map_values("missing").unwrap(), None);
        assert_eq!(scratch.delete_in_map("missing", "a").unwrap(), None);
        assert!(!scratch.contains_key("missing"));
    }

    #[test]
    fn test_empty_values_are_not_absent() {
        let scratch = Scratch::new();
        scratch.set("empty", "");
        scratch.set("nothing", Vec::<Value>::new());
        assert_eq!(scratch.get("empty"), Some(Value::from("")));
        assert_eq!(scratch.get("nothing"), Some(Value::List(vec![])));
    }

    #[test]
    fn test_repeated_set_is_stable() {
        let scratch = Scratch::new();
        for _ in 0..10 {
            scratch.set("k", "v");
            assert_eq!(scratch.get("k"), Some(Value::from("v")));
        }
        assert_eq!(scratch.len(), 1);
    }

    #[test]
    fn test_delete() {
        let scratch = Scratch::new();
        scratch.set("k", 1i64);
        assert_eq!(scratch.delete("k"), Some(Value::Int(1)));
        assert_eq!(scratch.delete("k"), None);
        assert!(scratch.is_empty());
    }

    #[test]
    fn test_delete_in_map() {
        let scratch = Scratch::new();
        scratch.set_in_map("grp", "a", 1i64).unwrap();
        scratch.set_in_map("grp", "b", 2i64).unwrap();

        assert_eq!(scratch.delete_in_map("grp", "a").unwrap(), Some(Value::Int(1)));
        assert_eq!(scratch.delete_in_map("grp", "a").unwrap(), None);
        assert_eq!(
            scratch.get_sorted_map_values("grp").unwrap(),
            Some(vec![Value::Int(2)])
        );

        scratch.set("n", 1i64);
        assert!(scratch.delete_in_map("n", "a").unwrap_err().is_type_mismatch());
    }

    #[test]
    fn test_values_snapshot() {
        let scratch = Scratch::new();
        scratch.set("a", 1i64);
        scratch.set_in_map("m", "x", true).unwrap();

        let snapshot = scratch.values();
        scratch.set("a", 2i64);

        assert_eq!(snapshot.get("a"), Some(&Value::Int(1)));
        assert_eq!(snapshot.get("m").and_then(Value::as_map).map(|m| m.len()), Some(1));
        assert_eq!(scratch.get("a"), Some(Value::Int(2)));
    }

    #[test]
    fn test_with_config_seeds_defaults() {
        let config = ScratchConfig::default()
            .with_initial_capacity(4)
            .with_default("weight", 10i64)
            .with_default("tags", vec!["rust"]);

        let scratch = Scratch::with_config(&config);
        assert_eq!(scratch.len(), 2);
        scratch.add("weight", 5i64).unwrap();
        scratch.add("tags", "web").unwrap();
        assert_eq!(scratch.get("weight"), Some(Value::Int(15)));
        assert_eq!(scratch.get("tags"), Some(Value::from(vec!["rust", "web"])));

        // Each store gets its own copy of the defaults
        let fresh = Scratch::with_config(&config);
        assert_eq!(fresh.get("weight"), Some(Value::Int(10)));
    }

    #[test]
    fn test_concurrent_adds() {
        const THREADS: usize = 8;
        const ADDS_PER_THREAD: usize = 250;

        let scratch = Scratch::new();
        scratch.set("counter", 0i64);

        thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    for _ in 0..ADDS_PER_THREAD {
                        scratch.add("counter", 1i64).unwrap();
                    }
                });
            }
        });

        assert_eq!(
            scratch.get("counter"),
            Some(Value::Int((THREADS * ADDS_PER_THREAD) as i64))
        );
    }

    #[test]
    fn test_concurrent_set_in_map() {
        let scratch = Arc::new(Scratch::new());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let scratch = Arc::clone(&scratch);
                thread::spawn(move || {
                    scratch
                        .set_in_map("pages", format!("{:02}", i), i as i64)
                        .unwrap();
                    // Readers interleave with writers
                    let _ = scratch.get_sorted_map_values("pages").unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let expected: Vec<Value> = (0..16i64).map(Value::Int).collect();
        assert_eq!(
            scratch.get_sorted_map_values("pages").unwrap(),
            Some(expected)
        );
    }
}
