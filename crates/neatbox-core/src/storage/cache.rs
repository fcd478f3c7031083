//! Cache backends for the `cache` service.
//!
//! The kernel registers a [`NullCache`] by default. Applications replace it
//! with another [`Cache`] implementation in their own service registration.
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use serde_json::Value;

/// A key/value cache. Backends never fail; an unusable cache behaves like a miss.
pub trait Cache: fmt::Debug {
    /// Fetch a value, `None` on a miss or when the entry expired.
    fn get(&self, key: &str) -> Option<Value>;

    /// Store a value. `expire` is in seconds, `0` keeps it until removed.
    /// Returns whether the value was stored.
    fn set(&self, key: &str, value: Value, expire: u64) -> bool;

    /// Remove a value. Returns whether something was removed.
    fn remove(&self, key: &str) -> bool;

    /// Add `by` to an integer value and return the new value. Missing or
    /// non-integer entries yield `None`.
    fn increment(&self, key: &str, by: i64) -> Option<i64>;

    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// A cache that stores nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCache;

impl Cache for NullCache {
    fn get(&self, _key: &str) -> Option<Value> {
        None
    }

    fn set(&self, _key: &str, _value: Value, _expire: u64) -> bool {
        false
    }

    fn remove(&self, _key: &str) -> bool {
        false
    }

    fn increment(&self, _key: &str, _by: i64) -> Option<i64> {
        None
    }
}

struct CacheEntry {
    value: Value,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-process cache. Lives as long as the kernel that owns it.
#[derive(Default)]
pub struct MemoryCache {
    entries: RefCell<HashMap<String, CacheEntry>>,
}

impl fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entries_count", &self.entries.borrow().len())
            .finish()
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.borrow().values().filter(|e| !e.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.borrow_mut();
        if entries.get(key)?.is_expired(Instant::now()) {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|e| e.value.clone())
    }

    fn set(&self, key: &str, value: Value, expire: u64) -> bool {
        let expires_at = (expire > 0).then(|| Instant::now() + Duration::from_secs(expire));
        self.entries
            .borrow_mut()
            .insert(key.to_string(), CacheEntry { value, expires_at });
        true
    }

    fn remove(&self, key: &str) -> bool {
        self.entries.borrow_mut().remove(key).is_some()
    }

    fn increment(&self, key: &str, by: i64) -> Option<i64> {
        let mut entries = self.entries.borrow_mut();
        let entry = entries.get_mut(key)?;
        if entry.is_expired(Instant::now()) {
            entries.remove(key);
            return None;
        }
        let next = entry.value.as_i64()?.checked_add(by)?;
        entry.value = Value::from(next);
        Some(next)
    }
}
