//! Session storage backends for the `session` service.
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

/// The `session` service as stored in the container and attached to requests.
pub type SharedSession = Rc<Box<dyn SessionStorage>>;

/// Key/value storage that lives for the duration of a user's session.
pub trait SessionStorage: fmt::Debug {
    /// Start the session. Starting twice has no effect.
    fn start(&self);

    fn is_started(&self) -> bool;

    /// The stored value, or `default`.
    fn get(&self, key: &str, default: Value) -> Value;

    fn set(&self, key: &str, value: Value);

    fn remove(&self, key: &str);
}

/// A session that remembers nothing. Registered by default.
#[derive(Debug, Default)]
pub struct NullSession {
    started: Cell<bool>,
}

impl NullSession {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for NullSession {
    fn start(&self) {
        self.started.set(true);
    }

    fn is_started(&self) -> bool {
        self.started.get()
    }

    fn get(&self, _key: &str, default: Value) -> Value {
        default
    }

    fn set(&self, _key: &str, _value: Value) {}

    fn remove(&self, _key: &str) {}
}

/// A session kept in memory for the lifetime of the process.
#[derive(Default)]
pub struct MemorySession {
    started: Cell<bool>,
    values: RefCell<HashMap<String, Value>>,
}

impl fmt::Debug for MemorySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySession")
            .field("started", &self.started.get())
            .field("values_count", &self.values.borrow().len())
            .finish()
    }
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemorySession {
    fn start(&self) {
        if !self.started.replace(true) {
            log::debug!("Memory session started");
        }
    }

    fn is_started(&self) -> bool {
        self.started.get()
    }

    fn get(&self, key: &str, default: Value) -> Value {
        self.values.borrow().get(key).cloned().unwrap_or(default)
    }

    fn set(&self, key: &str, value: Value) {
        self.values.borrow_mut().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.values.borrow_mut().remove(key);
    }
}
