// src/engine/scope.rs

//! Variable scopes shared between actions of one run.
//!
//! A scope is a small key/value store with an optional parent. Lookups fall
//! back to the parent on a miss; writes and removals only ever touch the
//! scope they are issued against. Group schedulers create a child scope per
//! execution so nested actions can shadow outer variables without leaking
//! writes outwards.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Values stored in a scope. Suite files seed them from TOML, so the TOML
/// value model is reused as-is.
pub type Value = toml::Value;

#[derive(Debug, Clone)]
enum Entry {
    Value(Value),
    /// Live iteration counter of an action, read at lookup time.
    Counter(Arc<AtomicU64>),
}

impl Entry {
    fn to_value(&self) -> Value {
        match self {
            Entry::Value(v) => v.clone(),
            Entry::Counter(c) => counter_value(c),
        }
    }
}

fn counter_value(counter: &AtomicU64) -> Value {
    let n = counter.load(Ordering::SeqCst);
    Value::Integer(i64::try_from(n).unwrap_or(i64::MAX))
}

#[derive(Debug, Default)]
pub struct VariableScope {
    parent: Option<Arc<VariableScope>>,
    entries: Mutex<HashMap<String, Entry>>,
}

impl VariableScope {
    /// A scope without a parent (the run-wide scope).
    pub fn root() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A nested scope that shadows `parent`.
    pub fn child(parent: Arc<VariableScope>) -> Arc<Self> {
        Arc::new(Self {
            parent: Some(parent),
            entries: Mutex::new(HashMap::new()),
        })
    }

    pub fn parent(&self) -> Option<&Arc<VariableScope>> {
        self.parent.as_ref()
    }

    /// Look `name` up here, then in the parent chain.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(entry) = self.entries().get(name) {
            return Some(entry.to_value());
        }
        self.parent.as_ref().and_then(|p| p.get(name))
    }

    /// Store `value` in this scope. `None` is ignored, so a lookup miss is
    /// never masked by an accidental empty write.
    pub fn set(&self, name: impl Into<String>, value: Option<Value>) {
        if let Some(value) = value {
            self.entries().insert(name.into(), Entry::Value(value));
        }
    }

    /// Remove `name` from this scope only; the parent is left untouched.
    pub fn remove(&self, name: &str) -> Option<Value> {
        self.entries().remove(name).map(|e| e.to_value())
    }

    /// Expose an iteration counter under `name`. Reads always observe the
    /// counter's current value.
    pub fn register_counter(&self, name: impl Into<String>, counter: Arc<AtomicU64>) {
        self.entries().insert(name.into(), Entry::Counter(counter));
    }

    /// Integer view of `name`, following the same lookup rules as [`get`].
    ///
    /// [`get`]: VariableScope::get
    pub fn counter(&self, name: &str) -> Option<u64> {
        match self.get(name)? {
            Value::Integer(n) => u64::try_from(n).ok(),
            _ => None,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_reads_through_but_writes_locally() {
        let root = VariableScope::root();
        root.set("a", Some(Value::from("outer")));
        root.set("b", Some(Value::from(1i64)));

        let child = VariableScope::child(Arc::clone(&root));
        child.set("a", Some(Value::from("inner")));

        assert_eq!(child.get("a"), Some(Value::from("inner")));
        assert_eq!(child.get("b"), Some(Value::from(1i64)));
        assert_eq!(root.get("a"), Some(Value::from("outer")));

        assert_eq!(child.remove("b"), None);
        assert_eq!(root.get("b"), Some(Value::from(1i64)));

        assert_eq!(child.remove("a"), Some(Value::from("inner")));
        assert_eq!(child.get("a"), Some(Value::from("outer")));
    }

    #[test]
    fn empty_write_is_ignored() {
        let scope = VariableScope::root();
        scope.set("x", Some(Value::from(true)));
        scope.set("x", None);
        assert_eq!(scope.get("x"), Some(Value::from(true)));
    }

    #[test]
    fn counters_are_live() {
        let scope = VariableScope::root();
        let counter = Arc::new(AtomicU64::new(0));
        scope.register_counter("A", Arc::clone(&counter));
        assert_eq!(scope.counter("A"), Some(0));

        counter.fetch_add(3, Ordering::SeqCst);
        assert_eq!(scope.counter("A"), Some(3));
        assert_eq!(scope.get("A"), Some(Value::from(3i64)));
    }
}
