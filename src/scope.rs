//! Lifecycle stores: singleton, scoped, and transient instance caching.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tracing::debug;

use crate::error::{DiResult, ErrorKind};
use crate::value::Value;

/// The uniform shape shared by all lifecycle strategies.
pub trait LifecycleStore: Send + Sync {
    /// Stores an instance under an id. A no-op for transient lifetimes.
    fn store(&self, id: &str, value: Value);
    fn contains(&self, id: &str) -> bool;
    fn retrieve(&self, id: &str) -> Option<Value>;
    /// Discards every stored instance.
    fn clear(&self);
}

/// Singleton store: instances live until the container is discarded.
///
/// First-time construction is coordinated per id through [`build_lock`]
/// (double-checked locking, the value lock is never held while a factory
/// runs), so at most one construction runs concurrently and other callers
/// receive the winner's instance.
///
/// [`build_lock`]: SingletonStore::build_lock
#[derive(Default)]
pub struct SingletonStore {
    values: RwLock<HashMap<String, Value>>,
    building: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SingletonStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The per-id construction lock. Callers lock it, re-check `retrieve`,
    /// and only then run the pipeline.
    pub(crate) fn build_lock(&self, id: &str) -> Arc<Mutex<()>> {
        self.building
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_default()
            .clone()
    }
}

impl LifecycleStore for SingletonStore {
    fn store(&self, id: &str, value: Value) {
        self.values.write().unwrap().insert(id.to_string(), value);
    }

    fn contains(&self, id: &str) -> bool {
        self.values.read().unwrap().contains_key(id)
    }

    fn retrieve(&self, id: &str) -> Option<Value> {
        self.values.read().unwrap().get(id).cloned()
    }

    fn clear(&self) {
        self.values.write().unwrap().clear();
    }
}

/// Scoped store: at most one scope is active at a time, bounded by explicit
/// begin/end calls.
///
/// Storing or retrieving with no active scope is a no-op/miss, which is what
/// degrades scoped definitions to transient behavior outside a scope.
#[derive(Default)]
pub struct ScopeRegistry {
    active: RwLock<Option<HashMap<String, Value>>>,
}

impl ScopeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a scope. A scope may not be nested within itself.
    pub fn begin(&self) -> DiResult<()> {
        let mut active = self.active.write().unwrap();
        if active.is_some() {
            return Err(ErrorKind::LifecycleMisuse {
                reason: "a scope is already active".into(),
            }
            .into());
        }
        *active = Some(HashMap::new());
        debug!("scope began");
        Ok(())
    }

    /// Closes the active scope, releasing all scoped instances atomically.
    pub fn end(&self) -> DiResult<()> {
        let mut active = self.active.write().unwrap();
        if active.take().is_none() {
            return Err(ErrorKind::LifecycleMisuse {
                reason: "no scope is active".into(),
            }
            .into());
        }
        debug!("scope ended");
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.active.read().unwrap().is_some()
    }
}

impl LifecycleStore for ScopeRegistry {
    fn store(&self, id: &str, value: Value) {
        if let Some(map) = self.active.write().unwrap().as_mut() {
            map.insert(id.to_string(), value);
        }
    }

    fn contains(&self, id: &str) -> bool {
        self.active
            .read()
            .unwrap()
            .as_ref()
            .is_some_and(|map| map.contains_key(id))
    }

    fn retrieve(&self, id: &str) -> Option<Value> {
        self.active
            .read()
            .unwrap()
            .as_ref()
            .and_then(|map| map.get(id).cloned())
    }

    fn clear(&self) {
        if let Some(map) = self.active.write().unwrap().as_mut() {
            map.clear();
        }
    }
}

/// Transient "store": never stores, never hits.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransientStore;

impl LifecycleStore for TransientStore {
    fn store(&self, _id: &str, _value: Value) {}

    fn contains(&self, _id: &str) -> bool {
        false
    }

    fn retrieve(&self, _id: &str) -> Option<Value> {
        None
    }

    fn clear(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singleton_store_round_trip() {
        let store = SingletonStore::new();
        assert!(!store.contains("a"));
        store.store("a", Value::Int(1));
        assert!(store.contains("a"));
        assert_eq!(store.retrieve("a").unwrap().as_int(), Some(1));
        store.clear();
        assert!(!store.contains("a"));
    }

    #[test]
    fn build_lock_is_stable_per_id() {
        let store = SingletonStore::new();
        let a1 = store.build_lock("a");
        let a2 = store.build_lock("a");
        let b = store.build_lock("b");
        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
    }

    #[test]
    fn scope_lifecycle_misuse() {
        let scopes = ScopeRegistry::new();
        assert!(scopes.end().is_err());
        scopes.begin().unwrap();
        let err = scopes.begin().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::LifecycleMisuse { .. }));
        scopes.end().unwrap();
        assert!(scopes.end().is_err());
    }

    #[test]
    fn scoped_store_degrades_outside_a_scope() {
        let scopes = ScopeRegistry::new();
        scopes.store("a", Value::Int(1));
        assert!(scopes.retrieve("a").is_none());

        scopes.begin().unwrap();
        scopes.store("a", Value::Int(1));
        assert_eq!(scopes.retrieve("a").unwrap().as_int(), Some(1));
        scopes.end().unwrap();

        scopes.begin().unwrap();
        assert!(scopes.retrieve("a").is_none());
        scopes.end().unwrap();
    }

    #[test]
    fn transient_store_never_hits() {
        let store = TransientStore;
        store.store("a", Value::Int(1));
        assert!(!store.contains("a"));
        assert!(store.retrieve("a").is_none());
    }
}
