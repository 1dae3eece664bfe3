//! Per-pipeline-id locks
//!
//! Lazily-populated map of id -> async mutex. Every mutating engine
//! operation holds its id's mutex for the full read-modify-write, including
//! the handler invocation; operations on different ids never contend.
//! Entries are kept for the process lifetime: the set of tracked titles is
//! small and an evicted lock would silently drop the serialization guarantee.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub(crate) struct LockMap {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl LockMap {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// The mutex for `id`, created on first use. The map guard is a plain
    /// std mutex and is never held across an await.
    pub(crate) fn for_id(&self, id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut inner = self.inner.lock().expect("lock map poisoned");
        inner.entry(id.to_string()).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_id_yields_the_same_mutex() {
        let locks = LockMap::new();
        let a = locks.for_id("TVo_oFoo");
        let b = locks.for_id("TVo_oFoo");
        let other = locks.for_id("Movieo_oBar");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &other));
    }
}
