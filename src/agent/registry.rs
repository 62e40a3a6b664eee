//! Entity registries shared between the loop and its action sources
//!
//! Each registry maps an external id to its last-known value and tracks a
//! single "currently active" entry. The active slot is a watch cell, so
//! readers get either a fully published value or the unset state, and can
//! wait for the first publication without polling.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::watch;
use tracing::debug;

/// Registry of known entities with a currently-active slot.
///
/// Invariant: the active slot is either unset or holds a value that was
/// inserted into the map; `insert` is the only publish path.
pub struct Registry<V: Clone> {
    entries: Mutex<HashMap<String, V>>,
    current: watch::Sender<Option<V>>,
}

impl<V: Clone> Registry<V> {
    /// Create an empty registry with the active slot unset
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            entries: Mutex::new(HashMap::new()),
            current,
        }
    }

    /// Record an entity and mark it currently active
    pub fn insert(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            entries.insert(key.clone(), value.clone());
        }
        debug!(key = %key, "registry current updated");
        self.current.send_replace(Some(value));
    }

    /// Look up an entity by id
    pub fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    /// Snapshot of the currently active value, if one was ever published
    pub fn current(&self) -> Option<V> {
        self.current.borrow().clone()
    }

    /// Wait until a currently active value has been published
    pub async fn wait_current(&self) -> V {
        let mut rx = self.current.subscribe();
        let slot = rx
            .wait_for(|slot| slot.is_some())
            .await
            .expect("current slot sender lives as long as the registry");
        slot.as_ref()
            .cloned()
            .expect("wait_for only returns a published slot")
    }

    /// Number of known entities
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    /// Whether no entity has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone> Default for Registry<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_current_starts_unset() {
        let registry: Registry<String> = Registry::new();
        assert!(registry.current().is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_insert_publishes_current() {
        let registry = Registry::new();
        registry.insert("alice", "agent_1".to_string());

        assert_eq!(registry.get("alice").as_deref(), Some("agent_1"));
        assert_eq!(registry.current().as_deref(), Some("agent_1"));
    }

    #[test]
    fn test_current_always_present_in_map() {
        let registry = Registry::new();
        registry.insert("a", 1);
        registry.insert("b", 2);

        let current = registry.current().unwrap();
        assert!([1, 2].contains(&current));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_wait_current_wakes_on_first_insert() {
        let registry = Arc::new(Registry::new());

        let waiter = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.wait_current().await })
        };

        // Give the waiter a chance to park before publishing
        tokio::time::sleep(Duration::from_millis(10)).await;
        registry.insert("thread_1", "thread_1".to_string());

        let value = waiter.await.unwrap();
        assert_eq!(value, "thread_1");
    }

    #[tokio::test]
    async fn test_concurrent_writers_never_tear() {
        let registry = Arc::new(Registry::new());
        let mut handles = Vec::new();

        for i in 0..16 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry.insert(format!("key_{}", i), format!("value_{}", i));
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Whatever won the race, the slot holds one fully published value
        let current = registry.current().unwrap();
        assert!(current.starts_with("value_"));
        assert_eq!(registry.len(), 16);
    }
}
