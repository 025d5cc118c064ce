use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type PendingKeys = Arc<Mutex<HashSet<String>>>;

fn lock_pending(pending: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registry is the set of active entries of a handler, keyed by track or
/// receiver id. A key is reserved while the operation creating its entry is
/// in flight, so a concurrent duplicate is rejected without waiting for it.
#[derive(Debug)]
pub(crate) struct Registry<T> {
    entries: HashMap<String, T>,
    pending: PendingKeys,
}

/// Reservation holds a pending key. Dropping it without
/// [`Reservation::commit`] releases the key, also when the future that owns
/// it is cancelled.
#[derive(Debug)]
pub(crate) struct Reservation {
    pending: PendingKeys,
    key: String,
    committed: bool,
}

impl Reservation {
    pub(crate) fn key(&self) -> &str {
        self.key.as_str()
    }

    /// commit turns the reservation into an entry of `registry`.
    pub(crate) fn commit<T>(mut self, registry: &mut Registry<T>, value: T) {
        registry.entries.insert(self.key.clone(), value);
        lock_pending(&self.pending).remove(&self.key);
        self.committed = true;
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.committed {
            lock_pending(&self.pending).remove(&self.key);
        }
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Registry {
            entries: HashMap::new(),
            pending: Arc::new(Mutex::new(HashSet::new())),
        }
    }
}

impl<T> Registry<T> {
    /// reserve claims `key`. Returns None if it is active or already reserved.
    pub(crate) fn reserve(&mut self, key: &str) -> Option<Reservation> {
        if self.entries.contains_key(key) {
            return None;
        }
        if !lock_pending(&self.pending).insert(key.to_owned()) {
            return None;
        }
        Some(Reservation {
            pending: Arc::clone(&self.pending),
            key: key.to_owned(),
            committed: false,
        })
    }

    pub(crate) fn is_reserved(&self, key: &str) -> bool {
        lock_pending(&self.pending).contains(key)
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub(crate) fn get(&self, key: &str) -> Option<&T> {
        self.entries.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        self.entries.get_mut(key)
    }

    /// insert adds an entry under a key that is neither active nor reserved.
    pub(crate) fn insert(&mut self, key: &str, value: T) {
        self.entries.insert(key.to_owned(), value);
    }

    pub(crate) fn remove(&mut self, key: &str) -> Option<T> {
        self.entries.remove(key)
    }

    /// drain empties the registry, reservations included.
    pub(crate) fn drain(&mut self) -> Vec<(String, T)> {
        lock_pending(&self.pending).clear();
        self.entries.drain().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_registry_reserve_commit_release() {
        let mut registry = Registry::<u8>::default();

        let a = registry.reserve("a");
        assert!(a.is_some());
        assert!(registry.reserve("a").is_none(), "pending key must not be reserved twice");
        assert!(registry.is_reserved("a"));
        assert_eq!(registry.len(), 0);

        if let Some(a) = a {
            assert_eq!(a.key(), "a");
            a.commit(&mut registry, 1);
        }
        assert!(!registry.is_reserved("a"));
        assert!(registry.reserve("a").is_none(), "active key must not be reserved");
        assert_eq!(registry.get("a"), Some(&1));

        let b = registry.reserve("b");
        assert!(registry.is_reserved("b"));
        drop(b);
        assert!(!registry.is_reserved("b"));
        assert!(!registry.contains("b"));
        assert!(registry.reserve("b").is_some());
    }

    #[tokio::test]
    async fn test_registry_reservation_released_on_cancel() {
        let registry = tokio::sync::Mutex::new(Registry::<u8>::default());

        let pending = async {
            let _reservation = registry.lock().await.reserve("a");
            std::future::pending::<()>().await;
        };
        let timed_out =
            tokio::time::timeout(std::time::Duration::from_millis(5), pending).await;
        assert!(timed_out.is_err());

        let mut registry = registry.lock().await;
        assert!(!registry.is_reserved("a"));
        assert!(registry.reserve("a").is_some());
    }

    #[test]
    fn test_registry_remove_and_drain() {
        let mut registry = Registry::<u8>::default();
        for (i, key) in ["c", "a", "b"].iter().enumerate() {
            registry.insert(key, i as u8);
        }
        let pending = registry.reserve("pending");
        assert!(pending.is_some());

        if let Some(v) = registry.get_mut("a") {
            *v = 10;
        }
        assert_eq!(registry.keys(), vec!["a", "b", "c"]);
        assert_eq!(registry.remove("a"), Some(10));
        assert_eq!(registry.remove("a"), None);

        let drained = registry.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(registry.len(), 0);
        assert!(!registry.is_reserved("pending"));

        // a reservation outliving drain releases nothing it no longer holds
        drop(pending);
        assert!(registry.reserve("pending").is_some());
    }
}
