#![forbid(unsafe_code)]

//! Data plane for the rockpool engine: ordered score indexes, blocking
//! queues, and the keyspace that binds them to key names.

mod queue;
mod score;

pub use queue::BlockingQueue;
pub use score::{Score, ScoreIndex};

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,
}

/// Structure kind bound to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Scores,
    Queue,
}

impl Kind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scores => "zset",
            Self::Queue => "list",
        }
    }
}

#[derive(Debug, Clone)]
enum Binding {
    Scores(Arc<Mutex<ScoreIndex>>),
    Queue(Arc<BlockingQueue>),
}

/// Registry mapping key names to their backing structures.
///
/// A key is bound to exactly one structure kind for its lifetime; the
/// binding is created on first use by either command family and persists
/// until the keyspace is dropped. Resolution clones the shared handle under
/// a narrow map mutex and releases it, so structure-level work never blocks
/// unrelated-key creation.
///
/// Explicitly constructed and owned — no process-global instance; tests
/// build their own.
#[derive(Debug, Default)]
pub struct KeySpace {
    bindings: Mutex<HashMap<String, Binding>>,
}

impl KeySpace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bound keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.lock().is_empty()
    }

    /// Kind currently bound to `key`, if any.
    #[must_use]
    pub fn kind(&self, key: &str) -> Option<Kind> {
        match self.bindings.lock().get(key) {
            Some(Binding::Scores(_)) => Some(Kind::Scores),
            Some(Binding::Queue(_)) => Some(Kind::Queue),
            None => None,
        }
    }

    /// Resolve `key` as a score index, creating an empty one on first use.
    /// The entry API makes racing first accesses create exactly one
    /// instance.
    pub fn scores(&self, key: &str) -> Result<Arc<Mutex<ScoreIndex>>, StoreError> {
        let mut bindings = self.bindings.lock();
        match bindings.entry(key.to_owned()) {
            Entry::Occupied(entry) => match entry.get() {
                Binding::Scores(index) => Ok(Arc::clone(index)),
                Binding::Queue(_) => Err(StoreError::WrongType),
            },
            Entry::Vacant(slot) => {
                debug!(key, kind = "zset", "bound new key");
                let index = Arc::new(Mutex::new(ScoreIndex::new()));
                slot.insert(Binding::Scores(Arc::clone(&index)));
                Ok(index)
            }
        }
    }

    /// Resolve `key` as a blocking queue, creating an empty one on first
    /// use.
    pub fn queue(&self, key: &str) -> Result<Arc<BlockingQueue>, StoreError> {
        let mut bindings = self.bindings.lock();
        match bindings.entry(key.to_owned()) {
            Entry::Occupied(entry) => match entry.get() {
                Binding::Queue(queue) => Ok(Arc::clone(queue)),
                Binding::Scores(_) => Err(StoreError::WrongType),
            },
            Entry::Vacant(slot) => {
                debug!(key, kind = "list", "bound new key");
                let queue = Arc::new(BlockingQueue::new());
                slot.insert(Binding::Queue(Arc::clone(&queue)));
                Ok(queue)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_use_binds_and_repeated_use_resolves_same_instance() {
        let keys = KeySpace::new();
        let first = keys.scores("zk").unwrap();
        first.lock().add_or_update("a", 1.0);
        let second = keys.scores("zk").unwrap();
        assert_eq!(second.lock().rank("a"), Some(0));
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn kind_clash_is_wrongtype_both_ways() {
        let keys = KeySpace::new();
        keys.scores("zk").unwrap();
        assert_eq!(keys.queue("zk").unwrap_err(), StoreError::WrongType);
        keys.queue("lk").unwrap();
        assert_eq!(keys.scores("lk").unwrap_err(), StoreError::WrongType);
    }

    #[test]
    fn kind_is_reported_correctly() {
        let keys = KeySpace::new();
        assert_eq!(keys.kind("zk"), None);
        keys.scores("zk").unwrap();
        keys.queue("lk").unwrap();
        assert_eq!(keys.kind("zk"), Some(Kind::Scores));
        assert_eq!(keys.kind("lk"), Some(Kind::Queue));
        assert_eq!(keys.kind("zk").unwrap().as_str(), "zset");
        assert_eq!(keys.kind("lk").unwrap().as_str(), "list");
    }

    #[test]
    fn binding_outlives_emptiness() {
        let keys = KeySpace::new();
        let index = keys.scores("zk").unwrap();
        index.lock().add_or_update("a", 1.0);
        index.lock().remove("a");
        assert!(index.lock().is_empty());
        // The key stays bound to its kind even when emptied.
        assert_eq!(keys.queue("zk").unwrap_err(), StoreError::WrongType);
    }

    #[test]
    fn racing_first_use_creates_one_instance() {
        let keys = Arc::new(KeySpace::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let keys = Arc::clone(&keys);
                std::thread::spawn(move || {
                    let index = keys.scores("zk").unwrap();
                    index.lock().add_or_update(&format!("m{i}"), f64::from(i));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(keys.len(), 1);
        assert_eq!(keys.scores("zk").unwrap().lock().len(), 8);
    }
}
