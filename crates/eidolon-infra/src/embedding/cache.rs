//! LRU cache for embedding vectors.
//!
//! Keyed by `(text, model_id)`: a vector is only valid for the exact model
//! that produced it, and is never mutated, only replaced when the model
//! changes. The cache is an explicit object owned by the embedding
//! provider and injected at construction -- not a module-level singleton --
//! with a configured capacity and least-recently-used eviction.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

type CacheKey = (String, String);

/// Bounded LRU cache mapping `(text, model)` to an embedding vector.
///
/// A capacity of zero disables caching entirely.
pub struct EmbeddingCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

struct CacheInner {
    map: HashMap<CacheKey, Vec<f32>>,
    /// Keys in recency order, least-recently-used first.
    order: VecDeque<CacheKey>,
}

impl EmbeddingCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(CacheInner {
                map: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// Look up a cached vector, marking the entry as recently used.
    pub fn get(&self, text: &str, model: &str) -> Option<Vec<f32>> {
        if self.capacity == 0 {
            return None;
        }
        let key = (text.to_string(), model.to_string());
        let mut inner = self.inner.lock().expect("embedding cache poisoned");

        let hit = inner.map.get(&key).cloned();
        if hit.is_some() {
            if let Some(position) = inner.order.iter().position(|k| *k == key) {
                inner.order.remove(position);
                inner.order.push_back(key);
            }
        }
        hit
    }

    /// Store a vector, evicting the least-recently-used entry when full.
    pub fn insert(&self, text: &str, model: &str, vector: Vec<f32>) {
        if self.capacity == 0 {
            return;
        }
        let key = (text.to_string(), model.to_string());
        let mut inner = self.inner.lock().expect("embedding cache poisoned");

        if inner.map.insert(key.clone(), vector).is_none() {
            inner.order.push_back(key);
            if inner.order.len() > self.capacity {
                if let Some(evicted) = inner.order.pop_front() {
                    inner.map.remove(&evicted);
                }
            }
        } else if let Some(position) = inner.order.iter().position(|k| *k == key) {
            inner.order.remove(position);
            inner.order.push_back(key);
        }
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("embedding cache poisoned").map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let cache = EmbeddingCache::new(4);
        cache.insert("hello", "model-a", vec![1.0, 2.0]);

        assert_eq!(cache.get("hello", "model-a"), Some(vec![1.0, 2.0]));
        assert_eq!(cache.get("hello", "model-b"), None);
        assert_eq!(cache.get("other", "model-a"), None);
    }

    #[test]
    fn test_model_is_part_of_the_key() {
        let cache = EmbeddingCache::new(4);
        cache.insert("hello", "model-a", vec![1.0]);
        cache.insert("hello", "model-b", vec![2.0]);

        assert_eq!(cache.get("hello", "model-a"), Some(vec![1.0]));
        assert_eq!(cache.get("hello", "model-b"), Some(vec![2.0]));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_lru_eviction() {
        let cache = EmbeddingCache::new(2);
        cache.insert("a", "m", vec![1.0]);
        cache.insert("b", "m", vec![2.0]);

        // Touch "a" so "b" becomes least recently used
        cache.get("a", "m");
        cache.insert("c", "m", vec![3.0]);

        assert_eq!(cache.get("a", "m"), Some(vec![1.0]));
        assert_eq!(cache.get("b", "m"), None);
        assert_eq!(cache.get("c", "m"), Some(vec![3.0]));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_reinsert_updates_value() {
        let cache = EmbeddingCache::new(2);
        cache.insert("a", "m", vec![1.0]);
        cache.insert("a", "m", vec![9.0]);
        assert_eq!(cache.get("a", "m"), Some(vec![9.0]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_zero_capacity_disables_cache() {
        let cache = EmbeddingCache::new(0);
        cache.insert("a", "m", vec![1.0]);
        assert_eq!(cache.get("a", "m"), None);
        assert!(cache.is_empty());
    }
}
