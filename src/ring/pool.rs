//! Reuse pools for task lists and kind-grouped task maps

use super::task::TaskRef;
use crossbeam::queue::ArrayQueue;
use std::collections::HashMap;
use std::hash::Hash;

/// Maximum number of idle containers kept per free list
const POOL_SLOTS: usize = 64;

/// Free lists of task containers.
///
/// Containers whose capacity exceeds `limit` are dropped on return instead of
/// being pooled, so a burst of registrations cannot pin memory forever.
pub struct TaskPool<I, K, V> {
    limit: usize,
    init: usize,
    lists: ArrayQueue<Vec<TaskRef<I, K, V>>>,
    maps: ArrayQueue<HashMap<K, Vec<TaskRef<I, K, V>>>>,
}

impl<I, K: Eq + Hash, V> TaskPool<I, K, V> {
    /// Create a pool; `init` is the capacity hint for fresh lists
    pub fn new(limit: usize, init: usize) -> Self {
        Self {
            limit,
            init,
            lists: ArrayQueue::new(POOL_SLOTS),
            maps: ArrayQueue::new(POOL_SLOTS),
        }
    }

    /// Take an empty task list
    pub fn get_list(&self) -> Vec<TaskRef<I, K, V>> {
        self.lists
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(self.init))
    }

    /// Return a task list to the pool
    pub fn put_list(&self, mut list: Vec<TaskRef<I, K, V>>) {
        if list.capacity() > self.limit {
            return;
        }
        list.clear();
        // full free list: let it drop
        let _ = self.lists.push(list);
    }

    /// Take an empty kind-to-tasks map
    pub fn get_map(&self) -> HashMap<K, Vec<TaskRef<I, K, V>>> {
        self.maps.pop().unwrap_or_default()
    }

    /// Return a kind-to-tasks map to the pool
    pub fn put_map(&self, mut map: HashMap<K, Vec<TaskRef<I, K, V>>>) {
        if map.capacity() > self.limit {
            return;
        }
        map.clear();
        let _ = self.maps.push(map);
    }

    /// Number of idle lists currently pooled
    pub fn idle_lists(&self) -> usize {
        self.lists.len()
    }

    /// Number of idle maps currently pooled
    pub fn idle_maps(&self) -> usize {
        self.maps.len()
    }
}
