//! Task definitions for the ring scheduler

use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

/// Identity of a scheduled task
pub trait TaskId: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static {}

impl<T> TaskId for T where T: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static {}

/// Discriminator selecting the executor responsible for a task
pub trait TaskKind: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static {}

impl<T> TaskKind for T where T: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static {}

/// Shared handle to a task. The wheel and the registry hold the same object.
pub type TaskRef<I, K, V> = Arc<Task<I, K, V>>;

/// A unit of work with one identity, one kind and one value
pub struct Task<I, K, V> {
    id: I,
    kind: K,
    value: V,

    /// Cancellation mark, checked lazily when the slot is visited
    stop: AtomicBool,

    /// Full revolutions left before the task becomes due
    round: AtomicI64,

    /// Bumped on every placement; older slot entries of this task are stale
    epoch: AtomicU64,
}

impl<I, K, V> Task<I, K, V> {
    /// Create a new task
    pub fn new(id: I, kind: K, value: V) -> Self {
        Self {
            id,
            kind,
            value,
            stop: AtomicBool::new(false),
            round: AtomicI64::new(0),
            epoch: AtomicU64::new(0),
        }
    }

    /// Create a new shared task
    pub fn shared(id: I, kind: K, value: V) -> TaskRef<I, K, V> {
        Arc::new(Self::new(id, kind, value))
    }

    pub fn id(&self) -> &I {
        &self.id
    }

    pub fn kind(&self) -> &K {
        &self.kind
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    /// Whether the task has been cancelled
    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Remaining revolutions before the task is due
    pub fn rounds(&self) -> i64 {
        self.round.load(Ordering::Acquire)
    }

    pub(crate) fn mark_stopped(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub(crate) fn clear_stopped(&self) {
        self.stop.store(false, Ordering::Release);
    }

    pub(crate) fn set_rounds(&self, rounds: i64) {
        self.round.store(rounds, Ordering::Release);
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Start a new placement, invalidating earlier slot entries
    pub(crate) fn next_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Decrement the round counter, returning the new value
    pub(crate) fn count_down(&self) -> i64 {
        self.round.fetch_sub(1, Ordering::AcqRel) - 1
    }
}

impl<I: fmt::Debug, K: fmt::Debug, V: fmt::Debug> Task<I, K, V> {
    /// Like the `Debug` rendering, with the value included:
    /// `id<kind>[value](stop:..,round:..)`
    pub fn describe(&self) -> String {
        format!(
            "{:?}<{:?}>[{:?}](stop:{},round:{})",
            self.id,
            self.kind,
            self.value,
            self.is_stopped(),
            self.rounds()
        )
    }
}

/// Omits the value, which carries no `Debug` bound; see [`Task::describe`].
impl<I: fmt::Debug, K: fmt::Debug, V> fmt::Debug for Task<I, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}<{:?}>(stop:{},round:{})",
            self.id,
            self.kind,
            self.is_stopped(),
            self.rounds()
        )
    }
}

/// Collect the ids of a task list for logging
pub(crate) fn ids_of<I: Clone, K, V>(tasks: &[TaskRef<I, K, V>]) -> Vec<I> {
    tasks.iter().map(|t| t.id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_creation() {
        let task = Task::new("t1", 0u8, "payload");
        assert_eq!(*task.id(), "t1");
        assert_eq!(*task.kind(), 0);
        assert_eq!(*task.value(), "payload");
        assert!(!task.is_stopped());
        assert_eq!(task.rounds(), 0);
    }

    #[test]
    fn test_count_down_goes_negative() {
        let task = Task::new(1u32, 0u8, ());
        task.set_rounds(1);
        assert_eq!(task.count_down(), 0);
        assert_eq!(task.count_down(), -1);
    }

    #[test]
    fn test_stop_flag() {
        let task = Task::shared("t1", 0u8, ());
        task.mark_stopped();
        assert!(task.is_stopped());
        task.clear_stopped();
        assert!(!task.is_stopped());
    }

    #[test]
    fn test_epoch_advances() {
        let task = Task::new("t1", 0u8, ());
        assert_eq!(task.epoch(), 0);
        assert_eq!(task.next_epoch(), 1);
        assert_eq!(task.next_epoch(), 2);
        assert_eq!(task.epoch(), 2);
    }

    #[test]
    fn test_debug_format() {
        let task = Task::new("t1", 2u8, ());
        task.set_rounds(3);
        assert_eq!(format!("{:?}", task), "\"t1\"<2>(stop:false,round:3)");
    }

    #[test]
    fn test_describe_includes_value() {
        let task = Task::new("t1", 2u8, "payload");
        task.set_rounds(3);
        task.mark_stopped();
        assert_eq!(task.describe(), "\"t1\"<2>[\"payload\"](stop:true,round:3)");
    }
}
