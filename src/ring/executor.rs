//! Executors run groups of due tasks of one kind

use super::task::{TaskKind, TaskRef};
use super::Tick;
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Result of one executor invocation.
///
/// `failures` are the tasks that should run again; with retry enabled they
/// are rescheduled for the next tick. `error` is only logged.
pub struct ExecutionOutcome<I, K, V> {
    pub failures: Vec<TaskRef<I, K, V>>,
    pub error: Option<anyhow::Error>,
}

impl<I, K, V> ExecutionOutcome<I, K, V> {
    /// Every task succeeded
    pub fn ok() -> Self {
        Self {
            failures: Vec::new(),
            error: None,
        }
    }

    /// Some tasks should be retried, without an error to report
    pub fn retry(failures: Vec<TaskRef<I, K, V>>) -> Self {
        Self {
            failures,
            error: None,
        }
    }

    /// Some tasks failed with an error
    pub fn failed(failures: Vec<TaskRef<I, K, V>>, error: impl Into<anyhow::Error>) -> Self {
        Self {
            failures,
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.failures.is_empty() && self.error.is_none()
    }
}

/// Executes a batch of tasks sharing one kind
#[async_trait]
pub trait Executor<I, K, V>: Send + Sync {
    async fn execute(&self, tick: Tick, tasks: Vec<TaskRef<I, K, V>>) -> ExecutionOutcome<I, K, V>;
}

/// Static mapping from task kind to its executor
pub type Provider<I, K, V> = HashMap<K, Arc<dyn Executor<I, K, V>>>;

/// Executor backed by an async closure
pub struct FnExecutor<F, I, K, V> {
    f: F,
    _marker: PhantomData<fn(I, K, V)>,
}

#[async_trait]
impl<F, Fut, I, K, V> Executor<I, K, V> for FnExecutor<F, I, K, V>
where
    F: Fn(Tick, Vec<TaskRef<I, K, V>>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ExecutionOutcome<I, K, V>> + Send + 'static,
    I: Send + Sync + 'static,
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    async fn execute(&self, tick: Tick, tasks: Vec<TaskRef<I, K, V>>) -> ExecutionOutcome<I, K, V> {
        (self.f)(tick, tasks).await
    }
}

/// Wrap an async closure as a shareable executor
pub fn executor_fn<F, Fut, I, K, V>(f: F) -> Arc<dyn Executor<I, K, V>>
where
    F: Fn(Tick, Vec<TaskRef<I, K, V>>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ExecutionOutcome<I, K, V>> + Send + 'static,
    I: Send + Sync + 'static,
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    Arc::new(FnExecutor {
        f,
        _marker: PhantomData,
    })
}

/// Build a provider from `(kind, executor)` pairs
pub fn provider<I, K, V>(
    entries: impl IntoIterator<Item = (K, Arc<dyn Executor<I, K, V>>)>,
) -> Provider<I, K, V>
where
    K: TaskKind,
{
    entries.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::task::Task;

    #[tokio::test]
    async fn test_fn_executor_returns_failures() {
        let exec = executor_fn(|_tick, tasks: Vec<TaskRef<&'static str, u8, ()>>| async move {
            let failures = tasks.into_iter().filter(|t| *t.id() == "bad").collect();
            ExecutionOutcome::failed(failures, anyhow::anyhow!("bad task"))
        });

        let outcome = exec
            .execute(
                chrono::Utc::now(),
                vec![Task::shared("good", 0, ()), Task::shared("bad", 0, ())],
            )
            .await;

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(*outcome.failures[0].id(), "bad");
        assert!(outcome.error.is_some());
        assert!(!outcome.is_ok());
    }

    #[test]
    fn test_outcome_ok() {
        let outcome = ExecutionOutcome::<u32, u8, ()>::ok();
        assert!(outcome.is_ok());
    }

    #[test]
    fn test_provider_from_pairs() {
        let exec = executor_fn(|_tick, _tasks: Vec<TaskRef<u32, u8, ()>>| async {
            ExecutionOutcome::ok()
        });
        let p = provider([(0u8, exec.clone()), (1u8, exec)]);
        assert_eq!(p.len(), 2);
        assert!(p.contains_key(&1));
    }
}
