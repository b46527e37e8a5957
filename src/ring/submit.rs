//! Submission strategies for executor invocations

use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

type SubmitFn = dyn Fn(BoxFuture<'static, ()>) + Send + Sync;

/// Decides where executor invocations run.
///
/// Submitted work is fire-and-forget: the dispatch loop never waits for it and
/// it keeps running after the ring is reset or shut down.
#[derive(Clone)]
pub struct Submitter {
    inner: Arc<SubmitFn>,
    label: &'static str,
}

impl Submitter {
    /// Spawn every invocation as its own tokio task
    pub fn spawn() -> Self {
        Self {
            inner: Arc::new(|fut| {
                tokio::spawn(fut);
            }),
            label: "spawn",
        }
    }

    /// Spawn invocations but let at most `limit` of them run at once
    pub fn bounded(limit: usize) -> Self {
        let permits = Arc::new(Semaphore::new(limit.max(1)));
        Self {
            inner: Arc::new(move |fut| {
                let permits = permits.clone();
                tokio::spawn(async move {
                    let Ok(_permit) = permits.acquire_owned().await else {
                        return;
                    };
                    fut.await;
                });
            }),
            label: "bounded",
        }
    }

    /// Hand invocations to a caller-supplied pool
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(BoxFuture<'static, ()>) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(f),
            label: "custom",
        }
    }

    pub(crate) fn submit<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        (self.inner)(Box::pin(fut));
    }
}

impl Default for Submitter {
    fn default() -> Self {
        Self::spawn()
    }
}

impl fmt::Debug for Submitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Submitter").field("kind", &self.label).finish()
    }
}
