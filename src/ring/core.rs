//! Ring facade: public API over the wheel and dispatch loops

use super::config::RingConfig;
use super::dispatch::Dispatcher;
use super::error::{RingError, RingResult};
use super::executor::{Executor, Provider};
use super::hooks::{LogFn, RingLog};
use super::metrics::RING_METRICS;
use super::pool::TaskPool;
use super::submit::Submitter;
use super::task::{Task, TaskId, TaskKind, TaskRef};
use super::wheel::{Registrar, Wheel};
use super::TickStream;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Hashed timer-wheel scheduler.
///
/// Tasks registered with a relative tick offset are executed in batches
/// grouped by kind once their slot comes round. Cloning is cheap; clones share
/// the same loops.
pub struct Ring<I, K, V> {
    inner: Arc<RingInner<I, K, V>>,
}

struct RingInner<I, K, V> {
    parts: Parts<I, K, V>,
    generation: Mutex<Generation<I, K, V>>,
}

/// Everything that survives a reset
struct Parts<I, K, V> {
    config: RingConfig,
    provider: Arc<Provider<I, K, V>>,
    submitter: Submitter,
    log: RingLog,
    pool: Arc<TaskPool<I, K, V>>,
}

/// One incarnation of the loops; replaced wholesale by `reset`
struct Generation<I, K, V> {
    registrar: Registrar<I, K, V>,
    slot: Arc<AtomicU64>,
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl<I, K, V> Clone for Ring<I, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<I: TaskId, K: TaskKind, V: Send + Sync + 'static> Ring<I, K, V> {
    /// Start a ring bound to `token` and driven by `ticks`.
    ///
    /// # Panics
    ///
    /// Panics if `provider` is empty or `config` is invalid. Use
    /// [`Ring::builder`] to get these as errors instead.
    pub fn new(
        token: &CancellationToken,
        config: RingConfig,
        provider: Provider<I, K, V>,
        ticks: TickStream,
    ) -> Self {
        Self::builder(config)
            .provider(provider)
            .start(token, ticks)
            .unwrap_or_else(|e| panic!("failed to start ring: {}", e))
    }

    pub fn builder(config: RingConfig) -> RingBuilder<I, K, V> {
        RingBuilder::new(config)
    }

    pub fn name(&self) -> &str {
        &self.inner.parts.config.name
    }

    pub fn size(&self) -> usize {
        self.inner.parts.config.size
    }

    pub fn config(&self) -> &RingConfig {
        &self.inner.parts.config
    }

    /// Position of the wheel cursor
    pub fn current_slot(&self) -> u64 {
        self.inner.generation.lock().slot.load(Ordering::Acquire)
    }

    /// Whether the current loops have stopped accepting events
    pub fn is_closed(&self) -> bool {
        self.inner.generation.lock().registrar.is_closed()
    }

    /// Register a new task to fire `when` ticks from now.
    ///
    /// If another live task holds the same id it is cancelled and replaced.
    pub async fn register(&self, id: I, kind: K, value: V, when: u64) -> RingResult<()> {
        let mut tasks = self.inner.parts.pool.get_list();
        tasks.push(Task::shared(id, kind, value));
        self.send_register(tasks, when).await
    }

    /// Register prepared tasks in one batch.
    ///
    /// The stop mark is cleared first, so cancelled task objects can be
    /// scheduled again.
    pub async fn register_tasks(&self, when: u64, tasks: Vec<TaskRef<I, K, V>>) -> RingResult<()> {
        if tasks.is_empty() {
            return Ok(());
        }
        for task in &tasks {
            task.clear_stopped();
        }
        self.send_register(tasks, when).await
    }

    /// Cancel tasks by id.
    ///
    /// Returns [`RingError::NotExists`] without cancelling anything if any id
    /// is not scheduled.
    pub async fn remove(&self, ids: impl IntoIterator<Item = I>) -> RingResult<()> {
        let ids: Vec<I> = ids.into_iter().collect();
        if ids.is_empty() {
            return Ok(());
        }
        self.registrar()?.remove(ids).await
    }

    /// Hand a task list back to the pool
    pub fn recycle_tasks(&self, tasks: Vec<TaskRef<I, K, V>>) {
        self.inner.parts.pool.put_list(tasks);
    }

    /// Stop the current loops, drop every scheduled task, and start again on
    /// a new token and tick source. Tasks must be registered again.
    pub fn reset(&self, token: &CancellationToken, ticks: TickStream) {
        let mut generation = self.inner.generation.lock();
        generation.token.cancel();
        *generation = self.inner.parts.launch(token, ticks);
        info!(ring = %self.name(), "Ring reset");
    }

    /// Stop the current loops and wait for them to finish.
    ///
    /// Executor invocations already submitted keep running.
    pub async fn shutdown(&self) {
        let handles = {
            let mut generation = self.inner.generation.lock();
            generation.token.cancel();
            std::mem::take(&mut generation.handles)
        };

        for handle in handles {
            if let Err(e) = handle.await {
                warn!(ring = %self.name(), error = %e, "Ring loop ended abnormally");
            }
        }
        info!(ring = %self.name(), "Ring shut down");
    }

    /// Registrar of the current generation; `Closed` once its token is
    /// cancelled, even if the loop has not wound down yet
    fn registrar(&self) -> RingResult<Registrar<I, K, V>> {
        let generation = self.inner.generation.lock();
        if generation.token.is_cancelled() {
            return Err(RingError::Closed);
        }
        Ok(generation.registrar.clone())
    }

    async fn send_register(&self, tasks: Vec<TaskRef<I, K, V>>, when: u64) -> RingResult<()> {
        let count = tasks.len() as u64;
        self.registrar()?.register(tasks, when).await?;
        RING_METRICS
            .registered_total
            .with_label_values(&[self.name()])
            .inc_by(count);
        Ok(())
    }
}

impl<I: TaskId, K: TaskKind, V: Send + Sync + 'static> Parts<I, K, V> {
    /// Spawn a fresh wheel and dispatcher pair
    fn launch(&self, parent: &CancellationToken, ticks: TickStream) -> Generation<I, K, V> {
        let token = parent.child_token();
        let (events_tx, events_rx) = mpsc::channel(self.config.queue_buf);
        let (execute_tx, execute_rx) = mpsc::channel(1);
        let slot = Arc::new(AtomicU64::new(0));

        let registrar = Registrar::new(events_tx, self.config.register_max_wait(), self.log.clone());
        let wheel = Wheel::new(self.config.size, slot.clone(), self.pool.clone(), self.log.clone());
        let dispatcher = Dispatcher {
            provider: self.provider.clone(),
            submitter: self.submitter.clone(),
            registrar: registrar.clone(),
            pool: self.pool.clone(),
            log: self.log.clone(),
            retry: self.config.retry,
        };

        let handles = vec![
            tokio::spawn(wheel.run(events_rx, ticks, execute_tx, token.clone())),
            tokio::spawn(dispatcher.run(execute_rx, token.clone())),
        ];

        Generation {
            registrar,
            slot,
            token,
            handles,
        }
    }
}

impl<I, K, V> fmt::Debug for Ring<I, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ring")
            .field("name", &self.inner.parts.config.name)
            .field("size", &self.inner.parts.config.size)
            .field("retry", &self.inner.parts.config.retry)
            .field("kinds", &self.inner.parts.provider.len())
            .field("submitter", &self.inner.parts.submitter)
            .finish()
    }
}

/// Builder for Ring
pub struct RingBuilder<I, K, V> {
    config: RingConfig,
    provider: Provider<I, K, V>,
    submitter: Submitter,
    trace: Option<LogFn>,
    error: Option<LogFn>,
}

impl<I: TaskId, K: TaskKind, V: Send + Sync + 'static> RingBuilder<I, K, V> {
    pub fn new(config: RingConfig) -> Self {
        Self {
            config,
            provider: Provider::default(),
            submitter: Submitter::default(),
            trace: None,
            error: None,
        }
    }

    /// Add every executor of `provider`
    pub fn provider(mut self, provider: Provider<I, K, V>) -> Self {
        self.provider.extend(provider);
        self
    }

    /// Add the executor for one kind
    pub fn executor(mut self, kind: K, executor: Arc<dyn Executor<I, K, V>>) -> Self {
        self.provider.insert(kind, executor);
        self
    }

    pub fn submitter(mut self, submitter: Submitter) -> Self {
        self.submitter = submitter;
        self
    }

    /// Route per-tick trace messages to `f` instead of `tracing`
    pub fn trace<F>(mut self, f: F) -> Self
    where
        F: Fn(fmt::Arguments<'_>) + Send + Sync + 'static,
    {
        self.trace = Some(Arc::new(f));
        self
    }

    /// Route error messages to `f` instead of `tracing`
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(fmt::Arguments<'_>) + Send + Sync + 'static,
    {
        self.error = Some(Arc::new(f));
        self
    }

    /// Validate and spawn the loops. Must be called inside a tokio runtime.
    pub fn start(self, token: &CancellationToken, ticks: TickStream) -> RingResult<Ring<I, K, V>> {
        if self.provider.is_empty() {
            return Err(RingError::EmptyProvider);
        }
        self.config.validate()?;

        let log = RingLog::new(&self.config.name, self.trace, self.error);
        let pool = Arc::new(TaskPool::new(self.config.pool_limit, self.config.pool_init));

        info!(
            ring = %self.config.name,
            size = self.config.size,
            queue_buf = self.config.queue_buf,
            retry = self.config.retry,
            kinds = self.provider.len(),
            submitter = ?self.submitter,
            "Starting ring"
        );

        let parts = Parts {
            config: self.config,
            provider: Arc::new(self.provider),
            submitter: self.submitter,
            log,
            pool,
        };
        let generation = parts.launch(token, ticks);

        Ok(Ring {
            inner: Arc::new(RingInner {
                parts,
                generation: Mutex::new(generation),
            }),
        })
    }
}
