//! Hands due tasks to their executors

use super::executor::Provider;
use super::hooks::RingLog;
use super::metrics::RING_METRICS;
use super::pool::TaskPool;
use super::submit::Submitter;
use super::task::{ids_of, TaskId, TaskKind, TaskRef};
use super::wheel::{Action, Registrar};
use super::Tick;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Consumer of the execute channel
pub(crate) struct Dispatcher<I, K, V> {
    pub(crate) provider: Arc<Provider<I, K, V>>,
    pub(crate) submitter: Submitter,
    pub(crate) registrar: Registrar<I, K, V>,
    pub(crate) pool: Arc<TaskPool<I, K, V>>,
    pub(crate) log: RingLog,
    pub(crate) retry: bool,
}

impl<I: TaskId, K: TaskKind, V: Send + Sync + 'static> Dispatcher<I, K, V> {
    pub(crate) async fn run(self, mut execute: mpsc::Receiver<Action<I, K, V>>, token: CancellationToken) {
        loop {
            tokio::select! {
                biased;

                _ = token.cancelled() => break,

                action = execute.recv() => match action {
                    Some(action) => self.dispatch(action),
                    None => {
                        self.log.trace(format_args!("execute chan closed"));
                        break;
                    }
                },
            }
        }
        debug!(ring = %self.log.name(), "Dispatch loop stopped");
    }

    /// Group one action by kind and submit every group
    pub(crate) fn dispatch(&self, action: Action<I, K, V>) {
        let Action { mut tasks, tick } = action;
        let mut groups = self.pool.get_map();

        for task in tasks.drain(..) {
            if task.is_stopped() {
                self.log
                    .trace(format_args!("skip stopped action: {:?}", task));
                continue;
            }
            groups
                .entry(task.kind().clone())
                .or_insert_with(|| self.pool.get_list())
                .push(task);
        }
        self.pool.put_list(tasks);

        if groups.is_empty() {
            self.log.trace(format_args!("skip empty actions"));
            self.pool.put_map(groups);
            return;
        }

        for (kind, group) in groups.drain() {
            self.submit_group(kind, group, tick);
        }
        self.pool.put_map(groups);
    }

    fn submit_group(&self, kind: K, group: Vec<TaskRef<I, K, V>>, tick: Tick) {
        let Some(executor) = self.provider.get(&kind).cloned() else {
            self.log.error(format_args!(
                "execute error: missing executor {:?} at {} {:?}",
                kind,
                tick,
                ids_of(&group)
            ));
            RING_METRICS
                .missing_executor_total
                .with_label_values(&[self.log.name()])
                .inc();
            if self.retry {
                let registrar = self.registrar.clone();
                let log = self.log.clone();
                self.submitter
                    .submit(async move { reschedule(&registrar, &log, group).await });
            }
            return;
        };

        self.log.trace(format_args!(
            "submit {} tasks of {:?} at {}",
            group.len(),
            kind,
            tick
        ));
        RING_METRICS
            .dispatched_total
            .with_label_values(&[self.log.name()])
            .inc_by(group.len() as u64);

        let registrar = self.registrar.clone();
        let log = self.log.clone();
        let retry = self.retry;
        self.submitter.submit(async move {
            let outcome = executor.execute(tick, group).await;
            if let Some(err) = &outcome.error {
                log.error(format_args!(
                    "execute error: {:#} at {} {:?}",
                    err,
                    tick,
                    ids_of(&outcome.failures)
                ));
                RING_METRICS
                    .executor_errors_total
                    .with_label_values(&[log.name()])
                    .inc();
            }
            if retry && !outcome.failures.is_empty() {
                reschedule(&registrar, &log, outcome.failures).await;
            }
        });
    }
}

/// Register failed tasks again for the next tick
async fn reschedule<I: TaskId, K: TaskKind, V: Send + Sync + 'static>(
    registrar: &Registrar<I, K, V>,
    log: &RingLog,
    tasks: Vec<TaskRef<I, K, V>>,
) {
    let count = tasks.len();
    let ids = ids_of(&tasks);
    match registrar.register(tasks, 1).await {
        Ok(()) => {
            RING_METRICS
                .retried_total
                .with_label_values(&[log.name()])
                .inc_by(count as u64);
        }
        Err(err) => log.error(format_args!("retry schedule error: {} {:?}", err, ids)),
    }
}
