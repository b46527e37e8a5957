//! The slot wheel and its owning loop.
//!
//! The loop is the only writer of the slots and the registry. Callers reach it
//! through the bounded event queue ([`Registrar`]); due tasks leave it through
//! the execute channel as one [`Action`] per tick.
//!
//! Placement is relative to the slot the loop is on when it processes the
//! registration: a task registered with `when` becomes due on exactly the
//! `max(when, 1)`-th following tick.
//!
//! ```text
//!   when = 65, size = 60, slot = s
//!
//!   pos   = (s + 65 % 60) % 60 = s + 5
//!   round = (65 - 1) / 60      = 1
//!
//!   tick s+5   visit: round 1 -> 0   (kept)
//!   tick s+65  visit: round 0 -> -1  (due)
//! ```

use super::error::{RingError, RingResult};
use super::hooks::RingLog;
use super::metrics::RING_METRICS;
use super::pool::TaskPool;
use super::task::{ids_of, TaskId, TaskKind, TaskRef};
use super::{Tick, TickStream};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Slots shrink back towards this capacity once a burst has drained
const SLOT_MIN_CAPACITY: usize = 8;

/// Request flowing from callers to the wheel loop
pub(crate) enum Entry<I, K, V> {
    Register {
        tasks: Vec<TaskRef<I, K, V>>,
        when: u64,
    },
    Remove {
        ids: Vec<I>,
        reply: oneshot::Sender<RingResult<()>>,
    },
}

/// Tasks that became due on one tick
pub(crate) struct Action<I, K, V> {
    pub tasks: Vec<TaskRef<I, K, V>>,
    pub tick: Tick,
}

/// Sending half of the event queue with the bounded-wait policy
pub(crate) struct Registrar<I, K, V> {
    events: mpsc::Sender<Entry<I, K, V>>,
    max_wait: Duration,
    log: RingLog,
}

impl<I, K, V> Clone for Registrar<I, K, V> {
    fn clone(&self) -> Self {
        Self {
            events: self.events.clone(),
            max_wait: self.max_wait,
            log: self.log.clone(),
        }
    }
}

impl<I: TaskId, K: TaskKind, V: Send + Sync + 'static> Registrar<I, K, V> {
    pub(crate) fn new(events: mpsc::Sender<Entry<I, K, V>>, max_wait: Duration, log: RingLog) -> Self {
        Self {
            events,
            max_wait,
            log,
        }
    }

    /// Queue tasks for placement `when` ticks ahead
    pub(crate) async fn register(&self, tasks: Vec<TaskRef<I, K, V>>, when: u64) -> RingResult<()> {
        self.send(Entry::Register { tasks, when }, "register").await
    }

    /// Cancel tasks by id; all-or-nothing, resolved by the loop.
    ///
    /// Queueing and waiting for the verdict share one `max_wait` budget. A
    /// removal whose caller gave up is skipped by the loop.
    pub(crate) async fn remove(&self, ids: Vec<I>) -> RingResult<()> {
        let started = Instant::now();
        let (reply, done) = oneshot::channel();
        self.send(Entry::Remove { ids, reply }, "remove").await?;

        let left = self.max_wait.saturating_sub(started.elapsed());
        match tokio::time::timeout(left, done).await {
            Ok(verdict) => verdict.map_err(|_| RingError::Closed)?,
            Err(_) => Err(self.busy("remove reply")),
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.events.is_closed()
    }

    async fn send(&self, entry: Entry<I, K, V>, op: &str) -> RingResult<()> {
        match self.events.send_timeout(entry, self.max_wait).await {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => Err(self.busy(op)),
            Err(SendTimeoutError::Closed(_)) => Err(RingError::Closed),
        }
    }

    fn busy(&self, op: &str) -> RingError {
        self.log.trace(format_args!("{} tasks timeout", op));
        RING_METRICS
            .busy_total
            .with_label_values(&[self.log.name()])
            .inc();
        RingError::Busy
    }
}

/// Circular slot array plus the registry of live tasks
pub(crate) struct Wheel<I, K, V> {
    size: u64,
    slot: Arc<AtomicU64>,
    /// Each entry carries the task epoch it was placed with; a mismatch marks
    /// a placement superseded by a later registration of the same object.
    slots: Vec<Vec<(u64, TaskRef<I, K, V>)>>,
    registry: HashMap<I, TaskRef<I, K, V>>,
    pool: Arc<TaskPool<I, K, V>>,
    log: RingLog,
}

impl<I: TaskId, K: TaskKind, V: Send + Sync + 'static> Wheel<I, K, V> {
    pub(crate) fn new(size: usize, slot: Arc<AtomicU64>, pool: Arc<TaskPool<I, K, V>>, log: RingLog) -> Self {
        slot.store(0, Ordering::Release);
        Self {
            size: size as u64,
            slot,
            slots: (0..size).map(|_| Vec::new()).collect(),
            registry: HashMap::new(),
            pool,
            log,
        }
    }

    /// Number of live (scheduled, not cancelled) tasks
    pub(crate) fn live(&self) -> usize {
        self.registry.len()
    }

    pub(crate) fn is_live(&self, id: &I) -> bool {
        self.registry.contains_key(id)
    }

    pub(crate) fn apply(&mut self, entry: Entry<I, K, V>) {
        match entry {
            Entry::Register { tasks, when } => self.schedule(tasks, when),
            Entry::Remove { ids, reply } => {
                if reply.is_closed() {
                    self.log.trace(format_args!("skip abandoned remove: {:?}", ids));
                    return;
                }
                let result = self.cancel(&ids);
                // caller gave up waiting: nothing to report to
                let _ = reply.send(result);
            }
        }
        self.update_live_gauge();
    }

    /// Place tasks `when` ticks ahead of the current slot
    pub(crate) fn schedule(&mut self, mut tasks: Vec<TaskRef<I, K, V>>, when: u64) {
        let when = when.max(1);
        let current = self.slot.load(Ordering::Acquire);
        let pos = ((current + when % self.size) % self.size) as usize;
        let rounds = ((when - 1) / self.size) as i64;

        for task in tasks.drain(..) {
            match self.registry.get(task.id()) {
                Some(old) if Arc::ptr_eq(old, &task) => {
                    self.log
                        .trace(format_args!("reschedule live task: {:?}", task));
                }
                Some(old) => {
                    self.log.trace(format_args!("conflict task: {:?}", old));
                    old.mark_stopped();
                }
                None => {}
            }

            task.set_rounds(rounds);
            let epoch = task.next_epoch();
            self.registry.insert(task.id().clone(), task.clone());
            self.slots[pos].push((epoch, task));
        }
        self.log
            .trace(format_args!("schedule tasks: [{}:{}] from slot {}", rounds, pos, current));
        self.pool.put_list(tasks);
    }

    /// Mark tasks stopped and unregister them; unknown ids abort the whole call
    pub(crate) fn cancel(&mut self, ids: &[I]) -> RingResult<()> {
        if let Some(missing) = ids.iter().find(|id| !self.registry.contains_key(*id)) {
            return Err(RingError::NotExists(format!("task of {:?}", missing)));
        }

        for id in ids {
            if let Some(task) = self.registry.remove(id) {
                task.mark_stopped();
            }
        }
        RING_METRICS
            .removed_total
            .with_label_values(&[self.log.name()])
            .inc_by(ids.len() as u64);
        self.log.trace(format_args!("stop tasks: {:?}", ids));
        Ok(())
    }

    /// Move to the next slot and collect the tasks that became due there
    pub(crate) fn advance(&mut self) -> Option<Vec<TaskRef<I, K, V>>> {
        let pos = (self.slot.load(Ordering::Acquire) + 1) % self.size;
        self.slot.store(pos, Ordering::Release);
        if pos == 0 {
            self.log.trace(format_args!("[0] reset slot"));
        }

        let mut due = self.pool.get_list();
        let registry = &mut self.registry;
        let slot = &mut self.slots[pos as usize];
        let before = slot.len();

        slot.retain(|(epoch, task)| {
            if task.epoch() != *epoch {
                return false;
            }
            if task.is_stopped() {
                if registry.get(task.id()).is_some_and(|live| Arc::ptr_eq(live, task)) {
                    registry.remove(task.id());
                }
                return false;
            }
            if task.count_down() >= 0 {
                return true;
            }
            due.push(task.clone());
            false
        });
        if slot.capacity() > SLOT_MIN_CAPACITY && slot.len() * 4 < slot.capacity() {
            slot.shrink_to(slot.len().max(SLOT_MIN_CAPACITY));
        }

        if before > 0 {
            self.log.trace(format_args!(
                "[{}] visited {} tasks, {} kept, {} due",
                pos,
                before,
                slot.len(),
                due.len()
            ));
        }

        if due.is_empty() {
            self.pool.put_list(due);
            return None;
        }

        for task in &due {
            if registry.get(task.id()).is_some_and(|live| Arc::ptr_eq(live, task)) {
                registry.remove(task.id());
            }
        }
        self.log
            .trace(format_args!("[{}] unregister for executing tasks: {:?}", pos, ids_of(&due)));
        self.update_live_gauge();
        Some(due)
    }

    fn update_live_gauge(&self) {
        RING_METRICS
            .live_tasks
            .with_label_values(&[self.log.name()])
            .set(self.registry.len() as i64);
    }

    /// Drive the wheel until cancelled, or until the tick stream or the
    /// dispatch side goes away.
    pub(crate) async fn run(
        mut self,
        mut events: mpsc::Receiver<Entry<I, K, V>>,
        mut ticks: TickStream,
        execute: mpsc::Sender<Action<I, K, V>>,
        token: CancellationToken,
    ) {
        debug!(ring = %self.log.name(), size = self.size, "Wheel loop started");

        loop {
            tokio::select! {
                biased;

                _ = token.cancelled() => {
                    self.log.trace(format_args!("context shutdown"));
                    break;
                }

                entry = events.recv() => match entry {
                    Some(entry) => self.apply(entry),
                    None => {
                        self.log.trace(format_args!("event queue closed"));
                        break;
                    }
                },

                tick = ticks.next() => {
                    let Some(tick) = tick else {
                        self.log.trace(format_args!("ticker closed"));
                        break;
                    };
                    let Some(tasks) = self.advance() else {
                        continue;
                    };
                    if execute.send(Action { tasks, tick }).await.is_err() {
                        self.log.trace(format_args!("execute chan closed"));
                        break;
                    }
                }
            }
        }

        events.close();
        debug!(
            ring = %self.log.name(),
            abandoned = self.registry.len(),
            "Wheel loop stopped"
        );
    }
}
