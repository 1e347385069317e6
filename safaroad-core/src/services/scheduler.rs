//! Scheduler service
//!
//! Deferred and periodic tasks behind one interface. Production code runs
//! on tokio timers; tests use [`ManualScheduler`] and advance virtual time.
//! Every scheduled task gets a [`TaskHandle`] that cancels it.

use crate::context::{Clock, ManualClock};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A unit of deferred work
pub type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Produces a fresh task for every tick of a periodic schedule
pub type TaskFactory = Arc<dyn Fn() -> TaskFuture + Send + Sync>;

/// Handle to a scheduled task
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: u64,
    token: CancellationToken,
}

impl TaskHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Cancel the task. Cancelling a finished or cancelled task is a no-op.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

pub trait Scheduler: Send + Sync {
    /// Run `task` once after `delay`
    fn schedule_after(&self, delay: Duration, task: TaskFuture) -> TaskHandle;

    /// Run a task from `factory` every `interval`, first tick after one interval
    fn schedule_every(&self, interval: Duration, factory: TaskFactory) -> TaskHandle;

    /// Cancel every pending task
    fn shutdown(&self);
}

/// Scheduler on tokio timers. Must be used from within a tokio runtime.
pub struct TokioScheduler {
    root: CancellationToken,
    next_id: AtomicU64,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self {
            root: CancellationToken::new(),
            next_id: AtomicU64::new(1),
        }
    }

    fn handle(&self) -> TaskHandle {
        TaskHandle {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            token: self.root.child_token(),
        }
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_after(&self, delay: Duration, task: TaskFuture) -> TaskHandle {
        let handle = self.handle();
        let token = handle.token.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => task.await,
            }
        });

        handle
    }

    fn schedule_every(&self, interval: Duration, factory: TaskFactory) -> TaskHandle {
        let handle = self.handle();
        let token = handle.token.clone();

        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => factory().await,
                }
            }
        });

        handle
    }

    fn shutdown(&self) {
        tracing::info!("Scheduler shutdown, cancelling pending tasks");
        self.root.cancel();
    }
}

enum PendingTask {
    Once(TaskFuture),
    Every(i64, TaskFactory),
}

struct Pending {
    due: i64,
    seq: u64,
    token: CancellationToken,
    task: PendingTask,
}

#[derive(Default)]
struct ManualState {
    seq: u64,
    pending: Vec<Pending>,
}

/// Virtual-time scheduler. Nothing runs until [`ManualScheduler::advance`].
pub struct ManualScheduler {
    clock: Arc<ManualClock>,
    root: CancellationToken,
    state: Mutex<ManualState>,
}

impl ManualScheduler {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            root: CancellationToken::new(),
            state: Mutex::new(ManualState::default()),
        }
    }

    pub fn clock(&self) -> Arc<ManualClock> {
        Arc::clone(&self.clock)
    }

    /// Number of tasks still waiting to run
    pub fn pending_count(&self) -> usize {
        self.state
            .lock()
            .map(|s| s.pending.iter().filter(|p| !p.token.is_cancelled()).count())
            .unwrap_or(0)
    }

    fn enqueue(&self, due: i64, task: PendingTask) -> TaskHandle {
        let token = self.root.child_token();
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.seq += 1;
        let seq = state.seq;
        state.pending.push(Pending {
            due,
            seq,
            token: token.clone(),
            task,
        });
        TaskHandle { id: seq, token }
    }

    /// Take the earliest live task due at or before `target`
    fn take_due(&self, target: i64) -> Option<Pending> {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.pending.retain(|p| !p.token.is_cancelled());

        let index = state
            .pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.due <= target)
            .min_by_key(|(_, p)| (p.due, p.seq))
            .map(|(i, _)| i)?;

        Some(state.pending.swap_remove(index))
    }

    /// Move virtual time forward by `by`, running every task that falls due
    /// in order of due time, including tasks scheduled while advancing.
    pub async fn advance(&self, by: Duration) {
        let target = self.clock.now_ms() + by.as_millis() as i64;

        while let Some(pending) = self.take_due(target) {
            self.clock.set(pending.due);

            match pending.task {
                PendingTask::Once(task) => task.await,
                PendingTask::Every(interval_ms, factory) => {
                    factory().await;
                    if !pending.token.is_cancelled() {
                        let mut state = match self.state.lock() {
                            Ok(state) => state,
                            Err(poisoned) => poisoned.into_inner(),
                        };
                        state.pending.push(Pending {
                            due: pending.due + interval_ms,
                            seq: pending.seq,
                            token: pending.token,
                            task: PendingTask::Every(interval_ms, factory),
                        });
                    }
                }
            }
        }

        self.clock.set(target);
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_after(&self, delay: Duration, task: TaskFuture) -> TaskHandle {
        let due = self.clock.now_ms() + delay.as_millis() as i64;
        self.enqueue(due, PendingTask::Once(task))
    }

    fn schedule_every(&self, interval: Duration, factory: TaskFactory) -> TaskHandle {
        let interval_ms = (interval.as_millis() as i64).max(1);
        let due = self.clock.now_ms() + interval_ms;
        self.enqueue(due, PendingTask::Every(interval_ms, factory))
    }

    fn shutdown(&self) {
        self.root.cancel();
    }
}
