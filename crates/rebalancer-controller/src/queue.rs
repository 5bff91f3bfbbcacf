//! Work queue with per-key serialization.
//!
//! A key is in at most one of three places: waiting in the queue, being
//! processed by a worker, or idle. Adding a waiting key is a no-op; adding
//! a key under processing marks it dirty so it is queued again once the
//! worker calls `done`.
//!
//! Delayed adds are tracked per key as well. A key has at most one pending
//! deadline: the earliest one wins, and starting a pass clears it, since
//! that pass schedules its own follow-up.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::debug;

use rebalancer_core::ResourceKey;

#[derive(Default)]
struct QueueState {
    queue: VecDeque<ResourceKey>,
    queued: HashSet<ResourceKey>,
    processing: HashSet<ResourceKey>,
    dirty: HashSet<ResourceKey>,
    failures: HashMap<ResourceKey, u32>,
    waiting: HashMap<ResourceKey, Pending>,
    shutdown: bool,
}

/// A delayed add that has not fired yet.
struct Pending {
    deadline: Instant,
    timer: AbortHandle,
}

impl QueueState {
    fn cancel_pending(&mut self, key: &ResourceKey) {
        if let Some(pending) = self.waiting.remove(key) {
            pending.timer.abort();
        }
    }
}

struct Inner {
    state: Mutex<QueueState>,
    notify: Notify,
    backoff_base: Duration,
    backoff_max: Duration,
}

/// Cloneable handle to a shared queue.
#[derive(Clone)]
pub struct WorkQueue {
    inner: Arc<Inner>,
}

impl WorkQueue {
    pub fn new(backoff_base: Duration, backoff_max: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState::default()),
                notify: Notify::new(),
                backoff_base,
                backoff_max,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Trigger a pass for `key`.
    pub fn add(&self, key: ResourceKey) {
        let mut state = self.state();
        if state.shutdown {
            return;
        }
        if state.processing.contains(&key) {
            state.dirty.insert(key);
            return;
        }
        if state.queued.insert(key.clone()) {
            state.queue.push_back(key);
            drop(state);
            self.inner.notify.notify_one();
        }
    }

    /// Trigger a pass for `key` once `delay` has elapsed.
    ///
    /// If an earlier deadline is already pending for `key` this is a no-op;
    /// a later pending deadline is replaced.
    pub fn add_after(&self, key: ResourceKey, delay: Duration) {
        if delay.is_zero() {
            self.add(key);
            return;
        }

        let deadline = Instant::now() + delay;
        let mut state = self.state();
        if state.shutdown {
            return;
        }
        if state.waiting.get(&key).is_some_and(|p| p.deadline <= deadline) {
            return;
        }
        state.cancel_pending(&key);

        let queue = self.clone();
        let timer_key = key.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            queue.fire(timer_key, deadline);
        })
        .abort_handle();
        state.waiting.insert(key, Pending { deadline, timer });
    }

    /// Timer callback. Stale timers, whose deadline was replaced or
    /// cleared, do nothing.
    fn fire(&self, key: ResourceKey, deadline: Instant) {
        {
            let mut state = self.state();
            match state.waiting.get(&key) {
                Some(pending) if pending.deadline == deadline => {
                    state.waiting.remove(&key);
                }
                _ => return,
            }
        }
        self.add(key);
    }

    /// Wait for the next key. `None` once the queue is shut down.
    pub async fn get(&self) -> Option<ResourceKey> {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state();
                if state.shutdown {
                    return None;
                }
                if let Some(key) = state.queue.pop_front() {
                    state.queued.remove(&key);
                    state.cancel_pending(&key);
                    state.processing.insert(key.clone());
                    let more = !state.queue.is_empty();
                    drop(state);
                    if more {
                        self.inner.notify.notify_one();
                    }
                    return Some(key);
                }
            }

            notified.await;
        }
    }

    /// Mark the pass for `key` finished, re-queueing it if it was
    /// triggered meanwhile.
    pub fn done(&self, key: &ResourceKey) {
        let mut state = self.state();
        state.processing.remove(key);
        if state.dirty.remove(key) && !state.shutdown && state.queued.insert(key.clone()) {
            state.queue.push_back(key.clone());
            drop(state);
            self.inner.notify.notify_one();
        }
    }

    /// Record a failure for `key` and return how long to wait before the
    /// retry: `backoff_base` doubled per consecutive failure, capped at
    /// `backoff_max`.
    pub fn backoff(&self, key: &ResourceKey) -> Duration {
        let mut state = self.state();
        let failures = state.failures.entry(key.clone()).or_insert(0);
        *failures = failures.saturating_add(1);

        let exponent = (*failures - 1).min(31);
        let delay = self
            .inner
            .backoff_base
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.inner.backoff_max)
            .min(self.inner.backoff_max);
        debug!(resource = %key, failures = *failures, ?delay, "backing off");
        delay
    }

    /// Reset the failure count of `key` after a successful pass.
    pub fn forget(&self, key: &ResourceKey) {
        self.state().failures.remove(key);
    }

    /// Stop handing out keys. Workers blocked in `get` return `None`.
    pub fn shut_down(&self) {
        let mut state = self.state();
        state.shutdown = true;
        for (_, pending) in state.waiting.drain() {
            pending.timer.abort();
        }
        drop(state);
        self.inner.notify.notify_waiters();
    }

    /// Number of keys with a delayed add pending.
    pub fn pending(&self) -> usize {
        self.state().waiting.len()
    }

    /// Number of keys waiting.
    pub fn len(&self) -> usize {
        self.state().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
