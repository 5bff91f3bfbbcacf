//! Controller runner — worker pool over the work queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use rebalancer_core::ResourceKey;
use rebalancer_core::config::ControllerConfig;

use crate::error::{ControllerError, ControllerResult};
use crate::queue::WorkQueue;
use crate::reconcile::{Action, Reconciler};

/// Runner settings, resolved from `[controller]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    pub workers: usize,
    pub pass_timeout: Duration,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl ControllerSettings {
    pub fn from_config(config: &ControllerConfig) -> anyhow::Result<Self> {
        Ok(Self {
            workers: config.workers.max(1),
            pass_timeout: config.pass_timeout()?,
            backoff_base: config.backoff_base()?,
            backoff_max: config.backoff_max()?,
        })
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            pass_timeout: Duration::from_secs(30),
            backoff_base: Duration::from_secs(1),
            backoff_max: Duration::from_secs(60),
        }
    }
}

pub struct Controller {
    reconciler: Arc<Reconciler>,
    queue: WorkQueue,
    settings: ControllerSettings,
}

impl Controller {
    pub fn new(reconciler: Reconciler, settings: ControllerSettings) -> Self {
        Self {
            reconciler: Arc::new(reconciler),
            queue: WorkQueue::new(settings.backoff_base, settings.backoff_max),
            settings,
        }
    }

    /// Handle for triggering passes from outside the controller.
    pub fn queue(&self) -> WorkQueue {
        self.queue.clone()
    }

    /// Queue one pass for every stored resource.
    pub fn enqueue_all(&self) -> ControllerResult<usize> {
        let resources = self.reconciler.store().list_rebalances()?;
        let count = resources.len();
        for r in resources {
            self.queue.add(r.key());
        }
        Ok(count)
    }

    /// Run until `shutdown` flips to `true` or its sender is dropped.
    /// In-flight passes finish before this returns.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            workers = self.settings.workers,
            pass_timeout = ?self.settings.pass_timeout,
            "controller started"
        );

        match self.enqueue_all() {
            Ok(count) => info!(count, "queued stored resources"),
            Err(e) => error!(error = %e, "failed to list stored resources"),
        }

        let workers: Vec<_> = (0..self.settings.workers)
            .map(|id| {
                let reconciler = Arc::clone(&self.reconciler);
                let queue = self.queue.clone();
                let timeout = self.settings.pass_timeout;
                tokio::spawn(async move {
                    while let Some(key) = queue.get().await {
                        process(&reconciler, &queue, &key, timeout).await;
                        queue.done(&key);
                    }
                    debug!(worker = id, "worker stopped");
                })
            })
            .collect();

        while !*shutdown.borrow_and_update() {
            if shutdown.changed().await.is_err() {
                break;
            }
        }

        info!("controller shutting down");
        self.queue.shut_down();
        for worker in workers {
            if let Err(e) = worker.await {
                warn!(error = %e, "worker task failed");
            }
        }
    }
}

/// Run one pass for `key` under `timeout` and schedule what comes next.
pub async fn process(
    reconciler: &Reconciler,
    queue: &WorkQueue,
    key: &ResourceKey,
    timeout: Duration,
) {
    let outcome = match tokio::time::timeout(timeout, reconciler.reconcile(key)).await {
        Ok(result) => result,
        Err(_) => Err(ControllerError::Timeout(timeout)),
    };

    match outcome {
        Ok(Action::RequeueAfter(delay)) => {
            queue.forget(key);
            queue.add_after(key.clone(), delay);
        }
        Ok(Action::AwaitChange) => queue.forget(key),
        Err(e) => {
            let delay = queue.backoff(key);
            error!(resource = %key, error = %e, retry_in = ?delay, "reconcile failed");
            queue.add_after(key.clone(), delay);
        }
    }
}
