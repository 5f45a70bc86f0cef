use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, warn};

use crate::{controller::SaveReceipt, error::SessionError};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(750);

/// What the scheduler saves into. `persist_latest` must read the state at
/// the moment it sends, not when the save was requested.
#[async_trait]
pub trait AutosaveTarget: Send + Sync {
    async fn is_initializing(&self) -> bool;
    async fn begin_edit(&self) -> Result<(), SessionError>;
    async fn persist_latest(&self) -> Result<SaveReceipt, SessionError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Idle,
    Pending,
    InFlight,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    Saved(SaveReceipt),
    /// Another save was outstanding; it will send one more save when it
    /// resolves.
    Queued,
    Stopped,
}

#[derive(Default)]
struct SchedulerState {
    timer: Option<JoinHandle<()>>,
    /// Set when the timer fires and cleared once the save task takes over.
    save_requested: bool,
    save_in_flight: bool,
    save_queued: bool,
    last_failed: bool,
    stopped: bool,
}

/// Collapses bursts of edits into one save after `debounce` of quiet, with at
/// most one save outstanding at a time.
pub struct AutosaveScheduler {
    target: Arc<dyn AutosaveTarget>,
    debounce: Duration,
    inner: Mutex<SchedulerState>,
}

impl AutosaveScheduler {
    pub fn new(target: Arc<dyn AutosaveTarget>, debounce: Duration) -> Arc<Self> {
        Arc::new(Self {
            target,
            debounce,
            inner: Mutex::new(SchedulerState::default()),
        })
    }

    pub async fn notify_mutation(self: &Arc<Self>) {
        if self.target.is_initializing().await {
            return;
        }

        let mut guard = self.inner.lock().await;
        if guard.stopped {
            return;
        }
        if let Some(timer) = guard.timer.take() {
            timer.abort();
        }
        guard.last_failed = false;

        let scheduler = Arc::clone(self);
        let debounce = self.debounce;
        guard.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            {
                let mut guard = scheduler.inner.lock().await;
                if guard.stopped {
                    return;
                }
                guard.save_requested = true;
            }
            // The save runs in its own task so restarting the timer cannot
            // cancel it halfway.
            tokio::spawn(async move {
                if let Err(err) = scheduler.flush().await {
                    debug!(error = %err, "autosave: debounced save did not complete");
                }
            });
        }));
    }

    /// Saves now. If a save is already outstanding this only marks a
    /// successor, and the outstanding task sends it with the then-current
    /// state once it resolves.
    pub async fn flush(&self) -> Result<FlushOutcome, SessionError> {
        {
            let mut guard = self.inner.lock().await;
            guard.save_requested = false;
            if guard.stopped {
                return Ok(FlushOutcome::Stopped);
            }
            if let Some(timer) = guard.timer.take() {
                timer.abort();
            }
            if guard.save_in_flight {
                guard.save_queued = true;
                debug!("autosave: save in flight, queued one successor");
                return Ok(FlushOutcome::Queued);
            }
            guard.save_in_flight = true;
        }

        loop {
            let result = self.save_once().await;
            if let Err(err) = &result {
                warn!(error = %err, "autosave: save failed, the next edit retries");
            }

            let mut guard = self.inner.lock().await;
            guard.last_failed = result.is_err();
            if guard.save_queued && !guard.stopped {
                guard.save_queued = false;
                continue;
            }
            guard.save_queued = false;
            guard.save_in_flight = false;
            return result.map(FlushOutcome::Saved);
        }
    }

    async fn save_once(&self) -> Result<SaveReceipt, SessionError> {
        self.target.begin_edit().await?;
        self.target.persist_latest().await
    }

    pub async fn status(&self) -> SaveStatus {
        let guard = self.inner.lock().await;
        if guard.save_in_flight {
            SaveStatus::InFlight
        } else if guard.save_requested
            || guard
                .timer
                .as_ref()
                .is_some_and(|timer| !timer.is_finished())
        {
            SaveStatus::Pending
        } else if guard.last_failed {
            SaveStatus::Failed
        } else {
            SaveStatus::Idle
        }
    }

    /// Teardown. Pending timers and queued successors are dropped; a save
    /// already on the wire still completes.
    pub async fn shutdown(&self) {
        let mut guard = self.inner.lock().await;
        guard.stopped = true;
        guard.save_queued = false;
        guard.save_requested = false;
        if let Some(timer) = guard.timer.take() {
            timer.abort();
        }
    }
}

#[cfg(test)]
#[path = "tests/autosave_tests.rs"]
mod tests;
