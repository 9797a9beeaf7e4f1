//! Debounced write scheduling.
//!
//! Bursts of local writes collapse into one push: every `schedule` call
//! restarts a quiet-period timer, and only the last one fires.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

#[derive(Debug)]
pub struct WriteScheduler {
    quiet_period: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl WriteScheduler {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            pending: Mutex::new(None),
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Run `push` once no further `schedule` call arrives for a full quiet
    /// period. Replaces any timer that has not fired yet.
    pub fn schedule<F>(&self, push: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!("no tokio runtime; skipping debounced push");
            return;
        };

        let quiet_period = self.quiet_period;
        let timer = runtime.spawn(async move {
            tokio::time::sleep(quiet_period).await;
            // Once fired, the push runs on its own task so a later reset
            // cannot abort it mid-flight.
            tokio::spawn(push);
        });

        if let Some(previous) = self.lock().replace(timer) {
            previous.abort();
        }
    }

    /// Drop the pending timer without firing. Returns whether one was
    /// still waiting.
    pub fn cancel(&self) -> bool {
        match self.lock().take() {
            Some(timer) if !timer.is_finished() => {
                timer.abort();
                true
            }
            _ => false,
        }
    }

    /// A timer is waiting to fire.
    pub fn is_pending(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }

    fn lock(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for WriteScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
