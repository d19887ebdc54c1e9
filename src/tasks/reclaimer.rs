//! Expired Entry Reclaimer
//!
//! Background task that periodically removes expired cache entries.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::cache::Sweep;
use crate::error::{CacheError, Result};

// == Reclaimer Stats ==
/// Point-in-time copy of the reclaimer's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReclaimerStats {
    /// Sweeps that ran to completion
    pub sweeps: u64,
    /// Entries removed across all sweeps
    pub removed: u64,
    /// Sweeps that panicked
    pub failed_sweeps: u64,
    /// Wall-clock time of the last sweep attempt
    pub last_sweep_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct SweepCounters {
    sweeps: AtomicU64,
    removed: AtomicU64,
    failed_sweeps: AtomicU64,
    last_sweep_at: Mutex<Option<DateTime<Utc>>>,
}

impl SweepCounters {
    fn snapshot(&self) -> ReclaimerStats {
        ReclaimerStats {
            sweeps: self.sweeps.load(Ordering::Relaxed),
            removed: self.removed.load(Ordering::Relaxed),
            failed_sweeps: self.failed_sweeps.load(Ordering::Relaxed),
            last_sweep_at: *self.last_sweep_at.lock(),
        }
    }
}

// == Reclaimer ==
/// Handle to a running sweep task.
///
/// The task holds only a weak reference to its store: it never keeps the
/// store alive and exits on its own once the store is gone. Dropping the
/// handle stops the task.
#[derive(Debug)]
pub struct Reclaimer {
    interval: Duration,
    stop_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
    counters: Arc<SweepCounters>,
}

impl Reclaimer {
    /// Spawns a task calling `store.sweep_expired()` every `interval`.
    ///
    /// The first sweep happens one interval after start. Must be called from
    /// within a tokio runtime.
    ///
    /// # Errors
    /// - [`CacheError::InvalidInterval`] if `interval` is zero
    /// - [`CacheError::NoRuntime`] if no tokio runtime is running
    pub fn start<S>(store: &Arc<S>, interval: Duration) -> Result<Self>
    where
        S: Sweep + ?Sized + 'static,
    {
        if interval.is_zero() {
            return Err(CacheError::InvalidInterval);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| CacheError::NoRuntime)?;

        let (stop_tx, stop_rx) = oneshot::channel();
        let counters = Arc::new(SweepCounters::default());
        let task = run(Arc::downgrade(store), interval, stop_rx, Arc::clone(&counters));

        Ok(Self {
            interval,
            stop_tx: Some(stop_tx),
            handle: Some(runtime.spawn(task)),
            counters,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns a copy of the sweep counters.
    pub fn stats(&self) -> ReclaimerStats {
        self.counters.snapshot()
    }

    /// True until the task has exited.
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    // == Stop ==
    /// Signals the task to exit without waiting for it.
    ///
    /// A sweep already in progress runs to completion first.
    pub fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            // The task may already be gone; nothing to signal then
            let _ = stop_tx.send(());
        }
    }

    // == Shutdown ==
    /// Stops the task and waits until it has exited.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                warn!("Reclaimer task ended abnormally: {}", err);
            }
        }
    }
}

impl Drop for Reclaimer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run<S>(
    store: Weak<S>,
    interval: Duration,
    mut stop_rx: oneshot::Receiver<()>,
    counters: Arc<SweepCounters>,
) where
    S: Sweep + ?Sized,
{
    info!("Starting reclaimer with interval of {:?}", interval);

    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            // A dropped sender counts as a stop signal too
            _ = &mut stop_rx => {
                debug!("Reclaimer received stop signal");
                break;
            }
            _ = ticker.tick() => {}
        }

        let Some(store) = store.upgrade() else {
            debug!("Store dropped; reclaimer exiting");
            break;
        };

        *counters.last_sweep_at.lock() = Some(Utc::now());
        match catch_unwind(AssertUnwindSafe(|| store.sweep_expired())) {
            Ok(removed) => {
                counters.sweeps.fetch_add(1, Ordering::Relaxed);
                counters.removed.fetch_add(removed as u64, Ordering::Relaxed);
                if removed > 0 {
                    info!("Reclaimer: removed {} expired entries", removed);
                } else {
                    debug!("Reclaimer: no expired entries found");
                }
            }
            Err(_) => {
                counters.failed_sweeps.fetch_add(1, Ordering::Relaxed);
                error!("Reclaimer sweep panicked; continuing with the next tick");
            }
        }
    }

    info!("Reclaimer stopped");
}
