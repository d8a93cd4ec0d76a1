//! Background sweep of expired in-memory rate limit entries.
//!
//! ## Graceful Shutdown
//!
//! The task listens on a watch channel and exits after the current sweep.
//! Dropping the [`CleanupHandle`] without calling [`CleanupHandle::stop`]
//! also ends the loop, since the sender side closes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;

use super::InMemoryRateLimiter;

/// Periodically removes entries whose block period has elapsed.
pub struct CleanupTask {
    limiter: Arc<InMemoryRateLimiter>,
    interval: Duration,
}

impl CleanupTask {
    pub fn new(limiter: Arc<InMemoryRateLimiter>, interval: Duration) -> Self {
        Self { limiter, interval }
    }

    /// Run the sweep loop until shutdown is signalled.
    ///
    /// The first sweep happens one full interval after start.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval_at(time::Instant::now() + self.interval, self.interval);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::debug!("rate limit cleanup stopped");
                        return;
                    }
                }

                _ = interval.tick() => {
                    self.sweep_once().await;
                }
            }
        }
    }

    /// Run exactly one sweep.
    pub async fn sweep_once(&self) -> usize {
        self.limiter.cleanup().await
    }

    /// Start the loop on the Tokio runtime.
    pub fn spawn(self) -> CleanupHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let interval = self.interval;
        let join = tokio::spawn(async move { self.run(shutdown_rx).await });

        tracing::info!(interval_secs = interval.as_secs(), "rate limit cleanup started");
        CleanupHandle { shutdown_tx, join }
    }
}

/// Handle to a spawned [`CleanupTask`].
#[derive(Debug)]
pub struct CleanupHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl CleanupHandle {
    /// Signal the task and wait for it to finish.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.join.await {
            tracing::warn!(error = %e, "rate limit cleanup task did not exit cleanly");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}
