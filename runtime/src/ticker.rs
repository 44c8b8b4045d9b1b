//! Periodic action dispatch.
//!
//! A [`Ticker`] owns a background task that sends one action into a [`Store`]
//! every `period`. The task awaits each `send` before waiting for the next
//! tick, so two ticks never run at the same time. Ticks that fall due while a
//! previous one is still running are skipped, not queued.

use crate::metrics::TickerMetrics;
use crate::{Store, StoreError};
use std::time::Duration;
use tierhold_core::reducer::Reducer;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

/// Handle to a running periodic task
///
/// Dropping the handle detaches the task; call [`Ticker::stop`] to end it.
#[derive(Debug)]
pub struct Ticker {
    name: &'static str,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Ticker {
    /// Spawn a ticker that sends `make_action()` into `store` every `period`
    ///
    /// The first tick fires one `period` after spawning. The task exits on
    /// [`Ticker::stop`] or once the store starts shutting down.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<S, A, E, R, F>(
        name: &'static str,
        store: Store<S, A, E, R>,
        period: Duration,
        make_action: F,
    ) -> Self
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
        F: Fn() -> A + Send + 'static,
    {
        let (stop, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut interval = time::interval_at(time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::debug!(ticker = name, ?period, "Ticker started");

            loop {
                tokio::select! {
                    biased;

                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            tracing::debug!(ticker = name, "Ticker stopped");
                            break;
                        }
                    }

                    _ = interval.tick() => {
                        let start = std::time::Instant::now();
                        match store.send(make_action()).await {
                            Ok(published) => {
                                TickerMetrics::record_tick(name, start.elapsed());
                                tracing::trace!(
                                    ticker = name,
                                    published = published.len(),
                                    "Tick processed"
                                );
                            }
                            Err(StoreError::ShutdownInProgress) => {
                                tracing::debug!(ticker = name, "Store shutting down, ticker exiting");
                                break;
                            }
                            Err(error) => {
                                tracing::warn!(ticker = name, %error, "Tick failed");
                            }
                        }
                    }
                }
            }
        });

        Self { name, stop, task }
    }

    /// Name used in logs and metrics
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns true once the background task has exited
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the ticker and wait for its task to exit
    ///
    /// A tick that is already running completes before the task exits.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TaskJoinError`] if the task panicked.
    pub async fn stop(self) -> Result<(), StoreError> {
        // The receiver is gone if the task already exited
        let _ = self.stop.send(true);
        self.task.await?;
        Ok(())
    }
}
