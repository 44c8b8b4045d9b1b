//! Periodic release of unpaid holds that have run out of time.
//!
//! The sweep itself is [`BookingAction::SweepExpired`], a single reducer call
//! under the store lock. This module only schedules it.

use crate::reducer::BookingAction;
use crate::service::BookingStore;
use std::time::Duration;
use tierhold_runtime::{StoreError, Ticker};

/// Name of the sweeper in logs and ticker metrics
pub const SWEEPER_NAME: &str = "expiry_sweeper";

/// Background task sending [`BookingAction::SweepExpired`] every interval
///
/// Sweeps never overlap: the next one is only scheduled after the previous
/// one has committed, and late ticks are skipped.
#[derive(Debug)]
pub struct ExpirySweeper {
    ticker: Ticker,
}

impl ExpirySweeper {
    /// Start sweeping `store` every `interval`
    ///
    /// Must be called from within a Tokio runtime. `interval` must be non-zero.
    #[must_use]
    pub fn start(store: BookingStore, interval: Duration) -> Self {
        tracing::info!(?interval, "Starting expiry sweeper");
        Self {
            ticker: Ticker::spawn(SWEEPER_NAME, store, interval, || BookingAction::SweepExpired),
        }
    }

    /// Returns true once the sweeper task has exited
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.ticker.is_finished()
    }

    /// Stop sweeping and wait for a running sweep to finish
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TaskJoinError`] if the sweeper task panicked.
    pub async fn stop(self) -> Result<(), StoreError> {
        tracing::info!("Stopping expiry sweeper");
        self.ticker.stop().await
    }
}
