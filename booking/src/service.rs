//! Booking service: the public entry point.
//!
//! Each operation sends one command to the store and turns the events the
//! reducer published into a `Result`. Queries take the store's read lock, so
//! they always observe a state between two commits.

use crate::config::{BookingConfig, ConfigError};
use crate::error::BookingError;
use crate::metrics::spawn_event_recorder;
use crate::reducer::{BookingAction, BookingEnvironment, BookingReducer};
use crate::state::BookingState;
use crate::sweeper::ExpirySweeper;
use crate::types::{Confirmation, Reservation, TierBalance, TierDefinition, TierKey, UserKey};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tierhold_core::SmallVec;
use tierhold_core::environment::Clock;
use tierhold_runtime::{Store, StoreError};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Store type running the booking reducer
pub type BookingStore = Store<BookingState, BookingAction, BookingEnvironment, BookingReducer>;

#[derive(Debug, Default)]
struct Background {
    sweeper: Option<ExpirySweeper>,
    recorder: Option<JoinHandle<()>>,
}

/// Reservation, payment, cancellation and expiry for a fixed tier catalogue
///
/// Share it behind an `Arc`; every method takes `&self`.
///
/// # Example
///
/// ```ignore
/// let service = BookingService::new(&BookingConfig::from_env()?, Arc::new(SystemClock))?;
/// service.start_sweeper();
///
/// let hold = service.reserve("alice", "VIP", 2).await?;
/// let confirmation = service.pay("alice").await?;
/// ```
pub struct BookingService {
    store: BookingStore,
    sweep_interval: Duration,
    shutdown_timeout: Duration,
    background: Mutex<Background>,
}

impl BookingService {
    /// Build a service from configuration
    ///
    /// Nothing runs in the background until [`BookingService::start_sweeper`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid or the tier
    /// catalogue is rejected.
    pub fn new(config: &BookingConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate()?;
        let state = BookingState::new(config.tiers.iter().cloned())?;
        let environment = BookingEnvironment::new(clock, config.hold_time_limit());

        tracing::info!(
            tiers = config.tiers.len(),
            hold_time_limit_secs = config.hold.time_limit_secs,
            "Booking service created"
        );

        Ok(Self {
            store: Store::with_broadcast_capacity(
                state,
                BookingReducer::new(),
                environment,
                config.runtime.event_broadcast_capacity.max(1),
            ),
            sweep_interval: config.sweep_interval(),
            shutdown_timeout: config.shutdown_timeout(),
            background: Mutex::new(Background::default()),
        })
    }

    // ========== Commands ==========

    /// Hold `quantity` units of `tier` for `user`
    ///
    /// # Errors
    ///
    /// The first failing check wins: [`BookingError::InvalidInput`],
    /// [`BookingError::InvalidQuantity`], [`BookingError::ActiveReservationExists`],
    /// [`BookingError::UnknownTier`], [`BookingError::InsufficientInventory`].
    /// [`BookingError::Unavailable`] once the service is shutting down.
    #[tracing::instrument(skip_all, name = "booking_reserve")]
    pub async fn reserve(
        &self,
        user: impl Into<UserKey>,
        tier: impl Into<TierKey>,
        quantity: u32,
    ) -> Result<Reservation, BookingError> {
        let published = self
            .store
            .send(BookingAction::Reserve {
                user: user.into(),
                tier: tier.into(),
                quantity,
            })
            .await?;

        outcome(published, |action| match action {
            BookingAction::HoldPlaced { reservation, .. } => Some(reservation),
            _ => None,
        })
    }

    /// Pay for `user`'s current hold
    ///
    /// # Errors
    ///
    /// [`BookingError::InvalidInput`], [`BookingError::ReservationNotFound`],
    /// [`BookingError::AlreadyPaid`] or [`BookingError::ReservationExpired`].
    /// A failed payment never changes state, so it is safe to retry.
    #[tracing::instrument(skip_all, name = "booking_pay")]
    pub async fn pay(&self, user: impl Into<UserKey>) -> Result<Confirmation, BookingError> {
        let published = self
            .store
            .send(BookingAction::Pay { user: user.into() })
            .await?;

        outcome(published, |action| match action {
            BookingAction::PaymentConfirmed { confirmation } => Some(confirmation),
            _ => None,
        })
    }

    /// Release `user`'s unpaid hold now, returning the released reservation
    ///
    /// # Errors
    ///
    /// [`BookingError::InvalidInput`], [`BookingError::ReservationNotFound`] or
    /// [`BookingError::AlreadyPaid`].
    #[tracing::instrument(skip_all, name = "booking_cancel")]
    pub async fn cancel(&self, user: impl Into<UserKey>) -> Result<Reservation, BookingError> {
        let published = self
            .store
            .send(BookingAction::Cancel { user: user.into() })
            .await?;

        outcome(published, |action| match action {
            BookingAction::HoldCancelled { reservation, .. } => Some(reservation),
            _ => None,
        })
    }

    /// Run one expiry sweep immediately, returning the users whose holds were released
    ///
    /// # Errors
    ///
    /// [`BookingError::Unavailable`] once the service is shutting down.
    pub async fn sweep_now(&self) -> Result<Vec<UserKey>, BookingError> {
        let published = self.store.send(BookingAction::SweepExpired).await?;

        Ok(published
            .into_iter()
            .filter_map(|action| match action {
                BookingAction::HoldExpired { reservation, .. } => Some(reservation.user),
                _ => None,
            })
            .collect())
    }

    // ========== Queries ==========

    /// Time left for `user` to pay, clamped at zero
    ///
    /// `None` if the user has no reservation or has already paid.
    pub async fn time_remaining(&self, user: impl Into<UserKey>) -> Option<chrono::Duration> {
        let user = user.into();
        let environment = self.store.environment();
        let now = environment.clock.now();

        self.store
            .state(|state| state.time_remaining(&user, now, environment.hold_time_limit))
            .await
    }

    /// `user`'s current reservation, paid or not
    pub async fn reservation(&self, user: impl Into<UserKey>) -> Option<Reservation> {
        let user = user.into();
        self.store
            .state(|state| state.reservation(&user).cloned())
            .await
    }

    /// True if `user`'s current reservation is paid
    pub async fn is_paid(&self, user: impl Into<UserKey>) -> bool {
        let user = user.into();
        self.store.state(|state| state.payments.contains(&user)).await
    }

    /// `user`'s settled purchases, oldest first
    pub async fn purchases(&self, user: impl Into<UserKey>) -> Vec<Reservation> {
        let user = user.into();
        self.store
            .state(|state| state.purchases.for_user(&user).to_vec())
            .await
    }

    /// Units remaining per tier, ordered by tier key
    pub async fn inventory_snapshot(&self) -> BTreeMap<TierKey, u32> {
        self.store.state(|state| state.ledger.snapshot()).await
    }

    /// Remaining, held and sold units per tier, ordered by tier key
    pub async fn conservation_report(&self) -> Vec<TierBalance> {
        self.store.state(BookingState::conservation_report).await
    }

    /// The tier catalogue, ordered by tier key
    pub async fn tiers(&self) -> Vec<TierDefinition> {
        self.store
            .state(|state| state.tiers().cloned().collect())
            .await
    }

    /// Subscribe to every published event, in commit order
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BookingAction> {
        self.store.subscribe_actions()
    }

    // ========== Lifecycle ==========

    /// Start the expiry sweeper; returns false if it is already running
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start_sweeper(&self) -> bool {
        let mut background = self
            .background
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if background
            .sweeper
            .as_ref()
            .is_some_and(|sweeper| !sweeper.is_finished())
        {
            return false;
        }

        background.sweeper = Some(ExpirySweeper::start(
            self.store.clone(),
            self.sweep_interval,
        ));
        true
    }

    /// Start recording business metrics from the event stream; returns false
    /// if the recorder is already running
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start_metrics_recorder(&self) -> bool {
        let mut background = self
            .background
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if background
            .recorder
            .as_ref()
            .is_some_and(|recorder| !recorder.is_finished())
        {
            return false;
        }

        background.recorder = Some(spawn_event_recorder(self.subscribe()));
        true
    }

    /// Stop background tasks and reject further commands
    ///
    /// A sweep or command that is already running completes first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if the in-flight command does not
    /// finish within the configured timeout, or [`StoreError::TaskJoinError`]
    /// if the sweeper task panicked.
    pub async fn shutdown(&self) -> Result<(), StoreError> {
        let Background { sweeper, recorder } = std::mem::take(
            &mut *self
                .background
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );

        if let Some(sweeper) = sweeper {
            sweeper.stop().await?;
        }

        self.store.shutdown(self.shutdown_timeout).await?;

        if let Some(recorder) = recorder {
            recorder.abort();
        }

        tracing::info!("Booking service shut down");
        Ok(())
    }
}

/// Pick the success value out of what a command published
///
/// A `Rejected` event becomes the error. Anything else that `pick` does not
/// recognise (e.g. `PurchaseSettled` ahead of `HoldPlaced`) is skipped.
fn outcome<T>(
    published: SmallVec<[BookingAction; 4]>,
    mut pick: impl FnMut(BookingAction) -> Option<T>,
) -> Result<T, BookingError> {
    let mut rejection = None;

    for action in published {
        if let BookingAction::Rejected { error, .. } = action {
            rejection = Some(error);
        } else if let Some(value) = pick(action) {
            return Ok(value);
        }
    }

    Err(rejection
        .unwrap_or_else(|| BookingError::Unavailable("command published no outcome".to_string())))
}
