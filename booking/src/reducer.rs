//! Booking reducer: reserve, pay, cancel and sweep as single state transitions.
//!
//! Every command either commits completely and publishes its outcome event(s),
//! or leaves the state untouched and publishes [`BookingAction::Rejected`].
//! The store runs each call under its write lock, which makes the reducer the
//! only place where the ledger, reservation store and payment set change.

use crate::error::BookingError;
use crate::state::BookingState;
use crate::types::{
    Confirmation, MAX_QUANTITY, MIN_QUANTITY, Money, OrderReference, Reservation, TierKey,
    UserKey,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tierhold_core::environment::Clock;
use tierhold_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};

// ============================================================================
// Actions (Commands + Events)
// ============================================================================

/// Actions for the booking reducer
///
/// Commands are requests sent by the service or the sweeper. Events are the
/// outcomes the reducer publishes; sending one back in is a no-op.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingAction {
    // Commands
    /// Place a hold on `quantity` units of `tier`
    Reserve {
        /// Who is reserving
        user: UserKey,
        /// Which tier
        tier: TierKey,
        /// How many units (1..=5)
        quantity: u32,
    },

    /// Pay for the user's current hold
    Pay {
        /// Who is paying
        user: UserKey,
    },

    /// Release the user's unpaid hold before it expires
    Cancel {
        /// Whose hold to release
        user: UserKey,
    },

    /// Release every unpaid hold that has outlived the time limit
    SweepExpired,

    // Events
    /// A previously paid reservation was moved to purchase history so the user
    /// could start a new cycle
    PurchaseSettled {
        /// The settled reservation
        purchase: Reservation,
    },

    /// A hold was placed
    HoldPlaced {
        /// The new reservation
        reservation: Reservation,
        /// Units left in the tier afterwards
        remaining: u32,
    },

    /// A hold was paid
    PaymentConfirmed {
        /// Payment record
        confirmation: Confirmation,
    },

    /// An unpaid hold ran out of time and its units were returned
    HoldExpired {
        /// The expired reservation
        reservation: Reservation,
        /// Units left in the tier afterwards
        remaining: u32,
        /// When the sweep ran
        expired_at: DateTime<Utc>,
    },

    /// An unpaid hold was cancelled by its user and its units were returned
    HoldCancelled {
        /// The cancelled reservation
        reservation: Reservation,
        /// Units left in the tier afterwards
        remaining: u32,
        /// When the cancellation was processed
        cancelled_at: DateTime<Utc>,
    },

    /// A command was refused; nothing changed
    Rejected {
        /// Who sent the command
        user: UserKey,
        /// Why it was refused
        error: BookingError,
    },
}

impl BookingAction {
    /// True for requests the reducer acts on
    #[must_use]
    pub const fn is_command(&self) -> bool {
        matches!(
            self,
            Self::Reserve { .. } | Self::Pay { .. } | Self::Cancel { .. } | Self::SweepExpired
        )
    }

    /// True for published outcomes
    #[must_use]
    pub const fn is_event(&self) -> bool {
        !self.is_command()
    }

    /// The user the action concerns, if it concerns exactly one
    #[must_use]
    pub const fn user(&self) -> Option<&UserKey> {
        match self {
            Self::Reserve { user, .. }
            | Self::Pay { user }
            | Self::Cancel { user }
            | Self::Rejected { user, .. } => Some(user),
            Self::PurchaseSettled { purchase: reservation }
            | Self::HoldPlaced { reservation, .. }
            | Self::HoldExpired { reservation, .. }
            | Self::HoldCancelled { reservation, .. } => Some(&reservation.user),
            Self::PaymentConfirmed { confirmation } => Some(&confirmation.user),
            Self::SweepExpired => None,
        }
    }

    /// Short name used in logs and metric labels
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Reserve { .. } => "reserve",
            Self::Pay { .. } => "pay",
            Self::Cancel { .. } => "cancel",
            Self::SweepExpired => "sweep_expired",
            Self::PurchaseSettled { .. } => "purchase_settled",
            Self::HoldPlaced { .. } => "hold_placed",
            Self::PaymentConfirmed { .. } => "payment_confirmed",
            Self::HoldExpired { .. } => "hold_expired",
            Self::HoldCancelled { .. } => "hold_cancelled",
            Self::Rejected { .. } => "rejected",
        }
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Environment dependencies for the booking reducer
#[derive(Clone)]
pub struct BookingEnvironment {
    /// Clock for hold timestamps and expiry decisions
    pub clock: Arc<dyn Clock>,
    /// How long an unpaid hold stays payable
    pub hold_time_limit: Duration,
}

impl BookingEnvironment {
    /// Creates a new `BookingEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, hold_time_limit: Duration) -> Self {
        Self {
            clock,
            hold_time_limit,
        }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for tiered reservations
#[derive(Clone, Debug)]
pub struct BookingReducer;

impl BookingReducer {
    /// Creates a new `BookingReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn reject(user: UserKey, error: BookingError) -> SmallVec<[Effect<BookingAction>; 4]> {
        tracing::debug!(%user, %error, "Command rejected");
        smallvec![Effect::Publish(BookingAction::Rejected { user, error })]
    }

    /// Validates `Reserve`, returning the total price
    ///
    /// Checks run in a fixed order and the first failure wins: user key,
    /// quantity range, existing unpaid hold, tier, then inventory.
    fn validate_reserve(
        state: &BookingState,
        user: &UserKey,
        tier: &TierKey,
        quantity: u32,
    ) -> Result<Money, BookingError> {
        if user.is_empty() {
            return Err(BookingError::InvalidInput);
        }

        if !(MIN_QUANTITY..=MAX_QUANTITY).contains(&quantity) {
            return Err(BookingError::InvalidQuantity {
                requested: quantity,
            });
        }

        if state.has_unpaid_hold(user) {
            return Err(BookingError::ActiveReservationExists);
        }

        let Some(definition) = state.tier(tier) else {
            return Err(BookingError::UnknownTier(tier.clone()));
        };
        state.ledger.ensure_available(tier, quantity)?;

        definition
            .unit_price
            .checked_times(quantity)
            .ok_or(BookingError::InvalidQuantity {
                requested: quantity,
            })
    }

    /// Validates `Pay`, returning the hold being paid for
    fn validate_pay<'a>(
        state: &'a BookingState,
        user: &UserKey,
        now: DateTime<Utc>,
        time_limit: Duration,
    ) -> Result<&'a Reservation, BookingError> {
        if user.is_empty() {
            return Err(BookingError::InvalidInput);
        }

        let Some(hold) = state.reservation(user) else {
            // The sweeper got there first
            if state.expired.contains(user) {
                return Err(BookingError::ReservationExpired);
            }
            return Err(BookingError::ReservationNotFound);
        };

        if state.payments.contains(user) {
            return Err(BookingError::AlreadyPaid);
        }

        if hold.time_remaining(now, time_limit) <= Duration::zero() {
            return Err(BookingError::ReservationExpired);
        }

        Ok(hold)
    }

    /// Validates `Cancel`
    fn validate_cancel(state: &BookingState, user: &UserKey) -> Result<(), BookingError> {
        if user.is_empty() {
            return Err(BookingError::InvalidInput);
        }

        if state.reservation(user).is_none() {
            return Err(BookingError::ReservationNotFound);
        }

        if state.payments.contains(user) {
            return Err(BookingError::AlreadyPaid);
        }

        Ok(())
    }

    fn reserve(
        state: &mut BookingState,
        user: UserKey,
        tier: TierKey,
        quantity: u32,
        env: &BookingEnvironment,
    ) -> SmallVec<[Effect<BookingAction>; 4]> {
        let total_price = match Self::validate_reserve(state, &user, &tier, quantity) {
            Ok(total_price) => total_price,
            Err(error) => return Self::reject(user, error),
        };

        let remaining = match state.ledger.decrement(&tier, quantity) {
            Ok(remaining) => remaining,
            Err(error) => return Self::reject(user, error),
        };

        let mut effects = SmallVec::new();

        // A paid reservation still occupies the user's slot until now
        if let Some(purchase) = state.reservations.remove(&user) {
            state.payments.clear(&user);
            state.purchases.record(purchase.clone());
            tracing::debug!(%user, tier = %purchase.tier, "Settled paid reservation");
            effects.push(Effect::Publish(BookingAction::PurchaseSettled { purchase }));
        }

        let reservation = Reservation {
            user: user.clone(),
            tier,
            quantity,
            total_price,
            created_at: env.clock.now(),
        };

        if let Err(error) = state.reservations.put(reservation.clone()) {
            state.ledger.restore(&reservation.tier, quantity);
            return Self::reject(user, error);
        }
        state.expired.remove(&user);

        tracing::info!(
            %user,
            tier = %reservation.tier,
            quantity,
            remaining,
            "Hold placed"
        );
        effects.push(Effect::Publish(BookingAction::HoldPlaced {
            reservation,
            remaining,
        }));
        effects
    }

    fn pay(
        state: &mut BookingState,
        user: UserKey,
        env: &BookingEnvironment,
    ) -> SmallVec<[Effect<BookingAction>; 4]> {
        let confirmed_at = env.clock.now();
        let hold = match Self::validate_pay(state, &user, confirmed_at, env.hold_time_limit) {
            Ok(hold) => hold,
            Err(error) => return Self::reject(user, error),
        };

        let confirmation = Confirmation {
            order_reference: OrderReference::derive(&user, confirmed_at),
            user: user.clone(),
            confirmed_at,
            tier: hold.tier.clone(),
            quantity: hold.quantity,
            total_price: hold.total_price,
        };
        state.payments.mark_paid(user);

        tracing::info!(
            user = %confirmation.user,
            order_reference = %confirmation.order_reference,
            "Payment confirmed"
        );
        smallvec![Effect::Publish(BookingAction::PaymentConfirmed { confirmation })]
    }

    fn cancel(
        state: &mut BookingState,
        user: UserKey,
        env: &BookingEnvironment,
    ) -> SmallVec<[Effect<BookingAction>; 4]> {
        if let Err(error) = Self::validate_cancel(state, &user) {
            return Self::reject(user, error);
        }

        let Some(reservation) = state.reservations.remove(&user) else {
            return Self::reject(user, BookingError::ReservationNotFound);
        };
        let remaining = state
            .ledger
            .restore(&reservation.tier, reservation.quantity)
            .unwrap_or_default();

        tracing::info!(%user, tier = %reservation.tier, remaining, "Hold cancelled");
        smallvec![Effect::Publish(BookingAction::HoldCancelled {
            reservation,
            remaining,
            cancelled_at: env.clock.now(),
        })]
    }

    fn sweep_expired(
        state: &mut BookingState,
        env: &BookingEnvironment,
    ) -> SmallVec<[Effect<BookingAction>; 4]> {
        let now = env.clock.now();
        let mut effects = SmallVec::new();

        for user in state.expired_holds(now, env.hold_time_limit) {
            let Some(reservation) = state.reservations.remove(&user) else {
                continue;
            };
            let remaining = state
                .ledger
                .restore(&reservation.tier, reservation.quantity)
                .unwrap_or_default();
            state.expired.insert(user);

            effects.push(Effect::Publish(BookingAction::HoldExpired {
                reservation,
                remaining,
                expired_at: now,
            }));
        }

        if !effects.is_empty() {
            tracing::info!(expired = effects.len(), "Released expired holds");
        }
        effects
    }
}

impl Default for BookingReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for BookingReducer {
    type State = BookingState;
    type Action = BookingAction;
    type Environment = BookingEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            BookingAction::Reserve {
                user,
                tier,
                quantity,
            } => Self::reserve(state, user, tier, quantity, env),

            BookingAction::Pay { user } => Self::pay(state, user, env),

            BookingAction::Cancel { user } => Self::cancel(state, user, env),

            BookingAction::SweepExpired => Self::sweep_expired(state, env),

            // ========== Events (outputs only) ==========
            event => {
                tracing::trace!(event = event.name(), "Ignoring event sent as input");
                SmallVec::new()
            }
        }
    }
}
