//! Error types for the booking flow.
//!
//! [`BookingError`] is part of the published `Rejected` event, so it is plain
//! data: cloneable, comparable and serializable. Runtime failures are folded
//! into [`BookingError::Unavailable`] at the service boundary.

use crate::types::TierKey;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tierhold_runtime::StoreError;

/// Reasons a reserve, pay or cancel request is rejected
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingError {
    /// The user key is empty
    #[error("User key must not be empty")]
    InvalidInput,

    /// Quantity outside `MIN_QUANTITY..=MAX_QUANTITY`
    #[error("Quantity must be between 1 and 5, got {requested}")]
    InvalidQuantity {
        /// Quantity the caller asked for
        requested: u32,
    },

    /// The user already has an unpaid hold
    #[error("User already has an active reservation")]
    ActiveReservationExists,

    /// The tier key is not in the catalogue
    #[error("Unknown tier: {0}")]
    UnknownTier(TierKey),

    /// Not enough units left in the tier
    #[error("Insufficient inventory: only {remaining} left")]
    InsufficientInventory {
        /// Units still available when the request was evaluated
        remaining: u32,
    },

    /// The user has no reservation
    #[error("No reservation found")]
    ReservationNotFound,

    /// The reservation was already paid
    #[error("Reservation already paid")]
    AlreadyPaid,

    /// The hold ran out of time before payment
    #[error("Reservation expired")]
    ReservationExpired,

    /// The service could not process the request (e.g. it is shutting down)
    #[error("Booking service unavailable: {0}")]
    Unavailable(String),
}

impl BookingError {
    /// Stable snake-case code, used as a metric label
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::InvalidQuantity { .. } => "invalid_quantity",
            Self::ActiveReservationExists => "active_reservation_exists",
            Self::UnknownTier(_) => "unknown_tier",
            Self::InsufficientInventory { .. } => "insufficient_inventory",
            Self::ReservationNotFound => "reservation_not_found",
            Self::AlreadyPaid => "already_paid",
            Self::ReservationExpired => "reservation_expired",
            Self::Unavailable(_) => "unavailable",
        }
    }
}

impl From<StoreError> for BookingError {
    fn from(error: StoreError) -> Self {
        Self::Unavailable(error.to_string())
    }
}

/// Problems with the tier catalogue supplied at startup
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The catalogue has no tiers
    #[error("Tier catalogue is empty")]
    Empty,

    /// A tier has an empty key
    #[error("Tier key must not be empty")]
    EmptyKey,

    /// Two tiers share a key
    #[error("Duplicate tier key: {0}")]
    DuplicateKey(TierKey),

    /// A tier has a zero unit price
    #[error("Tier {0} must have a positive unit price")]
    ZeroPrice(TierKey),

    /// `unit_price × 5` does not fit in the money type
    #[error("Tier {0} unit price is too large")]
    PriceTooLarge(TierKey),
}
