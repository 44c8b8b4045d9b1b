//! Domain types for tiered ticket reservations.
//!
//! Value objects (keys, money), the immutable tier catalogue entry, and the
//! records the booking flow produces: reservations, confirmations and the
//! per-tier conservation balance.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest quantity a single reservation may hold
pub const MIN_QUANTITY: u32 = 1;

/// Largest quantity a single reservation may hold
pub const MAX_QUANTITY: u32 = 5;

// ============================================================================
// Identifiers
// ============================================================================

/// Opaque, caller-supplied user identifier
///
/// The key is never authenticated. The only rule is that it must be non-empty,
/// and that rule is enforced by the booking reducer, not by construction, so
/// that an empty key surfaces as a regular `InvalidInput` error.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserKey(String);

impl UserKey {
    /// Creates a user key
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the key is the empty string
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for UserKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for UserKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier of a tier (e.g. `VIP`)
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TierKey(String);

impl TierKey {
    /// Creates a tier key
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TierKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for TierKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Display for TierKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Money
// ============================================================================

/// Amount in currency minor units (e.g. cents)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Creates a `Money` value from minor units
    #[must_use]
    pub const fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    /// Returns the amount in minor units
    #[must_use]
    pub const fn minor_units(&self) -> u64 {
        self.0
    }

    /// Multiplies by a quantity, returning `None` on overflow
    #[must_use]
    pub const fn checked_times(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as u64) {
            Some(total) => Some(Self(total)),
            None => None,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// Tier catalogue
// ============================================================================

/// One tier of the resource, seeded at startup and never changed afterwards
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierDefinition {
    /// Unique identifier
    pub key: TierKey,
    /// Display name (not used by the booking logic)
    pub label: String,
    /// Price of one unit
    pub unit_price: Money,
    /// Units available before any reservation
    pub initial_available: u32,
}

impl TierDefinition {
    /// Creates a tier definition
    #[must_use]
    pub fn new(
        key: impl Into<TierKey>,
        label: impl Into<String>,
        unit_price: Money,
        initial_available: u32,
    ) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            unit_price,
            initial_available,
        }
    }
}

// ============================================================================
// Reservation records
// ============================================================================

/// A time-limited hold on `quantity` units of one tier for one user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Owner of the hold
    pub user: UserKey,
    /// Tier the units were taken from
    pub tier: TierKey,
    /// Number of units held (1..=5)
    pub quantity: u32,
    /// `quantity × unit_price`, frozen when the hold was placed
    pub total_price: Money,
    /// When the hold was placed
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    /// Time since the hold was placed
    #[must_use]
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        now - self.created_at
    }

    /// When the hold stops being payable
    #[must_use]
    pub fn expires_at(&self, time_limit: Duration) -> DateTime<Utc> {
        self.created_at + time_limit
    }

    /// `time_limit - elapsed`, clamped at zero
    #[must_use]
    pub fn time_remaining(&self, now: DateTime<Utc>, time_limit: Duration) -> Duration {
        (time_limit - self.elapsed(now)).max(Duration::zero())
    }

    /// True once the hold has outlived the time limit and may be swept.
    ///
    /// Strictly greater: at exactly `time_limit` the hold is no longer payable
    /// but is only released on the next sweep after that instant.
    #[must_use]
    pub fn is_past_limit(&self, now: DateTime<Utc>, time_limit: Duration) -> bool {
        self.elapsed(now) > time_limit
    }
}

/// Reference printed on a confirmation: the user key plus the confirmation
/// timestamp in milliseconds. Unique enough for this domain, not a secret.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderReference(String);

impl OrderReference {
    /// Derives the reference for a user confirming at `confirmed_at`
    #[must_use]
    pub fn derive(user: &UserKey, confirmed_at: DateTime<Utc>) -> Self {
        Self(format!("{user}-{}", confirmed_at.timestamp_millis()))
    }

    /// The reference as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Record produced when a payment completes
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    /// Who paid
    pub user: UserKey,
    /// When the payment was accepted
    pub confirmed_at: DateTime<Utc>,
    /// Derived order reference
    pub order_reference: OrderReference,
    /// Tier that was purchased
    pub tier: TierKey,
    /// Units purchased
    pub quantity: u32,
    /// Amount charged
    pub total_price: Money,
}

/// Inventory balance for one tier
///
/// `remaining + held + sold == initial` must hold at every observation point.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierBalance {
    /// Tier
    pub tier: TierKey,
    /// Units seeded at startup
    pub initial: u32,
    /// Units still available
    pub remaining: u32,
    /// Units in current reservations, paid or not
    pub held: u32,
    /// Units in settled purchases
    pub sold: u32,
}

impl TierBalance {
    /// True if no unit has been created or lost
    #[must_use]
    pub const fn is_conserved(&self) -> bool {
        self.remaining as u64 + self.held as u64 + self.sold as u64 == self.initial as u64
    }
}
