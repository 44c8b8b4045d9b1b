//! Aggregate booking state guarded by the store lock.

use crate::error::CatalogError;
use crate::ledger::InventoryLedger;
use crate::payments::{PaymentSet, PurchaseHistory};
use crate::reservations::ReservationStore;
use crate::types::{MAX_QUANTITY, Reservation, TierBalance, TierDefinition, TierKey, UserKey};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashSet};

/// Everything the booking reducer reads and writes
///
/// The catalogue is fixed at construction. The ledger, reservation store and
/// payment set are only ever mutated together, inside one reducer call.
#[derive(Clone, Debug)]
pub struct BookingState {
    catalog: BTreeMap<TierKey, TierDefinition>,
    /// Remaining units per tier
    pub ledger: InventoryLedger,
    /// Current reservation per user
    pub reservations: ReservationStore,
    /// Users whose current reservation is paid
    pub payments: PaymentSet,
    /// Settled purchases, moved out of `reservations` when a user starts a new cycle
    pub purchases: PurchaseHistory,
    /// Users whose last hold was removed by the sweeper and not yet replaced
    pub expired: HashSet<UserKey>,
}

impl BookingState {
    /// Build the initial state from a tier catalogue
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if the catalogue is empty, has an empty or
    /// duplicate key, or has a tier with a zero or oversized unit price.
    pub fn new(tiers: impl IntoIterator<Item = TierDefinition>) -> Result<Self, CatalogError> {
        let mut catalog = BTreeMap::new();

        for tier in tiers {
            if tier.key.as_str().is_empty() {
                return Err(CatalogError::EmptyKey);
            }
            if tier.unit_price.minor_units() == 0 {
                return Err(CatalogError::ZeroPrice(tier.key));
            }
            if tier.unit_price.checked_times(MAX_QUANTITY).is_none() {
                return Err(CatalogError::PriceTooLarge(tier.key));
            }
            if catalog.contains_key(&tier.key) {
                return Err(CatalogError::DuplicateKey(tier.key));
            }
            catalog.insert(tier.key.clone(), tier);
        }

        if catalog.is_empty() {
            return Err(CatalogError::Empty);
        }

        Ok(Self {
            ledger: InventoryLedger::seeded(catalog.values()),
            catalog,
            reservations: ReservationStore::default(),
            payments: PaymentSet::default(),
            purchases: PurchaseHistory::default(),
            expired: HashSet::new(),
        })
    }

    /// Catalogue entry for `tier`
    #[must_use]
    pub fn tier(&self, tier: &TierKey) -> Option<&TierDefinition> {
        self.catalog.get(tier)
    }

    /// Every tier, ordered by key
    pub fn tiers(&self) -> impl Iterator<Item = &TierDefinition> {
        self.catalog.values()
    }

    /// The user's reservation, paid or not
    #[must_use]
    pub fn reservation(&self, user: &UserKey) -> Option<&Reservation> {
        self.reservations.get(user)
    }

    /// True if the user has a reservation that is not yet paid
    #[must_use]
    pub fn has_unpaid_hold(&self, user: &UserKey) -> bool {
        self.reservations.get(user).is_some() && !self.payments.contains(user)
    }

    /// Time left to pay, or `None` if there is no unpaid hold
    #[must_use]
    pub fn time_remaining(
        &self,
        user: &UserKey,
        now: DateTime<Utc>,
        time_limit: Duration,
    ) -> Option<Duration> {
        if self.payments.contains(user) {
            return None;
        }
        self.reservations
            .get(user)
            .map(|hold| hold.time_remaining(now, time_limit))
    }

    /// Unpaid holds older than `time_limit` at `now`, ordered by user key
    #[must_use]
    pub fn expired_holds(&self, now: DateTime<Utc>, time_limit: Duration) -> Vec<UserKey> {
        let mut users: Vec<UserKey> = self
            .reservations
            .iter()
            .filter(|hold| !self.payments.contains(&hold.user))
            .filter(|hold| hold.is_past_limit(now, time_limit))
            .map(|hold| hold.user.clone())
            .collect();
        users.sort();
        users
    }

    /// Remaining, held and sold units for every tier
    #[must_use]
    pub fn conservation_report(&self) -> Vec<TierBalance> {
        self.catalog
            .values()
            .map(|tier| TierBalance {
                tier: tier.key.clone(),
                initial: tier.initial_available,
                remaining: self.ledger.remaining(&tier.key).unwrap_or_default(),
                held: self.reservations.held(&tier.key),
                sold: self.purchases.sold(&tier.key),
            })
            .collect()
    }
}
