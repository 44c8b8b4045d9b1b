//! Paid markers and settled purchases.

use crate::types::{Reservation, TierKey, UserKey};
use std::collections::{HashMap, HashSet};

/// Set of users whose current reservation has been paid
///
/// Membership is tied to the reservation: the reducer only inserts a user that
/// has a reservation, and clears the marker when that reservation is settled.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PaymentSet {
    paid: HashSet<UserKey>,
}

impl PaymentSet {
    /// True if the user's current reservation is paid
    #[must_use]
    pub fn contains(&self, user: &UserKey) -> bool {
        self.paid.contains(user)
    }

    /// Mark the user's reservation paid; returns false if it already was
    pub fn mark_paid(&mut self, user: UserKey) -> bool {
        self.paid.insert(user)
    }

    /// Clear the marker; returns true if it was set
    pub fn clear(&mut self, user: &UserKey) -> bool {
        self.paid.remove(user)
    }

    /// Number of paid reservations still in the reservation store
    #[must_use]
    pub fn len(&self) -> usize {
        self.paid.len()
    }

    /// True if no reservation is marked paid
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paid.is_empty()
    }
}

/// Paid reservations that have been settled out of the reservation store
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PurchaseHistory {
    purchases: HashMap<UserKey, Vec<Reservation>>,
}

impl PurchaseHistory {
    /// Append a settled purchase
    pub fn record(&mut self, purchase: Reservation) {
        self.purchases
            .entry(purchase.user.clone())
            .or_default()
            .push(purchase);
    }

    /// The user's settled purchases, oldest first
    #[must_use]
    pub fn for_user(&self, user: &UserKey) -> &[Reservation] {
        self.purchases.get(user).map_or(&[], Vec::as_slice)
    }

    /// Units of `tier` sold through settled purchases
    #[must_use]
    pub fn sold(&self, tier: &TierKey) -> u32 {
        self.purchases
            .values()
            .flatten()
            .filter(|purchase| &purchase.tier == tier)
            .map(|purchase| purchase.quantity)
            .sum()
    }
}
