//! At most one reservation per user.

use crate::error::BookingError;
use crate::types::{Reservation, TierKey, UserKey};
use std::collections::HashMap;

/// Mapping from user key to that user's current reservation
///
/// A paid reservation stays here until the user starts a new cycle, at which
/// point the booking reducer settles it into purchase history first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReservationStore {
    holds: HashMap<UserKey, Reservation>,
}

impl ReservationStore {
    /// The user's reservation, if any
    #[must_use]
    pub fn get(&self, user: &UserKey) -> Option<&Reservation> {
        self.holds.get(user)
    }

    /// Insert a reservation for its user
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::ActiveReservationExists`] if the user already has
    /// a reservation; the existing entry is left untouched.
    pub fn put(&mut self, reservation: Reservation) -> Result<(), BookingError> {
        use std::collections::hash_map::Entry;

        match self.holds.entry(reservation.user.clone()) {
            Entry::Occupied(_) => Err(BookingError::ActiveReservationExists),
            Entry::Vacant(slot) => {
                slot.insert(reservation);
                Ok(())
            }
        }
    }

    /// Remove and return the user's reservation
    pub fn remove(&mut self, user: &UserKey) -> Option<Reservation> {
        self.holds.remove(user)
    }

    /// Iterate over every reservation, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &Reservation> {
        self.holds.values()
    }

    /// Units of `tier` held by current reservations
    #[must_use]
    pub fn held(&self, tier: &TierKey) -> u32 {
        self.holds
            .values()
            .filter(|hold| &hold.tier == tier)
            .map(|hold| hold.quantity)
            .sum()
    }

    /// Number of reservations
    #[must_use]
    pub fn len(&self) -> usize {
        self.holds.len()
    }

    /// True if nobody holds a reservation
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.holds.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Money;
    use chrono::DateTime;

    fn hold(user: &str, quantity: u32) -> Reservation {
        Reservation {
            user: user.into(),
            tier: "VIP".into(),
            quantity,
            total_price: Money::from_minor(5_000 * u64::from(quantity)),
            created_at: DateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_one_reservation_per_user() {
        let mut store = ReservationStore::default();
        store.put(hold("alice", 2)).unwrap();

        assert_eq!(
            store.put(hold("alice", 1)),
            Err(BookingError::ActiveReservationExists)
        );
        assert_eq!(store.get(&"alice".into()).unwrap().quantity, 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_held_sums_per_tier() {
        let mut store = ReservationStore::default();
        store.put(hold("alice", 2)).unwrap();
        store.put(hold("bob", 3)).unwrap();

        assert_eq!(store.held(&"VIP".into()), 5);
        assert_eq!(store.held(&"Economy".into()), 0);

        assert!(store.remove(&"alice".into()).is_some());
        assert!(store.remove(&"alice".into()).is_none());
        assert_eq!(store.held(&"VIP".into()), 3);
    }
}
