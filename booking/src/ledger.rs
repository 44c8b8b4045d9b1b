//! Remaining units per tier.

use crate::error::BookingError;
use crate::types::{TierDefinition, TierKey};
use std::collections::BTreeMap;

/// Mapping from tier key to the units still available
///
/// Only ever mutated from inside the booking reducer, which runs under the
/// store's write lock, so a check followed by a decrement is atomic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InventoryLedger {
    remaining: BTreeMap<TierKey, u32>,
}

impl InventoryLedger {
    /// Seed the ledger with each tier's initial availability
    #[must_use]
    pub fn seeded<'a>(tiers: impl IntoIterator<Item = &'a TierDefinition>) -> Self {
        Self {
            remaining: tiers
                .into_iter()
                .map(|tier| (tier.key.clone(), tier.initial_available))
                .collect(),
        }
    }

    /// Units left in `tier`, or `None` for an unknown tier
    #[must_use]
    pub fn remaining(&self, tier: &TierKey) -> Option<u32> {
        self.remaining.get(tier).copied()
    }

    /// Check that `quantity` units can be taken from `tier`
    ///
    /// # Errors
    ///
    /// - [`BookingError::UnknownTier`] if the tier is not in the ledger
    /// - [`BookingError::InsufficientInventory`] if fewer than `quantity` remain
    pub fn ensure_available(&self, tier: &TierKey, quantity: u32) -> Result<u32, BookingError> {
        let remaining = self
            .remaining(tier)
            .ok_or_else(|| BookingError::UnknownTier(tier.clone()))?;

        if quantity > remaining {
            return Err(BookingError::InsufficientInventory { remaining });
        }

        Ok(remaining)
    }

    /// Take `quantity` units from `tier`, returning what is left
    ///
    /// # Errors
    ///
    /// Same as [`InventoryLedger::ensure_available`]; the ledger is unchanged on error.
    pub fn decrement(&mut self, tier: &TierKey, quantity: u32) -> Result<u32, BookingError> {
        self.ensure_available(tier, quantity)?;
        let remaining = self
            .remaining
            .get_mut(tier)
            .ok_or_else(|| BookingError::UnknownTier(tier.clone()))?;
        *remaining -= quantity;
        Ok(*remaining)
    }

    /// Give `quantity` units back to `tier`, returning the new count
    ///
    /// Only called for units previously taken by [`InventoryLedger::decrement`],
    /// so the tier is always known. Returns `None` otherwise.
    pub fn restore(&mut self, tier: &TierKey, quantity: u32) -> Option<u32> {
        let remaining = self.remaining.get_mut(tier)?;
        *remaining += quantity;
        Some(*remaining)
    }

    /// Copy of the whole ledger
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<TierKey, u32> {
        self.remaining.clone()
    }
}
