//! Property tests for the booking reducer.
//!
//! Random sequences of reserve, pay, cancel, clock moves and sweeps must keep:
//! - Conservation: `remaining + held + sold == initial` for every tier
//! - Paid markers only for users that still have a reservation
//! - Payments confirmed at most once per hold

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

use chrono::Duration;
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use tierhold_booking::{
    BookingAction, BookingEnvironment, BookingReducer, BookingState, Money, TierDefinition,
    UserKey,
};
use tierhold_core::reducer::Reducer;
use tierhold_testing::test_clock;

const USERS: [&str; 4] = ["alice", "bob", "carol", "dave"];
const TIERS: [&str; 3] = ["VIP", "Economy", "Gold"]; // Gold is never seeded
const LIMIT_SECS: i64 = 600;

#[derive(Debug, Clone)]
enum Step {
    Reserve { user: usize, tier: usize, quantity: u32 },
    Pay { user: usize },
    Cancel { user: usize },
    Advance { secs: i64 },
    Sweep,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => (0..USERS.len(), 0..TIERS.len(), 0u32..=6)
            .prop_map(|(user, tier, quantity)| Step::Reserve { user, tier, quantity }),
        3 => (0..USERS.len()).prop_map(|user| Step::Pay { user }),
        1 => (0..USERS.len()).prop_map(|user| Step::Cancel { user }),
        2 => (0i64..=400).prop_map(|secs| Step::Advance { secs }),
        2 => Just(Step::Sweep),
    ]
}

fn initial_state() -> BookingState {
    BookingState::new([
        TierDefinition::new("VIP", "VIP", Money::from_minor(5_000), 6),
        TierDefinition::new("Economy", "Economy", Money::from_minor(1_000), 9),
    ])
    .unwrap()
}

proptest! {
    /// Property: every tier balances after every step
    #[test]
    fn inventory_is_conserved(steps in prop::collection::vec(step(), 1..80)) {
        let clock = test_clock();
        let env = BookingEnvironment::new(Arc::new(clock.clone()), Duration::seconds(LIMIT_SECS));
        let reducer = BookingReducer::new();
        let mut state = initial_state();

        for step in steps {
            let action = match step {
                Step::Reserve { user, tier, quantity } => BookingAction::Reserve {
                    user: USERS[user].into(),
                    tier: TIERS[tier].into(),
                    quantity,
                },
                Step::Pay { user } => BookingAction::Pay { user: USERS[user].into() },
                Step::Cancel { user } => BookingAction::Cancel { user: USERS[user].into() },
                Step::Advance { secs } => {
                    clock.advance(Duration::seconds(secs));
                    continue;
                }
                Step::Sweep => BookingAction::SweepExpired,
            };

            let already_paid: HashSet<UserKey> = USERS
                .iter()
                .map(|user| UserKey::from(*user))
                .filter(|user| state.payments.contains(user))
                .collect();

            for effect in reducer.reduce(&mut state, action, &env) {
                if let Some(BookingAction::PaymentConfirmed { confirmation }) = effect.into_published() {
                    prop_assert!(!already_paid.contains(&confirmation.user));
                    prop_assert!(state.payments.contains(&confirmation.user));
                }
            }

            for balance in state.conservation_report() {
                prop_assert!(balance.is_conserved(), "unbalanced: {:?}", balance);
            }
            for user in USERS {
                let user = UserKey::from(user);
                if state.payments.contains(&user) {
                    prop_assert!(state.reservation(&user).is_some());
                }
            }
        }
    }

    /// Property: a rejected command never changes the inventory
    #[test]
    fn rejections_change_nothing(
        setup in prop::collection::vec(step(), 0..30),
        user in 0..USERS.len(),
        quantity in prop_oneof![Just(0u32), 6u32..=10],
    ) {
        let clock = test_clock();
        let env = BookingEnvironment::new(Arc::new(clock.clone()), Duration::seconds(LIMIT_SECS));
        let reducer = BookingReducer::new();
        let mut state = initial_state();

        for step in setup {
            if let Step::Reserve { user, tier, quantity } = step {
                reducer.reduce(
                    &mut state,
                    BookingAction::Reserve {
                        user: USERS[user].into(),
                        tier: TIERS[tier].into(),
                        quantity,
                    },
                    &env,
                );
            }
        }

        let before = state.ledger.snapshot();
        let effects = reducer.reduce(
            &mut state,
            BookingAction::Reserve {
                user: USERS[user].into(),
                tier: "VIP".into(),
                quantity,
            },
            &env,
        );

        let rejected = effects
            .iter()
            .all(|effect| matches!(effect.published(), Some(BookingAction::Rejected { .. })));
        prop_assert!(rejected);
        prop_assert_eq!(before, state.ledger.snapshot());
    }
}
