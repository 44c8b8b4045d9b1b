//! Concurrency integration tests.
//!
//! Many callers race for the last units, pay the same hold, and compete with
//! the sweeper. The single store lock must keep every outcome consistent.
//!
//! Run with: `cargo test --test concurrency_test`

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

use chrono::Duration;
use std::sync::Arc;
use tierhold_booking::{
    BookingConfig, BookingError, BookingService, Money, TierDefinition, TierKey,
};
use tierhold_testing::{ManualClock, test_clock};

fn shared_service(clock: &ManualClock, available: u32) -> Arc<BookingService> {
    let config = BookingConfig {
        tiers: vec![TierDefinition::new(
            "VIP",
            "VIP",
            Money::from_minor(5_000),
            available,
        )],
        ..BookingConfig::default()
    };
    Arc::new(BookingService::new(&config, Arc::new(clock.clone())).unwrap())
}

/// Test 1: Last Units Race
///
/// 50 users each ask for 1 of 10 units: exactly 10 win, the rest see
/// `InsufficientInventory { remaining: 0 }`.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_units_are_never_oversold() {
    let clock = test_clock();
    let service = shared_service(&clock, 10);

    let handles: Vec<_> = (0..50)
        .map(|i| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.reserve(format!("user-{i}"), "VIP", 1).await })
        })
        .collect();

    let mut won = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => won += 1,
            Err(error) => {
                assert_eq!(error, BookingError::InsufficientInventory { remaining: 0 });
            }
        }
    }

    assert_eq!(won, 10);
    assert_eq!(
        service.inventory_snapshot().await[&TierKey::from("VIP")],
        0
    );
}

/// Test 2: Concurrent Payment
///
/// Ten concurrent payments for one hold: exactly one confirmation.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_payments_confirm_once() {
    let clock = test_clock();
    let service = shared_service(&clock, 20);
    service.reserve("alice", "VIP", 2).await.unwrap();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.pay("alice").await })
        })
        .collect();

    let mut confirmed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => confirmed += 1,
            Err(error) => assert_eq!(error, BookingError::AlreadyPaid),
        }
    }

    assert_eq!(confirmed, 1);
}

/// Test 3: Same User Reserving Concurrently
///
/// Only one hold per user, whatever the interleaving.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_user_gets_one_hold() {
    let clock = test_clock();
    let service = shared_service(&clock, 20);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.reserve("alice", "VIP", 1).await })
        })
        .collect();

    let mut placed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => placed += 1,
            Err(error) => assert_eq!(error, BookingError::ActiveReservationExists),
        }
    }

    assert_eq!(placed, 1);
    assert_eq!(
        service.inventory_snapshot().await[&TierKey::from("VIP")],
        19
    );
}

/// Test 4: Payments Racing the Sweeper
///
/// Every hold ends up either paid or released, never both, and inventory is
/// conserved.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_payments_racing_sweeps_stay_consistent() {
    let clock = test_clock();
    let service = shared_service(&clock, 20);

    for i in 0..5 {
        service.reserve(format!("user-{i}"), "VIP", 2).await.unwrap();
    }
    clock.advance(Duration::seconds(601));

    let sweeper = {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.sweep_now().await.unwrap() })
    };
    let payers: Vec<_> = (0..5)
        .map(|i| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.pay(format!("user-{i}")).await })
        })
        .collect();

    let expired = sweeper.await.unwrap();
    for handle in payers {
        assert_eq!(
            handle.await.unwrap(),
            Err(BookingError::ReservationExpired)
        );
    }

    assert_eq!(expired.len(), 5);
    let report = service.conservation_report().await;
    assert!(report.iter().all(|balance| balance.is_conserved()));
    assert_eq!(report[0].remaining, 20);
}
