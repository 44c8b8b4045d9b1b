//! Business metrics for the booking service.
//!
//! Metrics are derived from the published event stream, so the reducer stays
//! free of side effects and every recorded value matches a committed change.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `tierhold_reservations_total{status}` - Holds by outcome (placed, paid, expired, cancelled)
//! - `tierhold_rejections_total{reason}` - Refused commands by error
//! - `tierhold_revenue_minor_total` - Revenue from confirmed payments in minor units
//! - `tierhold_tickets_sold_total{tier}` - Units paid for
//!
//! ## Gauges
//! - `tierhold_active_holds` - Unpaid holds currently blocking inventory
//! - `tierhold_tickets_available{tier}` - Units left per tier
//!
//! Sweep timings come from the runtime's `ticker_tick_duration_seconds{ticker="expiry_sweeper"}`.

use crate::reducer::BookingAction;
use metrics::{describe_counter, describe_gauge};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

/// Initialize and register all business metrics descriptions.
///
/// This should be called once at application startup, before any metrics are recorded.
pub fn register_business_metrics() {
    describe_counter!(
        "tierhold_reservations_total",
        "Total number of holds by outcome (placed, paid, expired, cancelled)"
    );
    describe_counter!(
        "tierhold_rejections_total",
        "Total number of refused reserve, pay and cancel commands by reason"
    );
    describe_counter!(
        "tierhold_revenue_minor_total",
        "Total revenue from confirmed payments in currency minor units"
    );
    describe_counter!("tierhold_tickets_sold_total", "Total units paid for, by tier");
    describe_gauge!(
        "tierhold_active_holds",
        "Current number of unpaid holds blocking inventory"
    );
    describe_gauge!(
        "tierhold_tickets_available",
        "Current number of units available, by tier"
    );

    tracing::info!("Business metrics registered");
}

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Record a placed hold and the tier's new availability.
pub fn record_hold_placed(tier: &str, remaining: u32) {
    metrics::counter!("tierhold_reservations_total", "status" => "placed").increment(1);
    metrics::gauge!("tierhold_active_holds").increment(1.0);
    record_available(tier, remaining);
    tracing::debug!(tier, remaining, "Recorded hold_placed metric");
}

/// Record a confirmed payment.
pub fn record_payment_confirmed(tier: &str, quantity: u32, amount_minor: u64) {
    metrics::counter!("tierhold_reservations_total", "status" => "paid").increment(1);
    metrics::gauge!("tierhold_active_holds").decrement(1.0);
    metrics::counter!("tierhold_revenue_minor_total").increment(amount_minor);
    metrics::counter!("tierhold_tickets_sold_total", "tier" => tier.to_string())
        .increment(u64::from(quantity));
    tracing::debug!(tier, quantity, amount_minor, "Recorded payment_confirmed metric");
}

/// Record a hold released by the sweeper.
pub fn record_hold_expired(tier: &str, remaining: u32) {
    metrics::counter!("tierhold_reservations_total", "status" => "expired").increment(1);
    metrics::gauge!("tierhold_active_holds").decrement(1.0);
    record_available(tier, remaining);
    tracing::debug!(tier, remaining, "Recorded hold_expired metric");
}

/// Record a hold released by its user.
pub fn record_hold_cancelled(tier: &str, remaining: u32) {
    metrics::counter!("tierhold_reservations_total", "status" => "cancelled").increment(1);
    metrics::gauge!("tierhold_active_holds").decrement(1.0);
    record_available(tier, remaining);
    tracing::debug!(tier, remaining, "Recorded hold_cancelled metric");
}

/// Record a refused command.
pub fn record_rejection(reason: &'static str) {
    metrics::counter!("tierhold_rejections_total", "reason" => reason).increment(1);
    tracing::debug!(reason, "Recorded rejection metric");
}

/// Set the availability gauge for a tier.
pub fn record_available(tier: &str, remaining: u32) {
    metrics::gauge!("tierhold_tickets_available", "tier" => tier.to_string())
        .set(f64::from(remaining));
}

/// Record the metrics for one published event; commands are ignored.
pub fn record_event(event: &BookingAction) {
    match event {
        BookingAction::HoldPlaced {
            reservation,
            remaining,
        } => record_hold_placed(reservation.tier.as_str(), *remaining),
        BookingAction::PaymentConfirmed { confirmation } => record_payment_confirmed(
            confirmation.tier.as_str(),
            confirmation.quantity,
            confirmation.total_price.minor_units(),
        ),
        BookingAction::HoldExpired {
            reservation,
            remaining,
            ..
        } => record_hold_expired(reservation.tier.as_str(), *remaining),
        BookingAction::HoldCancelled {
            reservation,
            remaining,
            ..
        } => record_hold_cancelled(reservation.tier.as_str(), *remaining),
        BookingAction::Rejected { error, .. } => record_rejection(error.code()),
        BookingAction::PurchaseSettled { .. }
        | BookingAction::Reserve { .. }
        | BookingAction::Pay { .. }
        | BookingAction::Cancel { .. }
        | BookingAction::SweepExpired => {}
    }
}

/// Spawn a task that records metrics for every event on `events`
///
/// The task ends when the channel closes. If it falls behind, the skipped
/// events are logged and not recorded.
pub fn spawn_event_recorder(mut events: broadcast::Receiver<BookingAction>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => record_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Metrics recorder lagged, events not recorded");
                }
                Err(RecvError::Closed) => break,
            }
        }
        tracing::debug!("Metrics recorder stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BookingError;
    use crate::types::{Money, Reservation};
    use chrono::DateTime;

    #[tokio::test]
    async fn test_recorder_stops_when_channel_closes() {
        let (sender, receiver) = broadcast::channel(8);
        let recorder = spawn_event_recorder(receiver);

        let reservation = Reservation {
            user: "alice".into(),
            tier: "VIP".into(),
            quantity: 2,
            total_price: Money::from_minor(10_000),
            created_at: DateTime::UNIX_EPOCH,
        };
        let _ = sender.send(BookingAction::HoldPlaced {
            reservation,
            remaining: 18,
        });
        let _ = sender.send(BookingAction::Rejected {
            user: "bob".into(),
            error: BookingError::AlreadyPaid,
        });
        drop(sender);

        tokio_test::assert_ok!(recorder.await);
    }
}
