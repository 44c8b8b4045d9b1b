//! Tierhold Booking Demo
//!
//! Walks through the booking flow against the in-memory service:
//! - Reserve, pay, and reserve again after paying
//! - Rejections (second hold, double payment, bad quantity)
//! - A hold expiring and its units returning to the tier
//! - Conservation report and Prometheus metrics at the end
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=info,tierhold_booking=debug cargo run --bin demo
//! ```
//!
//! The demo shortens the hold time limit to 2 seconds so expiry is visible.

use anyhow::Context;
use std::sync::Arc;
use tierhold_booking::metrics::register_business_metrics;
use tierhold_booking::{BookingConfig, BookingService, TierKey};
use tierhold_core::environment::SystemClock;
use tierhold_runtime::metrics::MetricsExporter;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEMO_HOLD_SECS: u64 = 2;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut config = BookingConfig::from_env().context("loading configuration")?;
    config.hold.time_limit_secs = DEMO_HOLD_SECS;
    config.hold.sweep_interval_ms = 250;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.runtime.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut exporter = MetricsExporter::new();
    exporter.install().context("installing metrics exporter")?;
    register_business_metrics();

    println!("\n🎫 ============================================");
    println!("   Tierhold Booking - Live Demo");
    println!("============================================\n");

    let service = BookingService::new(&config, Arc::new(SystemClock))
        .context("building booking service")?;
    service.start_sweeper();
    service.start_metrics_recorder();

    // Print every event as JSON, in commit order
    let mut events = service.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Ok(json) = serde_json::to_string(&event) {
                        println!("   📣 {json}");
                    }
                }
                Err(RecvError::Lagged(skipped)) => println!("   ⚠️  skipped {skipped} events"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    println!("📋 Catalogue:");
    for tier in service.tiers().await {
        println!(
            "   {} ({}): {} units at {}",
            tier.key, tier.label, tier.initial_available, tier.unit_price
        );
    }
    println!();

    // ========== Reserve and pay ==========

    println!("1️⃣  alice reserves 2 VIP...");
    let hold = service.reserve("alice", "VIP", 2).await?;
    println!(
        "   ✓ total {} ({:?} left to pay)",
        hold.total_price,
        service.time_remaining("alice").await
    );

    println!("2️⃣  alice tries a second hold before paying...");
    if let Err(error) = service.reserve("alice", "VIP", 1).await {
        println!("   ✗ {error}");
    }

    println!("3️⃣  alice pays...");
    let confirmation = service.pay("alice").await?;
    println!("   ✓ order {}", confirmation.order_reference);

    println!("4️⃣  alice pays again...");
    if let Err(error) = service.pay("alice").await {
        println!("   ✗ {error}");
    }

    println!("5️⃣  alice starts a new cycle with 1 VIP...");
    service.reserve("alice", "VIP", 1).await?;
    service.pay("alice").await?;
    println!("   ✓ {} settled purchase(s)", service.purchases("alice").await.len());

    // ========== Rejections ==========

    println!("6️⃣  bob asks for 6 Economy...");
    if let Err(error) = service.reserve("bob", "Economy", 6).await {
        println!("   ✗ {error}");
    }

    // ========== Expiry ==========

    println!("7️⃣  carol holds 3 VIP and walks away...");
    let vip = TierKey::from("VIP");
    service.reserve("carol", "VIP", 3).await?;
    println!("   VIP remaining: {:?}", service.inventory_snapshot().await.get(&vip));

    tokio::time::sleep(std::time::Duration::from_millis(DEMO_HOLD_SECS * 1_000 + 500)).await;

    match service.pay("carol").await {
        Ok(_) => println!("   ✓ carol paid (unexpected)"),
        Err(error) => println!("   ✗ carol: {error}"),
    }
    println!("   VIP remaining: {:?}", service.inventory_snapshot().await.get(&vip));

    // ========== Report ==========

    println!("\n📊 Conservation report:");
    for balance in service.conservation_report().await {
        println!(
            "   {:<10} initial={:<4} remaining={:<4} held={:<3} sold={:<3} {}",
            balance.tier.as_str(),
            balance.initial,
            balance.remaining,
            balance.held,
            balance.sold,
            if balance.is_conserved() { "✓" } else { "✗" }
        );
    }

    service.shutdown().await?;
    printer.abort();

    if let Some(rendered) = exporter.render() {
        println!("\n📈 Metrics:\n{rendered}");
    }

    Ok(())
}
