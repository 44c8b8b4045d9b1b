//! Prometheus metrics for the Store and Ticker.
//!
//! # Example
//!
//! ```rust,no_run
//! use tierhold_runtime::metrics::MetricsExporter;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut exporter = MetricsExporter::new();
//! exporter.install()?;
//!
//! // ... run the service ...
//!
//! if let Some(text) = exporter.render() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other crates
pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus exporter installed as the global metrics recorder.
#[derive(Default)]
pub struct MetricsExporter {
    handle: Option<PrometheusHandle>,
}

impl MetricsExporter {
    /// Create an exporter that has not been installed yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Register metric descriptions and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a recorder is already installed (e.g., by another test), this logs a
    /// warning and succeeds without a handle; [`MetricsExporter::render`] then
    /// returns `None`.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5,
                    1.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!("Prometheus metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Render current metrics in Prometheus text format.
    ///
    /// Returns `None` if this exporter did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all runtime metric descriptions.
fn register_metrics() {
    describe_counter!(
        "store_actions_processed_total",
        "Total number of actions reduced by stores"
    );
    describe_counter!(
        "store_actions_rejected_total",
        "Total number of actions rejected because the store was shutting down"
    );
    describe_histogram!(
        "store_reducer_duration_seconds",
        "Time spent inside the reducer while holding the write lock"
    );
    describe_histogram!(
        "store_effects_per_action",
        "Number of effects returned per reduced action"
    );
    describe_counter!("ticker_ticks_total", "Total number of ticks processed");
    describe_histogram!(
        "ticker_tick_duration_seconds",
        "Time taken by one tick, including lock acquisition"
    );
}

/// Store metrics recorder.
pub struct StoreMetrics;

impl StoreMetrics {
    /// Record one reduced action.
    pub fn record_reduce(duration: Duration, effects: usize) {
        counter!("store_actions_processed_total").increment(1);
        histogram!("store_reducer_duration_seconds").record(duration.as_secs_f64());
        // Note: Precision loss acceptable for metrics (effect counts < 2^52)
        #[allow(clippy::cast_precision_loss)]
        histogram!("store_effects_per_action").record(effects as f64);
    }

    /// Record an action rejected during shutdown.
    pub fn record_rejected() {
        counter!("store_actions_rejected_total").increment(1);
    }
}

/// Ticker metrics recorder.
pub struct TickerMetrics;

impl TickerMetrics {
    /// Record a processed tick.
    pub fn record_tick(ticker: &'static str, duration: Duration) {
        counter!("ticker_ticks_total", "ticker" => ticker).increment(1);
        histogram!("ticker_tick_duration_seconds", "ticker" => ticker)
            .record(duration.as_secs_f64());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_exporter_starts_uninstalled() {
        let exporter = MetricsExporter::new();
        assert!(exporter.render().is_none());
    }

    #[test]
    fn test_exporter_render() {
        let mut exporter = MetricsExporter::new();
        exporter.install().unwrap();

        StoreMetrics::record_reduce(Duration::from_micros(40), 1);
        TickerMetrics::record_tick("sweeper", Duration::from_micros(80));

        // Another test may already own the global recorder
        if let Some(rendered) = exporter.render() {
            assert!(rendered.contains("store_actions_processed_total"));
            assert!(rendered.contains("ticker_ticks_total"));
        }
    }
}
