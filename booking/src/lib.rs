//! Tierhold Booking - timed, tiered ticket reservations
//!
//! A fixed catalogue of tiers (e.g. VIP, Standard, Economy) is sold through
//! short-lived holds:
//!
//! - **Reserve**: a user holds 1 to 5 units of one tier; inventory drops at once
//! - **Pay**: the hold becomes a purchase, exactly once, if it has not expired
//! - **Expire**: a periodic sweep returns unpaid holds older than the time limit
//! - **Cancel**: a user may give an unpaid hold back early
//!
//! # Architecture
//!
//! ```text
//!  reserve / pay / cancel          every SWEEP_INTERVAL_MS
//!  ┌────────────────────┐          ┌──────────────────┐
//!  │   BookingService   │          │  ExpirySweeper   │
//!  └─────────┬──────────┘          └────────┬─────────┘
//!            │   BookingAction (command)    │
//!            └──────────────┬───────────────┘
//!                           ▼
//!               ┌──────────────────────┐
//!               │ Store (one RwLock)   │
//!               │  BookingReducer      │
//!               │  ├─ InventoryLedger  │
//!               │  ├─ ReservationStore │
//!               │  └─ PaymentSet       │
//!               └──────────┬───────────┘
//!                          │ BookingAction (event), commit order
//!                          ▼
//!               subscribers, metrics recorder
//! ```
//!
//! # Conservation
//!
//! Every command is one reducer call under the store's write lock, so for each
//! tier `remaining + held + sold == initial` holds at every observation point.
//! [`BookingService::conservation_report`] exposes the three terms.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod payments;
pub mod reducer;
pub mod reservations;
pub mod service;
pub mod state;
pub mod sweeper;
pub mod types;

pub use config::{BookingConfig, ConfigError};
pub use error::{BookingError, CatalogError};
pub use reducer::{BookingAction, BookingEnvironment, BookingReducer};
pub use service::{BookingService, BookingStore};
pub use state::BookingState;
pub use sweeper::ExpirySweeper;
pub use types::*;
