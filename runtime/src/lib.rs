//! # Tierhold Runtime
//!
//! Runtime implementation for the Tierhold reservation engine.
//!
//! ## Core Components
//!
//! - **Store**: owns the state behind one `RwLock` and runs the reducer under
//!   the write lock, so every action is a single critical section
//! - **Ticker**: a background task that feeds a periodic action into a Store
//!   without ever overlapping with itself
//! - **Metrics**: Prometheus descriptions and recorders for both
//!
//! ## Example
//!
//! ```ignore
//! use tierhold_runtime::Store;
//!
//! let store = Store::new(initial_state, my_reducer, environment);
//!
//! // Send an action and collect the outcomes it published
//! let published = store.send(Action::DoSomething).await?;
//!
//! // Read state
//! let value = store.state(|s| s.some_field).await;
//! ```

use std::sync::Arc;
use tierhold_core::reducer::Reducer;
use tokio::sync::RwLock;

/// Prometheus metrics for observability
pub mod metrics;

/// Periodic, non-overlapping action dispatch
pub mod ticker;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// Returned when `send()` is called after shutdown initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for in-flight actions to finish
        #[error("Shutdown timed out waiting for in-flight actions")]
        ShutdownTimeout,

        /// A background task failed to join
        ///
        /// This typically means a spawned task panicked.
        #[error("Background task failed: {0}")]
        TaskJoinError(#[from] tokio::task::JoinError),
    }
}

pub use error::StoreError;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Store module - the runtime coordinator
pub mod store {
    use super::{
        Arc, AtomicBool, Duration, Ordering, Reducer, RwLock, StoreError, metrics::StoreMetrics,
    };
    use smallvec::SmallVec;
    use tokio::sync::broadcast;

    /// Default capacity of the published-action broadcast channel
    pub const DEFAULT_BROADCAST_CAPACITY: usize = 16;

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind one `RwLock`; the reducer always runs under the write lock)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Published actions (returned to the sender and broadcast to observers)
    ///
    /// `tokio::sync::RwLock` is fair: writers queue in FIFO order, so a
    /// periodic ticker and request handlers cannot starve each other.
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        shutdown: Arc<AtomicBool>,
        /// Every published action, in commit order.
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        ///
        /// Uses a broadcast capacity of [`DEFAULT_BROADCAST_CAPACITY`].
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_broadcast_capacity(
                initial_state,
                reducer,
                environment,
                DEFAULT_BROADCAST_CAPACITY,
            )
        }

        /// Create a new Store with custom action broadcast capacity
        ///
        /// Increase the capacity if observers frequently lag behind.
        ///
        /// # Panics
        ///
        /// Panics if `capacity` is zero (a `tokio::sync::broadcast` requirement).
        #[must_use]
        pub fn with_broadcast_capacity(
            initial_state: S,
            reducer: R,
            environment: E,
            capacity: usize,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(capacity);

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                shutdown: Arc::new(AtomicBool::new(false)),
                action_broadcast,
            }
        }

        /// Send an action to the store
        ///
        /// 1. Acquires the write lock on state
        /// 2. Calls the reducer with (state, action, environment)
        /// 3. Broadcasts every published action before releasing the lock
        /// 4. Returns the published actions to the caller
        ///
        /// Concurrent `send()` calls serialize on the write lock. Observers see
        /// published actions in the same order the state transitions committed.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<SmallVec<[A; 4]>, StoreError> {
            if self.is_shutting_down() {
                tracing::warn!("Rejected action: store is shutting down");
                StoreMetrics::record_rejected();
                return Err(StoreError::ShutdownInProgress);
            }

            let mut state = self.state.write().await;
            tracing::trace!("Acquired write lock on state");

            // Shutdown may have started while this call was queued on the lock
            if self.is_shutting_down() {
                tracing::warn!("Rejected queued action: store is shutting down");
                StoreMetrics::record_rejected();
                return Err(StoreError::ShutdownInProgress);
            }

            let start = std::time::Instant::now();
            let effects = self.reducer.reduce(&mut *state, action, &self.environment);
            StoreMetrics::record_reduce(start.elapsed(), effects.len());

            let mut published = SmallVec::new();
            for effect in effects {
                if let Some(action) = effect.into_published() {
                    // No receivers is fine, nobody is listening yet
                    let _ = self.action_broadcast.send(action.clone());
                    published.push(action);
                }
            }
            drop(state);

            tracing::trace!(published = published.len(), "Action processed");
            Ok(published)
        }

        /// Subscribe to every action published by this store
        ///
        /// A receiver that falls more than the broadcast capacity behind gets
        /// `RecvError::Lagged` and skips the oldest actions; the store itself
        /// never waits for observers.
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let hold_count = store.state(|s| s.holds.len()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Access the environment the reducer runs with
        #[must_use]
        pub const fn environment(&self) -> &E {
            &self.environment
        }

        /// Returns true once [`Store::shutdown`] has been called
        #[must_use]
        pub fn is_shutting_down(&self) -> bool {
            self.shutdown.load(Ordering::Acquire)
        }

        /// Initiate graceful shutdown of the store
        ///
        /// Sets the shutdown flag (new and queued actions are rejected), then
        /// waits for the action currently holding the write lock to finish.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the in-flight action does
        /// not release the lock within `timeout`.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful store shutdown");
            self.shutdown.store(true, Ordering::Release);

            match tokio::time::timeout(timeout, self.state.write()).await {
                Ok(_guard) => {
                    tracing::info!("Store shutdown complete");
                    Ok(())
                }
                Err(_) => {
                    tracing::error!(?timeout, "Store shutdown timed out");
                    Err(StoreError::ShutdownTimeout)
                }
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                shutdown: Arc::clone(&self.shutdown),
                action_broadcast: self.action_broadcast.clone(),
            }
        }
    }
}

// Re-export for convenience
pub use store::Store;
pub use ticker::Ticker;
