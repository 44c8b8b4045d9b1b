//! # Tierhold Core
//!
//! Core traits and types for the Tierhold reservation engine.
//!
//! Business logic is written as a reducer: a pure function that takes the
//! current state, one action and the injected environment, mutates the state
//! in place and returns a list of effects describing what the runtime should
//! do next. The runtime (see `tierhold-runtime`) owns the state behind a single
//! lock, so every reducer invocation is one critical section.
//!
//! ## Core Concepts
//!
//! - **State**: owned domain data (inventory, holds, payments)
//! - **Action**: commands (requests) and events (facts) in one enum
//! - **Reducer**: `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: a description of follow-up work, never executed by the reducer
//! - **Environment**: injected dependencies, most importantly the [`environment::Clock`]
//!
//! ## Example
//!
//! ```ignore
//! use tierhold_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
//!
//! impl Reducer for CounterReducer {
//!     type State = CounterState;
//!     type Action = CounterAction;
//!     type Environment = CounterEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut CounterState,
//!         action: CounterAction,
//!         _env: &CounterEnvironment,
//!     ) -> SmallVec<[Effect<CounterAction>; 4]> {
//!         state.count += 1;
//!         smallvec![Effect::Publish(CounterAction::Incremented { count: state.count })]
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{smallvec, SmallVec};

/// Reducer module - the trait every piece of business logic implements.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// Reducers must not perform I/O and must not panic. Anything that has to
    /// happen outside the state transition is returned as an [`Effect`].
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// # Arguments
        ///
        /// - `state`: Mutable reference to current state
        /// - `action`: The action to process
        /// - `env`: Reference to injected dependencies
        ///
        /// # Returns
        ///
        /// The effects to be executed by the runtime, in order
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - side effect descriptions
pub mod effect {
    /// Effect type - describes work for the runtime to perform
    ///
    /// Effects are values. The reducer returns them and the Store decides how
    /// to execute them once the state transition is committed.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Publish an outcome action.
        ///
        /// The Store hands published actions back to the caller of `send` and
        /// broadcasts them to every subscriber, in the order they were returned.
        Publish(Action),
    }

    impl<Action> Effect<Action> {
        /// Returns the published action, if this effect publishes one
        #[must_use]
        pub const fn published(&self) -> Option<&Action> {
            match self {
                Self::None => None,
                Self::Publish(action) => Some(action),
            }
        }

        /// Consumes the effect, returning the published action if any
        #[must_use]
        pub fn into_published(self) -> Option<Action> {
            match self {
                Self::None => None,
                Self::Publish(action) => Some(action),
            }
        }
    }
}

/// Environment module - dependency injection traits
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// Every timestamp a reducer records and every expiry decision it makes
    /// goes through this trait, so tests can move time explicitly.
    ///
    /// # Examples
    ///
    /// ```
    /// use tierhold_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let earlier = clock.now();
    /// assert!(clock.now() >= earlier);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system wall clock
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
