//! Given-When-Then harness for reducers.
//!
//! Reducers are pure, so most behaviour can be pinned down without a Store:
//! set up a state, apply one or more actions, then inspect the final state and
//! every action the reducer published along the way.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use tierhold_core::{effect::Effect, reducer::Reducer};

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for published-action assertion functions
type PublishedAssertion<A> = Box<dyn FnOnce(&[A])>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// Actions given to [`ReducerTest::given_actions`] build up the starting state
/// and their output is discarded. Actions given to [`ReducerTest::when_action`]
/// are the ones under test; everything they publish is collected for
/// [`ReducerTest::then_published`].
///
/// # Example
///
/// ```ignore
/// use tierhold_testing::ReducerTest;
///
/// ReducerTest::new(BookingReducer::new())
///     .with_env(environment)
///     .given_state(BookingState::new(tiers)?)
///     .given_actions([reserve("alice", "VIP", 2)])
///     .when_action(BookingAction::Pay { user: "alice".into() })
///     .then_state(|state| assert!(state.payments.contains(&"alice".into())))
///     .then_published(|published| assert_eq!(published.len(), 1))
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    setup: Vec<A>,
    actions: Vec<A>,
    state_assertions: Vec<StateAssertion<S>>,
    published_assertions: Vec<PublishedAssertion<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            setup: Vec::new(),
            actions: Vec::new(),
            state_assertions: Vec::new(),
            published_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Apply actions before the ones under test (Given)
    #[must_use]
    pub fn given_actions(mut self, actions: impl IntoIterator<Item = A>) -> Self {
        self.setup.extend(actions);
        self
    }

    /// Add an action under test (When); may be called repeatedly
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the actions published by the When step (Then)
    #[must_use]
    pub fn then_published<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[A]) + 'static,
    {
        self.published_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if the initial state, environment, or at least one When action
    /// is missing, or if any assertion fails.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");
        let env = self
            .environment
            .expect("Environment must be set with with_env()");
        assert!(
            !self.actions.is_empty(),
            "At least one action must be set with when_action()"
        );

        for action in self.setup {
            let _ = self.reducer.reduce(&mut state, action, &env);
        }

        let mut published = Vec::new();
        for action in self.actions {
            let effects = self.reducer.reduce(&mut state, action, &env);
            published.extend(effects.into_iter().filter_map(Effect::into_published));
        }

        for assertion in self.state_assertions {
            assertion(&state);
        }

        for assertion in self.published_assertions {
            assertion(&published);
        }
    }
}

/// Helper assertions for effects
pub mod assertions {
    use tierhold_core::effect::Effect;

    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if any effect publishes an action.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(|e| matches!(e, Effect::None)),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Assert the number of published actions
    ///
    /// # Panics
    ///
    /// Panics if the number of `Publish` effects doesn't match expected.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_published_count<A>(effects: &[Effect<A>], expected: usize) {
        let found = effects.iter().filter(|e| e.published().is_some()).count();
        assert_eq!(
            found, expected,
            "Expected {expected} published actions, but found {found}"
        );
    }

    /// Assert that exactly one action was published and return it
    ///
    /// # Panics
    ///
    /// Panics unless `published` has exactly one element.
    #[allow(clippy::panic)] // Test assertion
    pub fn single<A: std::fmt::Debug>(published: &[A]) -> &A {
        match published {
            [only] => only,
            other => panic!("Expected exactly one published action, found {other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tierhold_core::{SmallVec, smallvec};

    #[derive(Clone, Debug)]
    struct Stock {
        remaining: u32,
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum StockAction {
        Take(u32),
        Taken { remaining: u32 },
        Refused,
    }

    struct StockReducer;

    impl Reducer for StockReducer {
        type State = Stock;
        type Action = StockAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Stock,
            action: StockAction,
            _env: &(),
        ) -> SmallVec<[Effect<StockAction>; 4]> {
            match action {
                StockAction::Take(n) if n <= state.remaining => {
                    state.remaining -= n;
                    smallvec![Effect::Publish(StockAction::Taken {
                        remaining: state.remaining
                    })]
                }
                StockAction::Take(_) => smallvec![Effect::Publish(StockAction::Refused)],
                StockAction::Taken { .. } | StockAction::Refused => smallvec![Effect::None],
            }
        }
    }

    #[test]
    fn test_given_actions_are_not_collected() {
        ReducerTest::new(StockReducer)
            .with_env(())
            .given_state(Stock { remaining: 5 })
            .given_actions([StockAction::Take(2)])
            .when_action(StockAction::Take(3))
            .then_state(|state| assert_eq!(state.remaining, 0))
            .then_published(|published| {
                assert_eq!(published, [StockAction::Taken { remaining: 0 }]);
            })
            .run();
    }

    #[test]
    fn test_multiple_when_actions_collect_in_order() {
        ReducerTest::new(StockReducer)
            .with_env(())
            .given_state(Stock { remaining: 1 })
            .when_action(StockAction::Take(1))
            .when_action(StockAction::Take(1))
            .then_published(|published| {
                assert_eq!(
                    published,
                    [StockAction::Taken { remaining: 0 }, StockAction::Refused]
                );
            })
            .run();
    }

    #[test]
    fn test_assertions() {
        assertions::assert_no_effects::<StockAction>(&[Effect::None]);
        assertions::assert_no_effects::<StockAction>(&[]);
        assertions::assert_published_count(&[Effect::Publish(StockAction::Refused), Effect::None], 1);
        assert_eq!(assertions::single(&[StockAction::Refused]), &StockAction::Refused);
    }
}
