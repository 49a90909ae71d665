//! Ergonomic testing utilities for reducers
//!
//! This module provides a fluent API for testing reducers with readable Given-When-Then syntax.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use offline_desk_core::{effect::Effect, reducer::Reducer};

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for effect assertion functions
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// `given_actions` replays earlier actions (discarding their effects) so a
/// test can reach a mid-workflow state through the reducer itself instead
/// of hand-building it.
///
/// # Example
///
/// ```ignore
/// use offline_desk_testing::ReducerTest;
///
/// ReducerTest::new(RiderDeskReducer::new())
///     .with_env(test_environment())
///     .given_state(ResolutionState::default())
///     .given_actions([search_action, found_action])
///     .when_action(RiderAction::SendOtp)
///     .then_state(|state| {
///         assert_eq!(state.phase(), Phase::OtpSending);
///     })
///     .then_effects(|effects| {
///         assert_eq!(effects.len(), 1);
///     })
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    history: Vec<A>,
    action: Option<A>,
    state_assertions: Vec<StateAssertion<S>>,
    effect_assertions: Vec<EffectAssertion<A>>,
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
            history: Vec::new(),
            action: None,
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
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

    /// Replay actions before the action under test (Given)
    #[must_use]
    pub fn given_actions(mut self, actions: impl IntoIterator<Item = A>) -> Self {
        self.history.extend(actions);
        self
    }

    /// Set the action to test (When)
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.action = Some(action);
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

    /// Add an assertion about the resulting effects (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state, action, or environment is not set,
    /// or if any assertions fail.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");

        let action = self.action.expect("Action must be set with when_action()");

        let env = self
            .environment
            .expect("Environment must be set with with_env()");

        for earlier in self.history {
            let _ = self.reducer.reduce(&mut state, earlier, &env);
        }

        // Execute reducer
        let effects = self.reducer.reduce(&mut state, action, &env);

        // Run state assertions
        for assertion in self.state_assertions {
            assertion(&state);
        }

        // Run effect assertions
        for assertion in self.effect_assertions {
            assertion(&effects);
        }
    }
}

/// Run effects to completion, in order, and collect the actions they produce
///
/// Lets a reducer test check what a collaborator call feeds back without
/// spinning up a `Store`.
pub async fn run_effects<A>(effects: impl IntoIterator<Item = Effect<A>>) -> Vec<A> {
    let mut produced = Vec::new();
    for effect in effects {
        if let Effect::Future(fut) = effect {
            if let Some(action) = fut.await {
                produced.push(action);
            }
        }
    }
    produced
}

/// Helper assertions for effects
pub mod assertions {
    use offline_desk_core::effect::Effect;

    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if effects is not empty.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(Effect::is_none),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Assert the number of effects
    ///
    /// # Panics
    ///
    /// Panics if the number of effects doesn't match expected.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "Expected {} effects, but found {}",
            expected,
            effects.len()
        );
    }

    /// Assert that effects contain at least one Future effect
    ///
    /// # Panics
    ///
    /// Panics if no Future effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(|e| matches!(e, Effect::Future(_))),
            "Expected at least one Future effect, but none found"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use offline_desk_core::effect::Effect;
    use offline_desk_core::reducer::Reducer;

    #[derive(Clone, Debug, Default)]
    struct LookupState {
        searches: u32,
        last: Option<String>,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum LookupAction {
        Search(String),
        Found(String),
        Clear,
    }

    struct LookupReducer;

    struct LookupEnv;

    impl Reducer for LookupReducer {
        type State = LookupState;
        type Action = LookupAction;
        type Environment = LookupEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> smallvec::SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                LookupAction::Search(mobile) => {
                    state.searches += 1;
                    smallvec::smallvec![Effect::Future(Box::pin(async move {
                        Some(LookupAction::Found(mobile))
                    }))]
                },
                LookupAction::Found(mobile) => {
                    state.last = Some(mobile);
                    smallvec::smallvec![Effect::None]
                },
                LookupAction::Clear => {
                    *state = LookupState::default();
                    smallvec::SmallVec::new()
                },
            }
        }
    }

    #[test]
    fn test_reducer_test_search() {
        ReducerTest::new(LookupReducer)
            .with_env(LookupEnv)
            .given_state(LookupState::default())
            .when_action(LookupAction::Search("9876543210".into()))
            .then_state(|state| {
                assert_eq!(state.searches, 1);
                assert!(state.last.is_none());
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn test_given_actions_are_replayed() {
        ReducerTest::new(LookupReducer)
            .with_env(LookupEnv)
            .given_state(LookupState::default())
            .given_actions([
                LookupAction::Search("1".into()),
                LookupAction::Found("1".into()),
            ])
            .when_action(LookupAction::Search("2".into()))
            .then_state(|state| {
                assert_eq!(state.searches, 2);
                assert_eq!(state.last.as_deref(), Some("1"));
            })
            .run();
    }

    #[test]
    fn test_assertions_no_effects() {
        assertions::assert_no_effects::<LookupAction>(&[Effect::None]);
        assertions::assert_no_effects::<LookupAction>(&[]);
    }

    #[tokio::test]
    async fn test_run_effects_collects_feedback() {
        let effects = LookupReducer.reduce(
            &mut LookupState::default(),
            LookupAction::Search("5".into()),
            &LookupEnv,
        );

        let produced = run_effects(effects).await;
        assert_eq!(produced, vec![LookupAction::Found("5".into())]);

        let none = LookupReducer.reduce(&mut LookupState::default(), LookupAction::Clear, &LookupEnv);
        assert!(run_effects(none).await.is_empty());
    }
}
