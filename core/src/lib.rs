//! # Offline Desk Core
//!
//! Core traits and types for the Offline Desk staff workflows.
//!
//! Every staff-facing workflow (rider lookup, onboarding, OTP challenge) is
//! modelled as a reducer over an explicit state value. Reducers never perform
//! I/O themselves: they describe it as [`effect::Effect`] values that the
//! runtime executes, and the results come back as new actions.
//!
//! ## Core Concepts
//!
//! - **State**: The session snapshot a workflow owns
//! - **Action**: Every input to a reducer (staff commands and collaborator results)
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Description of a side effect, executed by the runtime
//! - **Environment**: Collaborators injected through traits
//!
//! ## Example
//!
//! ```ignore
//! use offline_desk_core::*;
//!
//! impl Reducer for LookupReducer {
//!     type State = LookupState;
//!     type Action = LookupAction;
//!     type Environment = LookupEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut LookupState,
//!         action: LookupAction,
//!         env: &LookupEnvironment,
//!     ) -> SmallVec<[Effect<LookupAction>; 4]> {
//!         match action {
//!             LookupAction::Search { mobile } => {
//!                 state.searching = true;
//!                 let directory = env.directory.clone();
//!                 smallvec![async_effect! {
//!                     let result = directory.lookup(&mobile).await;
//!                     Some(LookupAction::Completed { result })
//!                 }]
//!             }
//!             LookupAction::Completed { result } => {
//!                 state.searching = false;
//!                 state.result = Some(result);
//!                 SmallVec::new()
//!             }
//!         }
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{smallvec, SmallVec};

/// Declarative macros for building effects
pub mod effect_macros;

/// Reducer module - The core trait for workflow logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
/// They hold every guard and transition rule of a workflow and are
/// deterministic and testable without a runtime.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for workflow logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected collaborators this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected collaborators
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action against the current state
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        ///
        /// Most actions produce zero or one effect, so the result is
        /// stack-allocated for up to four effects.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects are values, not execution. A reducer returns them and the runtime
/// decides when and where they run.
pub mod effect {
    use futures::future::BoxFuture;

    /// Effect type - describes a side effect to be executed
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(BoxFuture<'static, Option<Action>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Returns `true` for the no-op effect
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}

/// Environment module - Dependency injection traits
///
/// Collaborators that every workflow may need live here; workflow-specific
/// collaborators (directories, OTP services) are defined next to the
/// workflow that consumes them.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time from the operating system
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
