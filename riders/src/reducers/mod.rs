//! Rider desk reducers.
//!
//! Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
//!
//! [`RiderDeskReducer`] drops answers from superseded searches and routes
//! the rest to [`SearchReducer`] (lookup and onboarding) or [`OtpReducer`]
//! (OTP challenge and booking authorization).

pub mod otp;
pub mod search;

use crate::actions::RiderAction;
use crate::environment::RiderDeskEnvironment;
use crate::providers::{BookingHandoff, CurrentStaff, OtpService, RiderDirectory};
use crate::state::ResolutionState;
use offline_desk_core::{effect::Effect, reducer::Reducer, SmallVec};
use tracing::debug;

// Re-export
pub use otp::OtpReducer;
pub use search::SearchReducer;

/// Notice shown when the directory cannot answer a lookup.
pub const SEARCH_FAILED: &str = "Server error while searching rider";

/// Fallback notice when profile creation fails without a reason.
pub const CREATE_FAILED: &str = "Server error while creating rider";

/// Fallback notice when an OTP cannot be sent.
pub const SEND_OTP_FAILED: &str = "Error sending OTP";

/// Fallback notice when an OTP cannot be checked.
pub const VERIFY_OTP_FAILED: &str = "Error verifying OTP";

/// Unified rider desk reducer.
#[derive(Clone, Debug)]
pub struct RiderDeskReducer<D, O, B, S>
where
    D: RiderDirectory + Clone + 'static,
    O: OtpService + Clone + 'static,
    B: BookingHandoff + Clone + 'static,
    S: CurrentStaff + Clone + 'static,
{
    search: SearchReducer<D, O, B, S>,
    otp: OtpReducer<D, O, B, S>,
}

impl<D, O, B, S> RiderDeskReducer<D, O, B, S>
where
    D: RiderDirectory + Clone + 'static,
    O: OtpService + Clone + 'static,
    B: BookingHandoff + Clone + 'static,
    S: CurrentStaff + Clone + 'static,
{
    /// Create a new rider desk reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            search: SearchReducer::new(),
            otp: OtpReducer::new(),
        }
    }
}

impl<D, O, B, S> Default for RiderDeskReducer<D, O, B, S>
where
    D: RiderDirectory + Clone + 'static,
    O: OtpService + Clone + 'static,
    B: BookingHandoff + Clone + 'static,
    S: CurrentStaff + Clone + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<D, O, B, S> Reducer for RiderDeskReducer<D, O, B, S>
where
    D: RiderDirectory + Clone + 'static,
    O: OtpService + Clone + 'static,
    B: BookingHandoff + Clone + 'static,
    S: CurrentStaff + Clone + 'static,
{
    type State = ResolutionState;
    type Action = RiderAction;
    type Environment = RiderDeskEnvironment<D, O, B, S>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        if let Some(generation) = action.generation() {
            if generation != state.generation {
                debug!(
                    generation,
                    current = state.generation,
                    "Discarding answer from a superseded search"
                );
                metrics::counter!("desk.stale_responses.discarded").increment(1);
                return SmallVec::new();
            }
        }

        match action {
            // Lookup and onboarding
            RiderAction::SearchRider { .. }
            | RiderAction::LookupCompleted { .. }
            | RiderAction::CreateRider { .. }
            | RiderAction::RiderCreated { .. }
            | RiderAction::RiderCreationFailed { .. } => self.search.reduce(state, action, env),

            // OTP challenge and handoff
            RiderAction::SendOtp
            | RiderAction::OtpDispatched { .. }
            | RiderAction::OtpDispatchFailed { .. }
            | RiderAction::EnterOtp { .. }
            | RiderAction::VerifyOtp { .. }
            | RiderAction::OtpVerified { .. }
            | RiderAction::OtpRejected { .. }
            | RiderAction::AuthorizeBooking => self.otp.reduce(state, action, env),

            RiderAction::DismissNotice => {
                state.notice = None;
                SmallVec::new()
            },
        }
    }
}
