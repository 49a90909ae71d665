//! Rider resolution flow.
//!
//! [`RiderResolutionFlow`] is what a staff UI talks to. It wraps a
//! [`Store`] running the [`RiderDeskReducer`] and offers one async method
//! per staff operation. Each method:
//!
//! 1. Checks the operation's precondition and fails with
//!    [`FlowError::InvalidState`] without touching any collaborator
//! 2. Dispatches the command (the reducer records field errors and ignores
//!    duplicates)
//! 3. Waits, up to the configured settle timeout, for the collaborator
//!    call it started to be folded back into the session
//! 4. Returns the settled snapshot, [`FlowError::Validation`] when the
//!    input was rejected locally, or [`FlowError::Superseded`] when a new
//!    search reset the session in the meantime
//!
//! Collaborator failures are not errors here; they show up as the
//! snapshot's notice.

use crate::actions::RiderAction;
use crate::config::FlowConfig;
use crate::environment::RiderDeskEnvironment;
use crate::error::{FlowError, Result};
use crate::providers::{BookingHandoff, CurrentStaff, OtpService, RiderDirectory};
use crate::reducers::RiderDeskReducer;
use crate::state::{FieldError, Mobile, Operation, ResolutionState, RiderProfileDraft};
use crate::validation;
use offline_desk_runtime::Store;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::warn;

/// Store type driving a rider desk.
pub type DeskStore<D, O, B, S> = Store<
    ResolutionState,
    RiderAction,
    RiderDeskEnvironment<D, O, B, S>,
    RiderDeskReducer<D, O, B, S>,
>;

/// Staff-facing entry point of the rider desk.
///
/// # Example
///
/// ```ignore
/// let flow = RiderResolutionFlow::new(environment);
///
/// let snapshot = flow.search_rider("98765 43210").await?;
/// if snapshot.resolved_rider.is_some() {
///     flow.send_otp().await?;
///     flow.verify_otp("482913").await?;
///     let snapshot = flow.authorize_booking().await?;
///     assert!(snapshot.authorization.is_some());
/// }
/// ```
pub struct RiderResolutionFlow<D, O, B, S>
where
    D: RiderDirectory + Clone + 'static,
    O: OtpService + Clone + 'static,
    B: BookingHandoff + Clone + 'static,
    S: CurrentStaff + Clone + 'static,
{
    store: DeskStore<D, O, B, S>,
    config: FlowConfig,
}

impl<D, O, B, S> RiderResolutionFlow<D, O, B, S>
where
    D: RiderDirectory + Clone + 'static,
    O: OtpService + Clone + 'static,
    B: BookingHandoff + Clone + 'static,
    S: CurrentStaff + Clone + 'static,
{
    /// Start an idle desk session.
    #[must_use]
    pub fn new(environment: RiderDeskEnvironment<D, O, B, S>) -> Self {
        let config = environment.config;
        Self {
            store: Store::new(ResolutionState::default(), RiderDeskReducer::new(), environment),
            config,
        }
    }

    /// Search a rider by mobile number.
    ///
    /// Resets the session. A miss or a directory failure leaves the create
    /// form open with the mobile pre-filled.
    ///
    /// # Errors
    ///
    /// - [`FlowError::Validation`]: the mobile is empty or too short
    /// - [`FlowError::Store`]: the desk is shutting down, or the directory
    ///   did not answer within the settle timeout
    #[tracing::instrument(skip(self, mobile), fields(mobile = %masked_input(mobile)))]
    pub async fn search_rider(&self, mobile: &str) -> Result<ResolutionState> {
        let checked = validation::search_mobile(mobile, self.config.min_mobile_digits);
        let snapshot = self
            .dispatch(RiderAction::SearchRider { mobile: mobile.to_string() })
            .await?;
        accepted(checked.map(|_| ()), snapshot)
    }

    /// Create a rider profile after a miss.
    ///
    /// # Errors
    ///
    /// - [`FlowError::InvalidState`]: the last search did not miss
    /// - [`FlowError::Validation`]: a required field is missing
    /// - [`FlowError::Superseded`]: a new search started meanwhile
    /// - [`FlowError::Store`]: the desk is shutting down, or the directory
    ///   did not answer within the settle timeout
    #[tracing::instrument(skip(self, draft))]
    pub async fn create_rider(&self, draft: RiderProfileDraft) -> Result<ResolutionState> {
        let generation = self.require(Operation::CreateRider).await?;

        let checked = validation::new_rider(&draft, self.config.min_mobile_digits);
        let snapshot = self
            .dispatch_in(generation, Operation::CreateRider, RiderAction::CreateRider { draft })
            .await?;
        accepted(checked.map(|_| ()), snapshot)
    }

    /// Send an OTP to the resolved rider.
    ///
    /// # Errors
    ///
    /// - [`FlowError::InvalidState`]: no rider is resolved
    /// - [`FlowError::Superseded`]: a new search started meanwhile
    /// - [`FlowError::Store`]: the desk is shutting down, or the OTP service
    ///   did not answer within the settle timeout
    #[tracing::instrument(skip(self))]
    pub async fn send_otp(&self) -> Result<ResolutionState> {
        let generation = self.require(Operation::SendOtp).await?;
        self.dispatch_in(generation, Operation::SendOtp, RiderAction::SendOtp).await
    }

    /// Record the digits typed so far (capped at the OTP length).
    ///
    /// # Errors
    ///
    /// - [`FlowError::InvalidState`]: no OTP has been sent
    /// - [`FlowError::Superseded`]: a new search started meanwhile
    /// - [`FlowError::Store`]: the desk is shutting down
    #[tracing::instrument(skip(self, code))]
    pub async fn enter_otp(&self, code: &str) -> Result<ResolutionState> {
        let generation = self.require(Operation::EnterOtp).await?;
        self.dispatch_in(generation, Operation::EnterOtp, RiderAction::EnterOtp {
            code: code.to_string(),
        })
        .await
    }

    /// Verify the code read out by the rider.
    ///
    /// A wrong code is not an error: the snapshot stays at OTP sent and
    /// carries the service's message.
    ///
    /// # Errors
    ///
    /// - [`FlowError::InvalidState`]: no OTP has been sent
    /// - [`FlowError::Validation`]: the code is empty
    /// - [`FlowError::Superseded`]: a new search started meanwhile
    /// - [`FlowError::Store`]: the desk is shutting down, or the OTP service
    ///   did not answer within the settle timeout
    #[tracing::instrument(skip(self, code))]
    pub async fn verify_otp(&self, code: &str) -> Result<ResolutionState> {
        let generation = self.require(Operation::VerifyOtp).await?;

        let checked = validation::otp_code(code, self.config.otp_max_len);
        let snapshot = self
            .dispatch_in(generation, Operation::VerifyOtp, RiderAction::VerifyOtp {
                code: code.to_string(),
            })
            .await?;
        accepted(checked.map(|_| ()), snapshot)
    }

    /// Hand the verified rider over to booking.
    ///
    /// Calling it again after authorization returns the same snapshot.
    ///
    /// # Errors
    ///
    /// - [`FlowError::InvalidState`]: the OTP is not verified
    /// - [`FlowError::Superseded`]: a new search started meanwhile
    /// - [`FlowError::Store`]: the desk is shutting down
    #[tracing::instrument(skip(self))]
    pub async fn authorize_booking(&self) -> Result<ResolutionState> {
        let generation = self.require(Operation::AuthorizeBooking).await?;
        self.dispatch_in(generation, Operation::AuthorizeBooking, RiderAction::AuthorizeBooking)
            .await
    }

    /// Clear the current notice.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Store`] if the desk is shutting down.
    pub async fn dismiss_notice(&self) -> Result<ResolutionState> {
        self.dispatch(RiderAction::DismissNotice).await
    }

    /// Current session snapshot.
    pub async fn snapshot(&self) -> ResolutionState {
        self.store.state(ResolutionState::clone).await
    }

    /// Subscribe to collaborator answers as they are applied.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RiderAction> {
        self.store.subscribe_actions()
    }

    /// Stop accepting operations and wait for outstanding calls.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Store`] if calls are still running at `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<()> {
        self.store.shutdown(timeout).await.map_err(FlowError::from)
    }

    /// Check the precondition and return the generation it held in.
    async fn require(&self, operation: Operation) -> Result<u64> {
        self.store
            .state(|state| state.precondition(operation).map(|()| state.generation))
            .await
            .map_err(|required| {
                warn!(%operation, required, "Operation not allowed in current state");
                FlowError::InvalidState { operation, required }
            })
    }

    async fn dispatch(&self, action: RiderAction) -> Result<ResolutionState> {
        let mut handle = self.store.send(action).await?;
        if let Err(e) = handle.wait_with_timeout(self.config.settle_timeout).await {
            warn!(pending = handle.pending(), "Collaborator answer did not settle in time");
            return Err(e.into());
        }
        Ok(self.snapshot().await)
    }

    /// [`Self::dispatch`] for an operation bound to the session `generation`.
    async fn dispatch_in(
        &self,
        generation: u64,
        operation: Operation,
        action: RiderAction,
    ) -> Result<ResolutionState> {
        let snapshot = self.dispatch(action).await?;
        if snapshot.generation != generation {
            warn!(%operation, generation, current = snapshot.generation, "Operation superseded by a new search");
            return Err(FlowError::Superseded { operation });
        }
        Ok(snapshot)
    }
}

fn accepted(checked: std::result::Result<(), FieldError>, snapshot: ResolutionState) -> Result<ResolutionState> {
    checked.map(|()| snapshot).map_err(FlowError::Validation)
}

fn masked_input(raw: &str) -> String {
    Mobile::parse_with_min(raw, 1).map_or_else(|_| "<invalid>".to_string(), |mobile| mobile.masked())
}
