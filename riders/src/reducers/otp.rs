//! OTP challenge and booking authorization reducer.
//!
//! # Flow
//!
//! 1. Staff sends an OTP to the resolved rider's mobile
//! 2. The rider reads the code out; staff types it and submits it
//! 3. The OTP service decides; a match unlocks booking
//! 4. Staff authorizes the booking, handing the rider to the booking flow
//!
//! The desk never compares codes itself. A code echoed by the OTP service
//! is kept for display only when debug echo is enabled.

use super::{SEND_OTP_FAILED, VERIFY_OTP_FAILED};
use crate::actions::RiderAction;
use crate::environment::RiderDeskEnvironment;
use crate::providers::{BookingHandoff, CurrentStaff, OtpService, OtpVerdict, RiderDirectory};
use crate::state::{BookingRequest, Field, Notice, Operation, OtpStatus, ResolutionState};
use crate::validation;
use offline_desk_core::effect::Effect;
use offline_desk_core::reducer::Reducer;
use offline_desk_core::{async_effect, smallvec, SmallVec};
use tracing::{debug, error, info, warn};

/// OTP challenge reducer.
#[derive(Debug, Clone)]
pub struct OtpReducer<D, O, B, S> {
    /// Phantom data to hold type parameters.
    _phantom: std::marker::PhantomData<(D, O, B, S)>,
}

impl<D, O, B, S> OtpReducer<D, O, B, S> {
    /// Create a new OTP reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<D, O, B, S> Default for OtpReducer<D, O, B, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D, O, B, S> Reducer for OtpReducer<D, O, B, S>
where
    D: RiderDirectory + Clone + 'static,
    O: OtpService + Clone + 'static,
    B: BookingHandoff + Clone + 'static,
    S: CurrentStaff + Clone + 'static,
{
    type State = ResolutionState;
    type Action = RiderAction;
    type Environment = RiderDeskEnvironment<D, O, B, S>;

    #[allow(clippy::too_many_lines)]
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ═══════════════════════════════════════════════════════════════
            // SendOtp: challenge the resolved rider's phone
            // ═══════════════════════════════════════════════════════════════
            RiderAction::SendOtp => {
                if let Err(required) = state.precondition(Operation::SendOtp) {
                    error!(required, "SendOtp in invalid state, ignoring");
                    return SmallVec::new();
                }
                let Some(mobile) = state.resolved_rider.as_ref().map(|r| r.mobile.clone()) else {
                    return SmallVec::new();
                };

                if state.in_flight.send_otp {
                    debug!("OTP send already in flight, ignoring");
                    return SmallVec::new();
                }

                state.in_flight.send_otp = true;
                state.notice = None;

                let generation = state.generation;
                let otp = env.otp.clone();

                smallvec![async_effect! {
                    match otp.send_otp(&mobile).await {
                        Ok(dispatch) => Some(RiderAction::OtpDispatched {
                            generation,
                            echoed_code: dispatch.echoed_code,
                        }),
                        Err(e) => {
                            warn!(error = %e, mobile = %mobile.masked(), "OTP send failed");
                            Some(RiderAction::OtpDispatchFailed {
                                generation,
                                reason: e.user_message(SEND_OTP_FAILED),
                            })
                        },
                    }
                }]
            },

            // ═══════════════════════════════════════════════════════════════
            // OtpDispatched: code is on its way
            // ═══════════════════════════════════════════════════════════════
            RiderAction::OtpDispatched { echoed_code, .. } => {
                if !state.in_flight.send_otp {
                    error!("OTP dispatch arrived with no send in flight");
                    return SmallVec::new();
                }
                state.in_flight.send_otp = false;

                let echoed_code = match echoed_code {
                    Some(code) if env.config.otp_debug_echo => {
                        state.notice = Some(Notice::info(format!("OTP sent (debug code {code})")));
                        Some(code)
                    },
                    Some(_) => {
                        warn!("OTP service echoed the code, discarding it");
                        None
                    },
                    None => None,
                };

                state.otp = OtpStatus::Sent { echoed_code };
                state.pending_otp_input.clear();
                state.otp_sent_at = Some(env.clock.now());

                metrics::counter!("desk.otp.sent").increment(1);
                SmallVec::new()
            },

            // ═══════════════════════════════════════════════════════════════
            // OtpDispatchFailed: stay where we were, staff may retry
            // ═══════════════════════════════════════════════════════════════
            RiderAction::OtpDispatchFailed { reason, .. } => {
                if !state.in_flight.send_otp {
                    error!("OTP send failure arrived with no send in flight");
                    return SmallVec::new();
                }
                state.in_flight.send_otp = false;
                state.notice = Some(Notice::error(reason));
                SmallVec::new()
            },

            // ═══════════════════════════════════════════════════════════════
            // EnterOtp: record typed digits
            // ═══════════════════════════════════════════════════════════════
            RiderAction::EnterOtp { code } => {
                if let Err(required) = state.precondition(Operation::EnterOtp) {
                    error!(required, "EnterOtp in invalid state, ignoring");
                    return SmallVec::new();
                }

                state.pending_otp_input = validation::cap_otp(&code, env.config.otp_max_len);
                if state.field_error.as_ref().is_some_and(|e| e.field == Field::Otp) {
                    state.field_error = None;
                }
                SmallVec::new()
            },

            // ═══════════════════════════════════════════════════════════════
            // VerifyOtp: let the OTP service decide
            // ═══════════════════════════════════════════════════════════════
            RiderAction::VerifyOtp { code } => {
                if let Err(required) = state.precondition(Operation::VerifyOtp) {
                    error!(required, "VerifyOtp in invalid state, ignoring");
                    return SmallVec::new();
                }
                let Some(mobile) = state.resolved_rider.as_ref().map(|r| r.mobile.clone()) else {
                    return SmallVec::new();
                };

                if state.in_flight.verify_otp {
                    debug!("OTP verification already in flight, ignoring");
                    return SmallVec::new();
                }

                let code = match validation::otp_code(&code, env.config.otp_max_len) {
                    Ok(code) => code,
                    Err(field_error) => {
                        debug!(error = %field_error, "OTP rejected locally");
                        state.field_error = Some(field_error);
                        return SmallVec::new();
                    },
                };

                state.pending_otp_input.clone_from(&code);
                state.field_error = None;
                state.notice = None;
                state.in_flight.verify_otp = true;

                let generation = state.generation;
                let otp = env.otp.clone();

                smallvec![async_effect! {
                    match otp.verify_otp(&mobile, &code).await {
                        Ok(OtpVerdict::Match) => Some(RiderAction::OtpVerified { generation }),
                        Ok(OtpVerdict::Mismatch { message }) => {
                            Some(RiderAction::OtpRejected { generation, reason: message })
                        },
                        Err(e) => {
                            warn!(error = %e, mobile = %mobile.masked(), "OTP verification failed");
                            Some(RiderAction::OtpRejected {
                                generation,
                                reason: e.user_message(VERIFY_OTP_FAILED),
                            })
                        },
                    }
                }]
            },

            // ═══════════════════════════════════════════════════════════════
            // OtpVerified: booking unlocked
            // ═══════════════════════════════════════════════════════════════
            RiderAction::OtpVerified { .. } => {
                if !state.in_flight.verify_otp {
                    error!("OTP verdict arrived with no verification in flight");
                    return SmallVec::new();
                }
                state.in_flight.verify_otp = false;
                state.otp = OtpStatus::Verified;

                metrics::counter!("desk.otp.verified").increment(1);
                SmallVec::new()
            },

            // ═══════════════════════════════════════════════════════════════
            // OtpRejected: still Sent, staff may retry without re-sending
            // ═══════════════════════════════════════════════════════════════
            RiderAction::OtpRejected { reason, .. } => {
                if !state.in_flight.verify_otp {
                    error!("OTP verdict arrived with no verification in flight");
                    return SmallVec::new();
                }
                state.in_flight.verify_otp = false;
                state.notice = Some(Notice::error(reason));
                SmallVec::new()
            },

            // ═══════════════════════════════════════════════════════════════
            // AuthorizeBooking: hand the rider over, once
            // ═══════════════════════════════════════════════════════════════
            RiderAction::AuthorizeBooking => {
                if let Err(required) = state.precondition(Operation::AuthorizeBooking) {
                    error!(required, "AuthorizeBooking in invalid state, ignoring");
                    return SmallVec::new();
                }
                if state.authorization.is_some() {
                    debug!("Booking already authorized, ignoring");
                    return SmallVec::new();
                }
                let Some(rider) = state.resolved_rider.as_ref() else {
                    return SmallVec::new();
                };

                let request = BookingRequest {
                    rider_id: rider.id.clone(),
                    rider_name: rider.name.clone(),
                    staff_id: env.staff.current_staff().map(|staff| staff.id),
                    authorized_at: env.clock.now(),
                };
                info!(rider_id = %request.rider_id, "Booking authorized");
                metrics::counter!("desk.booking.authorized").increment(1);

                state.authorization = Some(request.clone());
                let booking = env.booking.clone();

                smallvec![async_effect! {
                    booking.begin_booking(request).await;
                    None
                }]
            },

            // Not handled by this reducer
            _ => SmallVec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{MockBookingHandoff, MockOtpService, MockRiderDirectory, StaticStaffSession};
    use crate::state::{Gender, Mobile, NoticeLevel, Phase, RiderId, RiderRecord, StaffMember};
    use offline_desk_testing::{ReducerTest, assertions, run_effects, test_clock};
    use offline_desk_core::environment::Clock;
    use std::sync::Arc;

    type Env = RiderDeskEnvironment<MockRiderDirectory, MockOtpService, MockBookingHandoff, StaticStaffSession>;
    type TestReducer = OtpReducer<MockRiderDirectory, MockOtpService, MockBookingHandoff, StaticStaffSession>;

    fn env_with(otp: MockOtpService, booking: MockBookingHandoff) -> Env {
        RiderDeskEnvironment::new(
            MockRiderDirectory::new(),
            otp,
            booking,
            StaticStaffSession::signed_in(StaffMember {
                id: "staff-1".into(),
                name: Some("Meera".into()),
                email: None,
            }),
            Arc::new(test_clock()),
        )
    }

    fn env() -> Env {
        env_with(MockOtpService::new(), MockBookingHandoff::new())
    }

    fn found_state() -> ResolutionState {
        let mut state = ResolutionState::default();
        state.begin_search(Mobile::from_canonical("9876543210"));
        state.in_flight.search = false;
        state.resolve_rider(RiderRecord {
            id: RiderId("r-1".into()),
            mobile: Mobile::from_canonical("9876543210"),
            name: "Asha".into(),
            gender: Some(Gender::Female),
            email: None,
            referral_code_used: None,
        });
        state
    }

    fn sent_state() -> ResolutionState {
        let mut state = found_state();
        state.otp = OtpStatus::Sent { echoed_code: None };
        state
    }

    fn verified_state() -> ResolutionState {
        let mut state = found_state();
        state.otp = OtpStatus::Verified;
        state
    }

    #[test]
    fn send_without_rider_is_ignored() {
        let otp = MockOtpService::new();
        let calls = otp.clone();

        ReducerTest::new(TestReducer::new())
            .with_env(env_with(otp, MockBookingHandoff::new()))
            .given_state(ResolutionState::default())
            .when_action(RiderAction::SendOtp)
            .then_state(|s| assert_eq!(s.phase(), Phase::Idle))
            .then_effects(assertions::assert_no_effects)
            .run();

        assert_eq!(calls.send_calls(), 0);
    }

    #[test]
    fn send_marks_in_flight_once() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(found_state())
            .given_actions([RiderAction::SendOtp])
            .when_action(RiderAction::SendOtp)
            .then_state(|s| assert_eq!(s.phase(), Phase::OtpSending))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[tokio::test]
    async fn send_effect_asks_service_for_rider_mobile() {
        let otp = MockOtpService::new();
        let env = env_with(otp.clone(), MockBookingHandoff::new());
        let mut state = found_state();

        let effects = TestReducer::new().reduce(&mut state, RiderAction::SendOtp, &env);
        let produced = run_effects(effects).await;

        assert_eq!(
            produced,
            vec![RiderAction::OtpDispatched { generation: 1, echoed_code: None }]
        );
        assert_eq!(otp.sent_to(), vec![Mobile::from_canonical("9876543210")]);
    }

    #[test]
    fn dispatched_moves_to_sent_and_stamps_time() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(found_state())
            .given_actions([RiderAction::SendOtp])
            .when_action(RiderAction::OtpDispatched { generation: 1, echoed_code: None })
            .then_state(|s| {
                assert_eq!(s.phase(), Phase::OtpSent);
                assert_eq!(s.otp_sent_at, Some(test_clock().now()));
            })
            .run();
    }

    #[test]
    fn echoed_code_discarded_by_default() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(found_state())
            .given_actions([RiderAction::SendOtp])
            .when_action(RiderAction::OtpDispatched {
                generation: 1,
                echoed_code: Some("482913".into()),
            })
            .then_state(|s| {
                assert_eq!(s.otp, OtpStatus::Sent { echoed_code: None });
                assert!(s.pending_otp_input.is_empty());
                assert!(s.notice.is_none());
            })
            .run();
    }

    #[test]
    fn echoed_code_kept_for_display_when_enabled() {
        let env = env().with_config(crate::config::FlowConfig::default().with_otp_debug_echo(true));

        ReducerTest::new(TestReducer::new())
            .with_env(env)
            .given_state(found_state())
            .given_actions([RiderAction::SendOtp])
            .when_action(RiderAction::OtpDispatched {
                generation: 1,
                echoed_code: Some("482913".into()),
            })
            .then_state(|s| {
                assert_eq!(s.otp, OtpStatus::Sent { echoed_code: Some("482913".into()) });
                assert!(s.pending_otp_input.is_empty());
                assert_eq!(s.notice.as_ref().map(|n| n.level), Some(NoticeLevel::Info));
            })
            .run();
    }

    #[test]
    fn dispatch_failure_keeps_not_sent() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(found_state())
            .given_actions([RiderAction::SendOtp])
            .when_action(RiderAction::OtpDispatchFailed {
                generation: 1,
                reason: SEND_OTP_FAILED.into(),
            })
            .then_state(|s| {
                assert_eq!(s.phase(), Phase::Found);
                assert_eq!(s.notice, Some(Notice::error(SEND_OTP_FAILED)));
            })
            .run();
    }

    #[test]
    fn enter_otp_caps_length() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(sent_state())
            .when_action(RiderAction::EnterOtp { code: "123456789".into() })
            .then_state(|s| assert_eq!(s.pending_otp_input, "123456"))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn verify_before_send_is_ignored() {
        let otp = MockOtpService::new();
        let calls = otp.clone();

        ReducerTest::new(TestReducer::new())
            .with_env(env_with(otp, MockBookingHandoff::new()))
            .given_state(found_state())
            .when_action(RiderAction::VerifyOtp { code: "123456".into() })
            .then_state(|s| assert_eq!(s.phase(), Phase::Found))
            .then_effects(assertions::assert_no_effects)
            .run();

        assert_eq!(calls.verify_calls(), 0);
    }

    #[test]
    fn empty_code_rejected_locally() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(sent_state())
            .when_action(RiderAction::VerifyOtp { code: "   ".into() })
            .then_state(|s| {
                assert_eq!(s.phase(), Phase::OtpSent);
                assert_eq!(s.field_error.as_ref().map(|e| e.field), Some(Field::Otp));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[tokio::test]
    async fn verify_effect_maps_mismatch_to_rejection() {
        let otp = MockOtpService::new().with_code("111111");
        let env = env_with(otp, MockBookingHandoff::new());
        let mut state = sent_state();

        let effects = TestReducer::new().reduce(
            &mut state,
            RiderAction::VerifyOtp { code: "222222".into() },
            &env,
        );
        assert_eq!(state.phase(), Phase::OtpVerifying);
        assert_eq!(state.pending_otp_input, "222222");

        let produced = run_effects(effects).await;
        assert_eq!(
            produced,
            vec![RiderAction::OtpRejected { generation: 1, reason: "Invalid OTP".into() }]
        );
    }

    #[test]
    fn rejection_keeps_sent_for_retry() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(sent_state())
            .given_actions([RiderAction::VerifyOtp { code: "222222".into() }])
            .when_action(RiderAction::OtpRejected { generation: 1, reason: "Invalid OTP".into() })
            .then_state(|s| {
                assert_eq!(s.phase(), Phase::OtpSent);
                assert_eq!(s.notice, Some(Notice::error("Invalid OTP")));
            })
            .run();
    }

    #[test]
    fn verified_unlocks_booking() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(sent_state())
            .given_actions([RiderAction::VerifyOtp { code: "123456".into() }])
            .when_action(RiderAction::OtpVerified { generation: 1 })
            .then_state(|s| {
                assert_eq!(s.phase(), Phase::OtpVerified);
                assert!(s.precondition(Operation::AuthorizeBooking).is_ok());
            })
            .run();
    }

    #[test]
    fn authorize_requires_verified_otp() {
        ReducerTest::new(TestReducer::new())
            .with_env(env())
            .given_state(sent_state())
            .when_action(RiderAction::AuthorizeBooking)
            .then_state(|s| assert!(s.authorization.is_none()))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[tokio::test]
    async fn authorize_hands_rider_to_booking_once() {
        let booking = MockBookingHandoff::new();
        let env = env_with(MockOtpService::new(), booking.clone());
        let reducer = TestReducer::new();
        let mut state = verified_state();

        let effects = reducer.reduce(&mut state, RiderAction::AuthorizeBooking, &env);
        assert!(run_effects(effects).await.is_empty());
        assert_eq!(state.phase(), Phase::Authorized);

        let again = reducer.reduce(&mut state, RiderAction::AuthorizeBooking, &env);
        assert!(again.is_empty());

        let requests = booking.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].rider_id, RiderId("r-1".into()));
        assert_eq!(requests[0].rider_name, "Asha");
        assert_eq!(requests[0].staff_id.as_deref(), Some("staff-1"));
        assert_eq!(state.authorization.as_ref(), Some(&requests[0]));
    }
}
