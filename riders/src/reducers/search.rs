//! Rider lookup and onboarding reducer.
//!
//! # Flow
//!
//! 1. Staff searches a mobile number; the session is reset and a new
//!    generation starts
//! 2. The directory answers: found resolves the rider, a miss (or a
//!    failure) offers the create form pre-filled with the mobile
//! 3. Staff submits the form; a created rider resolves the session exactly
//!    like a search hit

use super::{CREATE_FAILED, SEARCH_FAILED};
use crate::actions::RiderAction;
use crate::environment::RiderDeskEnvironment;
use crate::providers::{BookingHandoff, CurrentStaff, LookupResult, OtpService, RiderDirectory};
use crate::state::{Notice, Operation, ResolutionState};
use crate::validation;
use offline_desk_core::effect::Effect;
use offline_desk_core::reducer::Reducer;
use offline_desk_core::{async_effect, smallvec, SmallVec};
use tracing::{debug, error, warn};

/// Lookup and onboarding reducer.
#[derive(Debug, Clone)]
pub struct SearchReducer<D, O, B, S> {
    /// Phantom data to hold type parameters.
    _phantom: std::marker::PhantomData<(D, O, B, S)>,
}

impl<D, O, B, S> SearchReducer<D, O, B, S> {
    /// Create a new search reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<D, O, B, S> Default for SearchReducer<D, O, B, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D, O, B, S> Reducer for SearchReducer<D, O, B, S>
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
            // SearchRider: reset the session and look the mobile up
            // ═══════════════════════════════════════════════════════════════
            RiderAction::SearchRider { mobile } => {
                let mobile = match validation::search_mobile(&mobile, env.config.min_mobile_digits) {
                    Ok(mobile) => mobile,
                    Err(field_error) => {
                        debug!(error = %field_error, "Search rejected locally");
                        state.field_error = Some(field_error);
                        return SmallVec::new();
                    },
                };

                if state.in_flight.search {
                    if state.queried_mobile.as_ref() == Some(&mobile) {
                        debug!(mobile = %mobile.masked(), "Search already in flight, ignoring");
                        return SmallVec::new();
                    }
                    debug!(mobile = %mobile.masked(), "Superseding in-flight search");
                }

                state.begin_search(mobile.clone());
                let generation = state.generation;
                let directory = env.directory.clone();

                smallvec![async_effect! {
                    let result = directory.lookup_by_mobile(&mobile).await;
                    Some(RiderAction::LookupCompleted { generation, result })
                }]
            },

            // ═══════════════════════════════════════════════════════════════
            // LookupCompleted: exactly one outcome becomes active
            // ═══════════════════════════════════════════════════════════════
            RiderAction::LookupCompleted { result, .. } => {
                if !state.in_flight.search {
                    error!("Lookup answer arrived with no search in flight");
                    return SmallVec::new();
                }
                state.in_flight.search = false;

                metrics::counter!("desk.lookup.outcome", "outcome" => result.outcome()).increment(1);

                match result {
                    LookupResult::Found(rider) => {
                        debug!(rider_id = %rider.id, "Rider found");
                        state.resolve_rider(rider);
                    },
                    LookupResult::NotFound => {
                        debug!("No rider for mobile, offering create form");
                        state.offer_creation();
                    },
                    LookupResult::Failed { reason } => {
                        warn!(reason = %reason, "Rider lookup failed, offering create form");
                        state.offer_creation();
                        state.notice = Some(Notice::warning(SEARCH_FAILED));
                    },
                }

                SmallVec::new()
            },

            // ═══════════════════════════════════════════════════════════════
            // CreateRider: validate the form and ask the directory
            // ═══════════════════════════════════════════════════════════════
            RiderAction::CreateRider { draft } => {
                if let Err(required) = state.precondition(Operation::CreateRider) {
                    error!(required, "CreateRider in invalid state, ignoring");
                    return SmallVec::new();
                }

                if state.in_flight.create {
                    debug!("Creation already in flight, ignoring");
                    return SmallVec::new();
                }

                let profile = match validation::new_rider(&draft, env.config.min_mobile_digits) {
                    Ok(profile) => profile,
                    Err(field_error) => {
                        debug!(error = %field_error, "Create form rejected locally");
                        state.field_error = Some(field_error);
                        state.create_form = Some(draft);
                        return SmallVec::new();
                    },
                };

                state.field_error = None;
                state.notice = None;
                state.create_form = Some(draft);
                state.in_flight.create = true;

                let generation = state.generation;
                let directory = env.directory.clone();

                smallvec![async_effect! {
                    match directory.create_rider(&profile).await {
                        Ok(rider) => Some(RiderAction::RiderCreated { generation, rider }),
                        Err(e) => {
                            warn!(error = %e, mobile = %profile.mobile.masked(), "Rider creation failed");
                            Some(RiderAction::RiderCreationFailed {
                                generation,
                                reason: e.user_message(CREATE_FAILED),
                            })
                        },
                    }
                }]
            },

            // ═══════════════════════════════════════════════════════════════
            // RiderCreated: same state as a search hit
            // ═══════════════════════════════════════════════════════════════
            RiderAction::RiderCreated { rider, .. } => {
                if !state.in_flight.create {
                    error!("Created rider arrived with no creation in flight");
                    return SmallVec::new();
                }
                state.in_flight.create = false;

                debug!(rider_id = %rider.id, "Rider created");
                state.resolve_rider(rider);
                SmallVec::new()
            },

            // ═══════════════════════════════════════════════════════════════
            // RiderCreationFailed: keep the form for a retry
            // ═══════════════════════════════════════════════════════════════
            RiderAction::RiderCreationFailed { reason, .. } => {
                if !state.in_flight.create {
                    error!("Creation failure arrived with no creation in flight");
                    return SmallVec::new();
                }
                state.in_flight.create = false;
                state.notice = Some(Notice::error(reason));
                SmallVec::new()
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
    use crate::state::{Field, Gender, Mobile, NoticeLevel, OtpStatus, Phase, RiderId, RiderProfileDraft, RiderRecord};
    use offline_desk_testing::{ReducerTest, assertions, run_effects, test_clock};
    use std::sync::Arc;

    type Env = RiderDeskEnvironment<MockRiderDirectory, MockOtpService, MockBookingHandoff, StaticStaffSession>;
    type TestReducer = SearchReducer<MockRiderDirectory, MockOtpService, MockBookingHandoff, StaticStaffSession>;

    fn env_with(directory: MockRiderDirectory) -> Env {
        RiderDeskEnvironment::new(
            directory,
            MockOtpService::new(),
            MockBookingHandoff::new(),
            StaticStaffSession::anonymous(),
            Arc::new(test_clock()),
        )
    }

    fn asha() -> RiderRecord {
        RiderRecord {
            id: RiderId("r-1".into()),
            mobile: Mobile::from_canonical("9876543210"),
            name: "Asha".into(),
            gender: Some(Gender::Female),
            email: None,
            referral_code_used: None,
        }
    }

    fn search(mobile: &str) -> RiderAction {
        RiderAction::SearchRider { mobile: mobile.into() }
    }

    fn not_found_state() -> ResolutionState {
        let mut state = ResolutionState::default();
        state.begin_search(Mobile::from_canonical("9000000001"));
        state.in_flight.search = false;
        state.offer_creation();
        state
    }

    fn draft() -> RiderProfileDraft {
        RiderProfileDraft {
            mobile: "9000000001".into(),
            name: "Ravi".into(),
            gender: "male".into(),
            ..RiderProfileDraft::default()
        }
    }

    #[test]
    fn short_mobile_is_rejected_without_effects() {
        let directory = MockRiderDirectory::new();
        let calls = directory.clone();

        ReducerTest::new(TestReducer::new())
            .with_env(env_with(directory))
            .given_state(ResolutionState::default())
            .when_action(search("98765"))
            .then_state(|s| {
                assert_eq!(s.phase(), Phase::Idle);
                assert_eq!(s.generation, 0);
                assert_eq!(s.field_error.as_ref().map(|e| e.field), Some(Field::Mobile));
            })
            .then_effects(assertions::assert_no_effects)
            .run();

        assert_eq!(calls.lookup_calls(), 0);
    }

    #[test]
    fn search_resets_session_and_starts_lookup() {
        let mut state = ResolutionState::default();
        state.resolve_rider(asha());
        state.otp = OtpStatus::Sent { echoed_code: None };
        state.pending_otp_input = "12".into();

        ReducerTest::new(TestReducer::new())
            .with_env(env_with(MockRiderDirectory::new()))
            .given_state(state)
            .when_action(search("90000 00001"))
            .then_state(|s| {
                assert_eq!(s.phase(), Phase::Searching);
                assert_eq!(s.generation, 1);
                assert!(s.resolved_rider.is_none());
                assert_eq!(s.otp, OtpStatus::NotSent);
                assert!(s.pending_otp_input.is_empty());
                assert_eq!(s.queried_mobile, Some(Mobile::from_canonical("9000000001")));
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn same_mobile_in_flight_is_ignored() {
        ReducerTest::new(TestReducer::new())
            .with_env(env_with(MockRiderDirectory::new()))
            .given_state(ResolutionState::default())
            .given_actions([search("9000000001")])
            .when_action(search("900-000-0001"))
            .then_state(|s| assert_eq!(s.generation, 1))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn different_mobile_supersedes_in_flight_search() {
        ReducerTest::new(TestReducer::new())
            .with_env(env_with(MockRiderDirectory::new()))
            .given_state(ResolutionState::default())
            .given_actions([search("9000000001")])
            .when_action(search("9000000002"))
            .then_state(|s| {
                assert_eq!(s.generation, 2);
                assert_eq!(s.queried_mobile, Some(Mobile::from_canonical("9000000002")));
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[tokio::test]
    async fn lookup_effect_reports_directory_answer() {
        let directory = MockRiderDirectory::new().with_rider(asha());
        let env = env_with(directory.clone());
        let mut state = ResolutionState::default();

        let effects = TestReducer::new().reduce(&mut state, search("9876543210"), &env);
        let produced = run_effects(effects).await;

        assert_eq!(
            produced,
            vec![RiderAction::LookupCompleted {
                generation: 1,
                result: LookupResult::Found(asha()),
            }]
        );
        assert_eq!(directory.lookup_calls(), 1);
    }

    #[test]
    fn found_resolves_rider() {
        ReducerTest::new(TestReducer::new())
            .with_env(env_with(MockRiderDirectory::new()))
            .given_state(ResolutionState::default())
            .given_actions([search("9876543210")])
            .when_action(RiderAction::LookupCompleted {
                generation: 1,
                result: LookupResult::Found(asha()),
            })
            .then_state(|s| {
                assert_eq!(s.phase(), Phase::Found);
                assert_eq!(s.resolved_rider, Some(asha()));
                assert!(!s.creation_pending);
                assert!(s.create_form.is_none());
            })
            .run();
    }

    #[test]
    fn failure_offers_create_form_with_warning() {
        ReducerTest::new(TestReducer::new())
            .with_env(env_with(MockRiderDirectory::new()))
            .given_state(ResolutionState::default())
            .given_actions([search("9000000001")])
            .when_action(RiderAction::LookupCompleted {
                generation: 1,
                result: LookupResult::Failed { reason: "timeout".into() },
            })
            .then_state(|s| {
                assert_eq!(s.phase(), Phase::NotFound);
                assert_eq!(s.create_form.as_ref().map(|f| f.mobile.as_str()), Some("9000000001"));
                let notice = s.notice.as_ref().map(|n| (n.level, n.message.as_str()));
                assert_eq!(notice, Some((NoticeLevel::Warning, SEARCH_FAILED)));
            })
            .run();
    }

    #[test]
    fn create_requires_not_found() {
        ReducerTest::new(TestReducer::new())
            .with_env(env_with(MockRiderDirectory::new()))
            .given_state(ResolutionState::default())
            .when_action(RiderAction::CreateRider { draft: draft() })
            .then_state(|s| assert_eq!(s.phase(), Phase::Idle))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn invalid_form_keeps_values() {
        let mut incomplete = draft();
        incomplete.gender = String::new();

        ReducerTest::new(TestReducer::new())
            .with_env(env_with(MockRiderDirectory::new()))
            .given_state(not_found_state())
            .when_action(RiderAction::CreateRider { draft: incomplete })
            .then_state(|s| {
                assert_eq!(s.phase(), Phase::NotFound);
                assert_eq!(s.field_error.as_ref().map(|e| e.message.as_str()), Some("Gender is required"));
                assert_eq!(s.create_form.as_ref().map(|f| f.name.as_str()), Some("Ravi"));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn create_marks_in_flight_and_ignores_duplicates() {
        ReducerTest::new(TestReducer::new())
            .with_env(env_with(MockRiderDirectory::new()))
            .given_state(not_found_state())
            .given_actions([RiderAction::CreateRider { draft: draft() }])
            .when_action(RiderAction::CreateRider { draft: draft() })
            .then_state(|s| assert_eq!(s.phase(), Phase::Creating))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn creation_failure_keeps_form_and_surfaces_reason() {
        ReducerTest::new(TestReducer::new())
            .with_env(env_with(MockRiderDirectory::new()))
            .given_state(not_found_state())
            .given_actions([RiderAction::CreateRider { draft: draft() }])
            .when_action(RiderAction::RiderCreationFailed {
                generation: 1,
                reason: "Rider already exists".into(),
            })
            .then_state(|s| {
                assert_eq!(s.phase(), Phase::NotFound);
                assert!(s.resolved_rider.is_none());
                assert_eq!(s.create_form, Some(draft()));
                assert_eq!(s.notice, Some(Notice::error("Rider already exists")));
            })
            .run();
    }

    #[test]
    fn created_rider_resolves_session() {
        ReducerTest::new(TestReducer::new())
            .with_env(env_with(MockRiderDirectory::new()))
            .given_state(not_found_state())
            .given_actions([RiderAction::CreateRider { draft: draft() }])
            .when_action(RiderAction::RiderCreated { generation: 1, rider: asha() })
            .then_state(|s| {
                assert_eq!(s.phase(), Phase::Found);
                assert!(!s.creation_pending);
                assert!(s.create_form.is_none());
            })
            .run();
    }
}
