//! Rider desk actions.
//!
//! Actions follow the command/event split: commands are what staff asked
//! for, events are what a collaborator answered. Every event carries the
//! session generation its request was issued under, so answers that
//! belong to an earlier search can be recognised and dropped.

use crate::providers::LookupResult;
use crate::state::{RiderProfileDraft, RiderRecord};
use serde::{Deserialize, Serialize};

/// Rider desk action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiderAction {
    // ═══════════════════════════════════════════════════════════════════════
    // Commands
    // ═══════════════════════════════════════════════════════════════════════
    /// Look up the rider owning a mobile number.
    ///
    /// Starts a new session unless the same number is already being looked up.
    SearchRider {
        /// Mobile as typed by staff.
        mobile: String,
    },

    /// Submit the create-profile form.
    CreateRider {
        /// Form values as typed by staff.
        draft: RiderProfileDraft,
    },

    /// Send an OTP to the resolved rider.
    SendOtp,

    /// Record the digits staff typed so far.
    EnterOtp {
        /// Typed code.
        code: String,
    },

    /// Verify the code the rider read out.
    VerifyOtp {
        /// Typed code.
        code: String,
    },

    /// Hand the verified rider over to booking.
    AuthorizeBooking,

    /// Clear the current notice.
    DismissNotice,

    // ═══════════════════════════════════════════════════════════════════════
    // Events
    // ═══════════════════════════════════════════════════════════════════════
    /// Directory answered a lookup.
    LookupCompleted {
        /// Session generation of the request.
        generation: u64,
        /// Outcome.
        result: LookupResult,
    },

    /// Directory created a rider.
    RiderCreated {
        /// Session generation of the request.
        generation: u64,
        /// New record.
        rider: RiderRecord,
    },

    /// Directory refused or failed to create a rider.
    RiderCreationFailed {
        /// Session generation of the request.
        generation: u64,
        /// Message for staff.
        reason: String,
    },

    /// OTP service sent a code.
    OtpDispatched {
        /// Session generation of the request.
        generation: u64,
        /// Code echoed by the service, if any.
        echoed_code: Option<String>,
    },

    /// OTP service could not send a code.
    OtpDispatchFailed {
        /// Session generation of the request.
        generation: u64,
        /// Message for staff.
        reason: String,
    },

    /// OTP service accepted the code.
    OtpVerified {
        /// Session generation of the request.
        generation: u64,
    },

    /// OTP service rejected the code, or could not check it.
    OtpRejected {
        /// Session generation of the request.
        generation: u64,
        /// Message for staff.
        reason: String,
    },
}

impl RiderAction {
    /// Generation carried by an event; `None` for commands.
    #[must_use]
    pub const fn generation(&self) -> Option<u64> {
        match self {
            Self::LookupCompleted { generation, .. }
            | Self::RiderCreated { generation, .. }
            | Self::RiderCreationFailed { generation, .. }
            | Self::OtpDispatched { generation, .. }
            | Self::OtpDispatchFailed { generation, .. }
            | Self::OtpVerified { generation }
            | Self::OtpRejected { generation, .. } => Some(*generation),
            _ => None,
        }
    }

    /// Whether this is a collaborator answer.
    #[must_use]
    pub const fn is_event(&self) -> bool {
        self.generation().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_events_carry_generations() {
        assert_eq!(RiderAction::SendOtp.generation(), None);
        assert!(!RiderAction::SearchRider { mobile: "9876543210".into() }.is_event());
        assert_eq!(RiderAction::OtpVerified { generation: 3 }.generation(), Some(3));
        assert!(
            RiderAction::LookupCompleted { generation: 1, result: LookupResult::NotFound }.is_event()
        );
    }
}
