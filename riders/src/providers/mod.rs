//! Collaborator providers.
//!
//! This module defines traits for every external service the rider desk
//! talks to. Reducers depend on the traits only; the binary wires in the
//! HTTP adapters and tests wire in the mocks.
//!
//! ```text
//! RiderDeskReducer ──► RiderDirectory   (lookup, create)
//!                  ├─► OtpService       (send, verify)
//!                  ├─► BookingHandoff   (begin booking)
//!                  └─► CurrentStaff     (read-only)
//! ```
//!
//! Responses are decoded into the tagged types below once, at the
//! boundary, so the reducer never sees a loosely-typed payload.

use crate::state::RiderRecord;
use serde::{Deserialize, Serialize};

pub mod booking;
pub mod console_booking;
pub mod directory;
pub mod http;
pub mod otp;
pub mod staff;

// Re-export provider traits
pub use booking::BookingHandoff;
pub use console_booking::ConsoleBookingHandoff;
pub use directory::RiderDirectory;
pub use http::BackOfficeClient;
pub use otp::OtpService;
pub use staff::{CurrentStaff, SessionContext};

/// Outcome of a lookup by mobile.
///
/// A miss is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LookupResult {
    /// A rider owns this mobile.
    Found(RiderRecord),

    /// No rider for this mobile.
    NotFound,

    /// The directory could not answer.
    Failed {
        /// Reason, for logs.
        reason: String,
    },
}

impl LookupResult {
    /// Metric label.
    #[must_use]
    pub const fn outcome(&self) -> &'static str {
        match self {
            Self::Found(_) => "found",
            Self::NotFound => "not_found",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Successful OTP send.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpDispatch {
    /// Code echoed back by the service (non-production debug affordance).
    pub echoed_code: Option<String>,
}

/// Answer of the OTP service to a verification request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OtpVerdict {
    /// The code matches.
    Match,

    /// The code does not match.
    Mismatch {
        /// Reason shown to staff.
        message: String,
    },
}
