//! # Offline Desk Riders
//!
//! Rider lookup, onboarding and OTP-gated booking authorization for
//! back-office staff booking rides on a rider's behalf.
//!
//! ## Workflow
//!
//! ```text
//! Idle ─search─► Searching ─┬─► Found ─send─► OtpSending ─► OtpSent ─verify─► OtpVerifying ─► OtpVerified ─book─► Authorized
//!                           │     ▲                            ▲                   │
//!                           │     │ created                    └──── mismatch ─────┘
//!                           └─► NotFound ─create─► Creating ─┘ (failure: back to NotFound)
//! ```
//!
//! A new search resets the session from any phase. Answers from the
//! directory or the OTP service that belong to an earlier search are
//! dropped.
//!
//! ## Architecture
//!
//! ```text
//! RiderResolutionFlow → Store → RiderDeskReducer → (State, Effects) → providers → RiderAction
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use offline_desk_riders::*;
//!
//! let flow = RiderResolutionFlow::new(environment);
//! let snapshot = flow.search_rider("9876543210").await?;
//! match snapshot.phase() {
//!     Phase::Found => { flow.send_otp().await?; }
//!     Phase::NotFound => { flow.create_rider(draft).await?; }
//!     _ => {}
//! }
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod actions;
pub mod config;
pub mod environment;
pub mod error;
pub mod flow;
pub mod providers;
pub mod reducers;
pub mod state;
pub mod validation;

// Mock providers for testing
#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// Re-exports
pub use actions::RiderAction;
pub use config::{DeskConfig, FlowConfig};
pub use environment::RiderDeskEnvironment;
pub use error::{ConfigError, FlowError, ServiceError};
pub use flow::{DeskStore, RiderResolutionFlow};
pub use providers::{
    BackOfficeClient, BookingHandoff, ConsoleBookingHandoff, CurrentStaff, LookupResult,
    OtpDispatch, OtpService, OtpVerdict, RiderDirectory, SessionContext,
};
pub use reducers::RiderDeskReducer;
pub use state::{
    BookingRequest, Field, FieldError, Gender, InFlight, Mobile, NewRiderProfile, Notice,
    NoticeLevel, Operation, OtpStatus, Phase, ResolutionState, RiderId, RiderProfileDraft,
    RiderRecord, StaffMember,
};
