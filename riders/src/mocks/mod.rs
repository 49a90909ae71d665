//! Mock provider implementations for testing.
//!
//! In-memory implementations of every provider trait. Clones share state,
//! so a test can keep a handle to inspect calls after moving the mock
//! into an environment.

pub mod booking;
pub mod directory;
pub mod otp;
pub mod staff;

pub use booking::MockBookingHandoff;
pub use directory::MockRiderDirectory;
pub use otp::MockOtpService;
pub use staff::StaticStaffSession;
