//! Booking handoff provider trait.

use crate::state::BookingRequest;

/// Entry point of the booking flow.
///
/// Called exactly once per session, after the rider's OTP is verified.
pub trait BookingHandoff: Send + Sync {
    /// Start a booking on the rider's behalf.
    fn begin_booking(
        &self,
        request: BookingRequest,
    ) -> impl std::future::Future<Output = ()> + Send;
}
