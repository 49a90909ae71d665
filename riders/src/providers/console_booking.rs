//! Console booking handoff for the staff console.

use crate::providers::BookingHandoff;
use crate::state::BookingRequest;
use tracing::info;

/// Booking handoff that prints the request instead of opening a booking.
///
/// The booking screen is not part of this crate; the console binary uses
/// this to show what would be handed over.
#[derive(Clone, Debug, Default)]
pub struct ConsoleBookingHandoff;

impl ConsoleBookingHandoff {
    /// Create a new console booking handoff.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl BookingHandoff for ConsoleBookingHandoff {
    async fn begin_booking(&self, request: BookingRequest) {
        info!(
            rider_id = %request.rider_id,
            staff_id = request.staff_id.as_deref().unwrap_or("-"),
            "Booking handed off"
        );
        println!("\n┌─ BOOKING ────────────────────────────────────────");
        println!("│ Rider:      {} ({})", request.rider_name, request.rider_id);
        println!("│ Staff:      {}", request.staff_id.as_deref().unwrap_or("unknown"));
        println!("│ Authorized: {}", request.authorized_at.to_rfc3339());
        println!("└──────────────────────────────────────────────────\n");
    }
}
