//! Rider desk environment.
//!
//! This module defines the environment type for dependency injection in
//! rider desk reducers.

use crate::config::FlowConfig;
use crate::providers::{BookingHandoff, CurrentStaff, OtpService, RiderDirectory};
use offline_desk_core::environment::Clock;
use std::sync::Arc;

/// Rider desk environment.
///
/// Contains every collaborator the reducers need.
///
/// # Type Parameters
///
/// - `D`: Rider directory
/// - `O`: OTP service
/// - `B`: Booking handoff
/// - `S`: Staff session
#[derive(Clone)]
pub struct RiderDeskEnvironment<D, O, B, S>
where
    D: RiderDirectory + Clone,
    O: OtpService + Clone,
    B: BookingHandoff + Clone,
    S: CurrentStaff + Clone,
{
    /// Rider directory (lookup, create).
    pub directory: D,

    /// OTP service (send, verify).
    pub otp: O,

    /// Booking flow entry point.
    pub booking: B,

    /// Logged-in staff member.
    pub staff: S,

    /// Time source for OTP and authorization timestamps.
    pub clock: Arc<dyn Clock>,

    /// Input and echo rules.
    pub config: FlowConfig,
}

impl<D, O, B, S> RiderDeskEnvironment<D, O, B, S>
where
    D: RiderDirectory + Clone,
    O: OtpService + Clone,
    B: BookingHandoff + Clone,
    S: CurrentStaff + Clone,
{
    /// Create a new environment with the default [`FlowConfig`].
    #[must_use]
    pub fn new(directory: D, otp: O, booking: B, staff: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            directory,
            otp,
            booking,
            staff,
            clock,
            config: FlowConfig::default(),
        }
    }

    /// Replace the flow configuration.
    #[must_use]
    pub fn with_config(mut self, config: FlowConfig) -> Self {
        self.config = config;
        self
    }
}
