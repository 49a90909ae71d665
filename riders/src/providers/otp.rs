//! OTP service provider trait.

use super::{OtpDispatch, OtpVerdict};
use crate::error::ServiceError;
use crate::state::Mobile;

/// OTP service.
///
/// Generates, delivers and checks one-time passcodes. The desk never
/// compares codes itself.
pub trait OtpService: Send + Sync {
    /// Send an OTP to `mobile`.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Network request fails
    /// - The service refuses to send
    fn send_otp(
        &self,
        mobile: &Mobile,
    ) -> impl std::future::Future<Output = Result<OtpDispatch, ServiceError>> + Send;

    /// Check `code` for `mobile`.
    ///
    /// A wrong code is [`OtpVerdict::Mismatch`], not an error.
    ///
    /// # Errors
    ///
    /// Returns error if the service cannot be reached or answers garbage.
    fn verify_otp(
        &self,
        mobile: &Mobile,
        code: &str,
    ) -> impl std::future::Future<Output = Result<OtpVerdict, ServiceError>> + Send;
}
