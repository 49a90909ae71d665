//! Rider directory provider trait.

use super::LookupResult;
use crate::error::ServiceError;
use crate::state::{Mobile, NewRiderProfile, RiderRecord};

/// Rider directory.
///
/// Owns rider profiles. The desk only reads them and asks for new ones.
pub trait RiderDirectory: Send + Sync {
    /// Find the rider owning `mobile`.
    ///
    /// Failures are folded into [`LookupResult::Failed`]; a lookup never
    /// returns an error.
    fn lookup_by_mobile(
        &self,
        mobile: &Mobile,
    ) -> impl std::future::Future<Output = LookupResult> + Send;

    /// Create a rider profile.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Rejected`] with the directory's reason, or a
    /// transport/decoding error.
    fn create_rider(
        &self,
        profile: &NewRiderProfile,
    ) -> impl std::future::Future<Output = Result<RiderRecord, ServiceError>> + Send;
}
