//! Mock rider directory for testing.

use crate::error::ServiceError;
use crate::providers::{LookupResult, RiderDirectory};
use crate::state::{Mobile, NewRiderProfile, RiderId, RiderRecord};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock rider directory.
///
/// Holds riders in memory, assigns ids on creation and can be told to be
/// slow for a given mobile or to fail.
#[derive(Debug, Clone, Default)]
pub struct MockRiderDirectory {
    riders: Arc<Mutex<HashMap<Mobile, RiderRecord>>>,
    latency: Arc<Mutex<HashMap<Mobile, Duration>>>,
    lookup_failure: Arc<Mutex<Option<String>>>,
    create_failure: Arc<Mutex<Option<ServiceError>>>,
    created: Arc<Mutex<Vec<NewRiderProfile>>>,
    lookup_calls: Arc<AtomicUsize>,
    create_calls: Arc<AtomicUsize>,
}

impl MockRiderDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a rider.
    #[must_use]
    pub fn with_rider(self, rider: RiderRecord) -> Self {
        self.insert(rider);
        self
    }

    /// Delay lookups of `mobile`.
    #[must_use]
    pub fn with_latency(self, mobile: &Mobile, latency: Duration) -> Self {
        if let Ok(mut guard) = self.latency.lock() {
            guard.insert(mobile.clone(), latency);
        }
        self
    }

    /// Add or replace a rider.
    pub fn insert(&self, rider: RiderRecord) {
        if let Ok(mut guard) = self.riders.lock() {
            guard.insert(rider.mobile.clone(), rider);
        }
    }

    /// Make lookups fail with `reason` (`None` to recover).
    pub fn set_lookup_failure(&self, reason: Option<&str>) {
        if let Ok(mut guard) = self.lookup_failure.lock() {
            *guard = reason.map(str::to_string);
        }
    }

    /// Make creation fail with `error` (`None` to recover).
    pub fn set_create_failure(&self, error: Option<ServiceError>) {
        if let Ok(mut guard) = self.create_failure.lock() {
            *guard = error;
        }
    }

    /// Number of lookups served.
    #[must_use]
    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    /// Number of creation requests received.
    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Profiles successfully created, in order.
    #[must_use]
    pub fn created_profiles(&self) -> Vec<NewRiderProfile> {
        self.created.lock().map(|guard| guard.clone()).unwrap_or_default()
    }
}

impl RiderDirectory for MockRiderDirectory {
    fn lookup_by_mobile(&self, mobile: &Mobile) -> impl Future<Output = LookupResult> + Send {
        let directory = self.clone();
        let mobile = mobile.clone();

        async move {
            directory.lookup_calls.fetch_add(1, Ordering::SeqCst);

            let latency = directory
                .latency
                .lock()
                .ok()
                .and_then(|guard| guard.get(&mobile).copied());
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }

            let failure = directory.lookup_failure.lock().ok().and_then(|guard| guard.clone());
            if let Some(reason) = failure {
                return LookupResult::Failed { reason };
            }

            match directory.riders.lock() {
                Ok(guard) => guard
                    .get(&mobile)
                    .cloned()
                    .map_or(LookupResult::NotFound, LookupResult::Found),
                Err(_) => LookupResult::Failed {
                    reason: "Mutex lock failed".to_string(),
                },
            }
        }
    }

    fn create_rider(
        &self,
        profile: &NewRiderProfile,
    ) -> impl Future<Output = Result<RiderRecord, ServiceError>> + Send {
        let directory = self.clone();
        let profile = profile.clone();

        async move {
            directory.create_calls.fetch_add(1, Ordering::SeqCst);

            let failure = directory.create_failure.lock().ok().and_then(|guard| guard.clone());
            if let Some(error) = failure {
                return Err(error);
            }

            let rider = RiderRecord {
                id: RiderId(format!("rider-{}", uuid::Uuid::new_v4())),
                mobile: profile.mobile.clone(),
                name: profile.name.clone(),
                gender: Some(profile.gender),
                email: profile.email.clone(),
                referral_code_used: profile.referral_code_used.clone(),
            };

            {
                let mut riders = directory
                    .riders
                    .lock()
                    .map_err(|_| ServiceError::Transport("Mutex lock failed".to_string()))?;
                if riders.contains_key(&rider.mobile) {
                    return Err(ServiceError::Rejected {
                        message: "Rider already exists".to_string(),
                    });
                }
                riders.insert(rider.mobile.clone(), rider.clone());
            }

            if let Ok(mut created) = directory.created.lock() {
                created.push(profile);
            }

            Ok(rider)
        }
    }
}
