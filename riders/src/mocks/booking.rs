//! Mock booking handoff for testing.

use crate::providers::BookingHandoff;
use crate::state::BookingRequest;
use std::future::Future;
use std::sync::{Arc, Mutex};

/// Mock booking handoff.
///
/// Records every request it receives.
#[derive(Debug, Clone, Default)]
pub struct MockBookingHandoff {
    requests: Arc<Mutex<Vec<BookingRequest>>>,
}

impl MockBookingHandoff {
    /// Create a new mock booking handoff.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests received, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<BookingRequest> {
        self.requests.lock().map(|guard| guard.clone()).unwrap_or_default()
    }
}

impl BookingHandoff for MockBookingHandoff {
    fn begin_booking(&self, request: BookingRequest) -> impl Future<Output = ()> + Send {
        let requests = Arc::clone(&self.requests);

        async move {
            if let Ok(mut guard) = requests.lock() {
                guard.push(request);
            }
        }
    }
}
