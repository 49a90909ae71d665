//! Mock OTP service for testing.

use crate::error::ServiceError;
use crate::providers::{OtpDispatch, OtpService, OtpVerdict};
use crate::state::Mobile;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Code every mock OTP service issues unless told otherwise.
pub const DEFAULT_CODE: &str = "123456";

/// Mock OTP service.
///
/// Issues a fixed code, optionally echoes it back, and accepts it only for
/// a mobile it has sent to.
#[derive(Debug, Clone)]
pub struct MockOtpService {
    code: Arc<Mutex<String>>,
    echo: Arc<AtomicBool>,
    send_latency: Arc<Mutex<Option<Duration>>>,
    send_failure: Arc<Mutex<Option<ServiceError>>>,
    verify_failure: Arc<Mutex<Option<ServiceError>>>,
    sent: Arc<Mutex<Vec<Mobile>>>,
    verify_calls: Arc<AtomicUsize>,
}

impl MockOtpService {
    /// Create a service issuing [`DEFAULT_CODE`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            code: Arc::new(Mutex::new(DEFAULT_CODE.to_string())),
            echo: Arc::new(AtomicBool::new(false)),
            send_latency: Arc::new(Mutex::new(None)),
            send_failure: Arc::new(Mutex::new(None)),
            verify_failure: Arc::new(Mutex::new(None)),
            sent: Arc::new(Mutex::new(Vec::new())),
            verify_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Issue `code` instead.
    #[must_use]
    pub fn with_code(self, code: &str) -> Self {
        if let Ok(mut guard) = self.code.lock() {
            *guard = code.to_string();
        }
        self
    }

    /// Echo the issued code in send responses.
    #[must_use]
    pub fn with_echo(self) -> Self {
        self.echo.store(true, Ordering::SeqCst);
        self
    }

    /// Delay every send by `latency`.
    #[must_use]
    pub fn with_send_latency(self, latency: Duration) -> Self {
        if let Ok(mut guard) = self.send_latency.lock() {
            *guard = Some(latency);
        }
        self
    }

    /// Make sends fail with `error` (`None` to recover).
    pub fn set_send_failure(&self, error: Option<ServiceError>) {
        if let Ok(mut guard) = self.send_failure.lock() {
            *guard = error;
        }
    }

    /// Make verifications fail with `error` (`None` to recover).
    pub fn set_verify_failure(&self, error: Option<ServiceError>) {
        if let Ok(mut guard) = self.verify_failure.lock() {
            *guard = error;
        }
    }

    /// Mobiles an OTP was sent to, in order.
    #[must_use]
    pub fn sent_to(&self) -> Vec<Mobile> {
        self.sent.lock().map(|guard| guard.clone()).unwrap_or_default()
    }

    /// Number of successful sends.
    #[must_use]
    pub fn send_calls(&self) -> usize {
        self.sent_to().len()
    }

    /// Number of verification requests.
    #[must_use]
    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockOtpService {
    fn default() -> Self {
        Self::new()
    }
}

impl OtpService for MockOtpService {
    fn send_otp(&self, mobile: &Mobile) -> impl Future<Output = Result<OtpDispatch, ServiceError>> + Send {
        let service = self.clone();
        let mobile = mobile.clone();

        async move {
            let latency = service.send_latency.lock().ok().and_then(|guard| *guard);
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }

            let failure = service.send_failure.lock().ok().and_then(|guard| guard.clone());
            if let Some(error) = failure {
                return Err(error);
            }

            service
                .sent
                .lock()
                .map_err(|_| ServiceError::Transport("Mutex lock failed".to_string()))?
                .push(mobile);

            let echoed_code = if service.echo.load(Ordering::SeqCst) {
                service.code.lock().ok().map(|guard| guard.clone())
            } else {
                None
            };

            Ok(OtpDispatch { echoed_code })
        }
    }

    fn verify_otp(
        &self,
        mobile: &Mobile,
        code: &str,
    ) -> impl Future<Output = Result<OtpVerdict, ServiceError>> + Send {
        let service = self.clone();
        let mobile = mobile.clone();
        let code = code.to_string();

        async move {
            service.verify_calls.fetch_add(1, Ordering::SeqCst);

            let failure = service.verify_failure.lock().ok().and_then(|guard| guard.clone());
            if let Some(error) = failure {
                return Err(error);
            }

            let issued = service.code.lock().ok().map(|guard| guard.clone());
            let was_sent = service.sent_to().contains(&mobile);

            if was_sent && issued.as_deref() == Some(code.as_str()) {
                Ok(OtpVerdict::Match)
            } else {
                Ok(OtpVerdict::Mismatch {
                    message: "Invalid OTP".to_string(),
                })
            }
        }
    }
}
