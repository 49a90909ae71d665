//! Back-office HTTP adapters.
//!
//! [`BackOfficeClient`] implements [`RiderDirectory`] and [`OtpService`]
//! against the offline-staff JSON API and can fetch the logged-in staff
//! member. Every endpoint answers with the same loose envelope
//! (`success`, `message`, plus `data`/`rider`/`otp`/`staff` depending on
//! the call); it is decoded here and nowhere else.
//!
//! A 401 from any endpoint signs the attached [`SessionContext`] out.

use super::{LookupResult, OtpDispatch, OtpVerdict, OtpService, RiderDirectory, SessionContext};
use crate::error::ServiceError;
use crate::state::{Gender, Mobile, NewRiderProfile, RiderId, RiderRecord, StaffMember};
use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const SEARCH_PATH: &str = "/api/offline-staff/search-riders";
const CREATE_PATH: &str = "/api/offline-staff/save-rider-profile";
const SEND_OTP_PATH: &str = "/api/offline-staff/send-otp";
const VERIFY_OTP_PATH: &str = "/api/rider-auth/verify-otp";
const FIND_STAFF_PATH: &str = "/api/offline-staff/find-staff";

/// Back-office API client.
///
/// Keeps cookies between calls, so a session cookie set by the API (or
/// seeded with `session_cookie`) rides along on every request.
#[derive(Clone, Debug)]
pub struct BackOfficeClient {
    client: Client,
    base_url: String,
    session: Option<SessionContext>,
}

impl BackOfficeClient {
    /// Create a client for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Transport`] if the cookie is not a valid
    /// header value or the TLS backend cannot be initialized.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        session_cookie: Option<&str>,
    ) -> Result<Self, ServiceError> {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = session_cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| ServiceError::Transport(format!("invalid session cookie: {e}")))?;
            headers.insert(COOKIE, value);
        }

        let client = Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: None,
        })
    }

    /// Sign `session` out whenever the back office answers 401.
    #[must_use]
    pub fn with_session(mut self, session: SessionContext) -> Self {
        self.session = Some(session);
        self
    }

    /// Base URL without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the logged-in staff member.
    ///
    /// Returns `Ok(None)` when the API says nobody is logged in.
    ///
    /// # Errors
    ///
    /// Returns transport and decoding errors.
    pub async fn fetch_current_staff(&self) -> Result<Option<StaffMember>, ServiceError> {
        let request = self.client.get(self.url(FIND_STAFF_PATH));

        match self.envelope(request).await {
            Ok(envelope) if envelope.success => Ok(envelope.staff.map(WireStaff::into_staff)),
            Ok(_) | Err(ServiceError::Unauthorized) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Send a request and decode the envelope.
    async fn envelope(&self, request: RequestBuilder) -> Result<Envelope, ServiceError> {
        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED => {
                if let Some(session) = &self.session {
                    warn!("Back office reported the staff session as expired");
                    session.sign_out();
                }
                Err(ServiceError::Unauthorized)
            },
            status if status.is_success() => response
                .json::<Envelope>()
                .await
                .map_err(|e| ServiceError::Decode(e.to_string())),
            status => {
                let body = response.text().await.unwrap_or_default();
                match serde_json::from_str::<Envelope>(&body) {
                    Ok(Envelope { message: Some(message), .. }) => {
                        Err(ServiceError::Rejected { message })
                    },
                    _ => Err(ServiceError::Transport(format!("HTTP {}", status.as_u16()))),
                }
            },
        }
    }
}

impl RiderDirectory for BackOfficeClient {
    async fn lookup_by_mobile(&self, mobile: &Mobile) -> LookupResult {
        debug!(mobile = %mobile.masked(), "Searching rider");

        let request = self
            .client
            .get(self.url(SEARCH_PATH))
            .query(&[("mobile", mobile.as_str())]);

        match self.envelope(request).await {
            Ok(envelope) if envelope.success => envelope
                .data
                .and_then(|data| serde_json::from_value::<WireRider>(data).ok())
                .and_then(|wire| wire.into_record(mobile))
                .map_or(LookupResult::NotFound, LookupResult::Found),
            Ok(_) => LookupResult::NotFound,
            Err(e) => {
                warn!(error = %e, "Rider search failed");
                LookupResult::Failed { reason: e.to_string() }
            },
        }
    }

    async fn create_rider(&self, profile: &NewRiderProfile) -> Result<RiderRecord, ServiceError> {
        debug!(mobile = %profile.mobile.masked(), "Creating rider profile");

        let body = CreateRiderBody {
            mobile: profile.mobile.as_str(),
            name: &profile.name,
            gender: profile.gender.as_str(),
            email: profile.email.as_deref(),
            referral_code_used: profile.referral_code_used.as_deref(),
        };
        let envelope = self
            .envelope(self.client.post(self.url(CREATE_PATH)).json(&body))
            .await?;

        if !envelope.success {
            return Err(ServiceError::Rejected {
                message: envelope
                    .message
                    .unwrap_or_else(|| "Failed to create rider".to_string()),
            });
        }

        envelope
            .rider
            .and_then(|wire| wire.into_record(&profile.mobile))
            .ok_or_else(|| ServiceError::Decode("rider missing from response".to_string()))
    }
}

impl OtpService for BackOfficeClient {
    async fn send_otp(&self, mobile: &Mobile) -> Result<OtpDispatch, ServiceError> {
        debug!(mobile = %mobile.masked(), "Sending OTP");

        let envelope = self
            .envelope(
                self.client
                    .post(self.url(SEND_OTP_PATH))
                    .json(&MobileBody { mobile: mobile.as_str() }),
            )
            .await?;

        if !envelope.success {
            return Err(ServiceError::Rejected {
                message: envelope
                    .message
                    .unwrap_or_else(|| "Failed to send OTP".to_string()),
            });
        }

        Ok(OtpDispatch {
            echoed_code: envelope.otp.and_then(code_text),
        })
    }

    async fn verify_otp(&self, mobile: &Mobile, code: &str) -> Result<OtpVerdict, ServiceError> {
        debug!(mobile = %mobile.masked(), "Verifying OTP");

        let envelope = self
            .envelope(self.client.post(self.url(VERIFY_OTP_PATH)).json(&VerifyBody {
                mobile: mobile.as_str(),
                otp: code,
            }))
            .await?;

        if envelope.success {
            Ok(OtpVerdict::Match)
        } else {
            Ok(OtpVerdict::Mismatch {
                message: envelope.message.unwrap_or_else(|| "Invalid OTP".to_string()),
            })
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Wire Types
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    rider: Option<WireRider>,
    #[serde(default)]
    otp: Option<serde_json::Value>,
    #[serde(default)]
    staff: Option<WireStaff>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRider {
    #[serde(rename = "_id")]
    id: Option<String>,
    mobile: Option<String>,
    name: Option<String>,
    gender: Option<String>,
    email: Option<String>,
    referral_code_used: Option<String>,
}

impl WireRider {
    /// `None` when the record has no id.
    fn into_record(self, requested: &Mobile) -> Option<RiderRecord> {
        let id = self.id.filter(|id| !id.is_empty())?;
        let mobile = self
            .mobile
            .and_then(|raw| Mobile::parse_with_min(&raw, 1).ok())
            .unwrap_or_else(|| requested.clone());

        Some(RiderRecord {
            id: RiderId(id),
            mobile,
            name: self.name.unwrap_or_default(),
            gender: self.gender.and_then(|g| Gender::parse(&g).ok()),
            email: self.email.filter(|e| !e.is_empty()),
            referral_code_used: self.referral_code_used.filter(|c| !c.is_empty()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct WireStaff {
    #[serde(rename = "_id", alias = "id", default)]
    id: Option<String>,
    name: Option<String>,
    email: Option<String>,
}

impl WireStaff {
    fn into_staff(self) -> StaffMember {
        StaffMember {
            id: self
                .id
                .or_else(|| self.email.clone())
                .unwrap_or_default(),
            name: self.name,
            email: self.email,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRiderBody<'a> {
    mobile: &'a str,
    name: &'a str,
    gender: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    referral_code_used: Option<&'a str>,
}

#[derive(Serialize)]
struct MobileBody<'a> {
    mobile: &'a str,
}

#[derive(Serialize)]
struct VerifyBody<'a> {
    mobile: &'a str,
    otp: &'a str,
}

/// OTP echoes arrive as strings or bare numbers.
fn code_text(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(code) if !code.is_empty() => Some(code),
        serde_json::Value::Number(code) => Some(code.to_string()),
        _ => None,
    }
}
