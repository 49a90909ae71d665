//! Rider resolution state types.
//!
//! This module defines the value types of the rider desk and the
//! [`ResolutionState`] session snapshot owned by the reducer. All types are
//! `Clone` so the flow can hand out immutable snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum number of digits in a searchable mobile number.
pub const MIN_MOBILE_DIGITS: usize = 10;

/// Maximum length of a staff-entered OTP.
pub const OTP_MAX_LEN: usize = 6;

// ═══════════════════════════════════════════════════════════════════════
// Value Types
// ═══════════════════════════════════════════════════════════════════════

/// Canonical mobile number (digits only).
///
/// Built with [`Mobile::parse`], which strips common separators so that
/// `"+91 98765-43210"` and `"919876543210"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mobile(String);

impl Mobile {
    /// Normalize and validate a staff-typed mobile number.
    ///
    /// # Errors
    ///
    /// Returns a mobile [`FieldError`] if the input is empty, contains
    /// anything but digits and separators, or has fewer than
    /// [`MIN_MOBILE_DIGITS`] digits.
    pub fn parse(raw: &str) -> Result<Self, FieldError> {
        Self::parse_with_min(raw, MIN_MOBILE_DIGITS)
    }

    /// [`Mobile::parse`] with a custom minimum digit count.
    ///
    /// # Errors
    ///
    /// See [`Mobile::parse`].
    pub fn parse_with_min(raw: &str, min_digits: usize) -> Result<Self, FieldError> {
        let trimmed = raw.trim();
        let body = trimmed.strip_prefix('+').unwrap_or(trimmed);

        let mut digits = String::with_capacity(body.len());
        for c in body.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '\t' | '-' | '(' | ')' | '.' => {},
                _ => {
                    return Err(FieldError::new(
                        Field::Mobile,
                        "Mobile number may only contain digits",
                    ));
                },
            }
        }

        if digits.is_empty() {
            return Err(FieldError::new(Field::Mobile, "Mobile number is required"));
        }

        if digits.len() < min_digits {
            return Err(FieldError::new(
                Field::Mobile,
                format!("Mobile number must be at least {min_digits} digits"),
            ));
        }

        Ok(Self(digits))
    }

    /// Wrap an already-canonical number, as returned by the directory.
    #[must_use]
    pub fn from_canonical(digits: impl Into<String>) -> Self {
        Self(digits.into())
    }

    /// The canonical digits.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The number with all but the last four digits hidden, for logs.
    #[must_use]
    pub fn masked(&self) -> String {
        let hidden = self.0.chars().count().saturating_sub(4);
        self.0
            .chars()
            .enumerate()
            .map(|(i, c)| if i < hidden { '*' } else { c })
            .collect()
    }
}

impl fmt::Display for Mobile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rider gender as recorded by the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    /// Male.
    Male,
    /// Female.
    Female,
    /// Other.
    Other,
}

impl Gender {
    /// Wire name (`male`, `female`, `other`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Other => "other",
        }
    }

    /// Parse a selection case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns a gender [`FieldError`] for an empty or unknown selection.
    pub fn parse(raw: &str) -> Result<Self, FieldError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" => Err(FieldError::new(Field::Gender, "Gender is required")),
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            "other" => Ok(Self::Other),
            _ => Err(FieldError::new(
                Field::Gender,
                "Gender must be male, female or other",
            )),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque rider identifier assigned by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiderId(pub String);

impl fmt::Display for RiderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rider profile as held by the directory.
///
/// Never mutated once resolved into a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiderRecord {
    /// Directory id.
    pub id: RiderId,

    /// Canonical mobile number.
    pub mobile: Mobile,

    /// Display name.
    pub name: String,

    /// Gender (absent only on legacy records).
    pub gender: Option<Gender>,

    /// Email address.
    pub email: Option<String>,

    /// Referral code used at sign-up (write-once).
    pub referral_code_used: Option<String>,
}

/// Raw create-profile form values, as typed by staff.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiderProfileDraft {
    /// Mobile number.
    pub mobile: String,
    /// Name.
    pub name: String,
    /// Gender selection.
    pub gender: String,
    /// Email (optional).
    pub email: String,
    /// Referral code (optional).
    pub referral_code: String,
}

impl RiderProfileDraft {
    /// Empty form with the mobile pre-filled.
    #[must_use]
    pub fn for_mobile(mobile: &Mobile) -> Self {
        Self {
            mobile: mobile.as_str().to_string(),
            ..Self::default()
        }
    }
}

/// Validated creation payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRiderProfile {
    /// Mobile number.
    pub mobile: Mobile,
    /// Name.
    pub name: String,
    /// Gender.
    pub gender: Gender,
    /// Email, if given.
    pub email: Option<String>,
    /// Referral code, if given.
    pub referral_code_used: Option<String>,
}

/// The authenticated staff member operating the desk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffMember {
    /// Staff id.
    pub id: String,
    /// Name.
    pub name: Option<String>,
    /// Email.
    pub email: Option<String>,
}

impl StaffMember {
    /// Name, falling back to email, then id.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.id)
    }
}

/// Handoff to the booking flow, produced once the OTP is verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    /// Rider the booking is made for.
    pub rider_id: RiderId,

    /// Rider display name.
    pub rider_name: String,

    /// Staff member who authorized it, if known.
    pub staff_id: Option<String>,

    /// Authorization time.
    pub authorized_at: DateTime<Utc>,
}

// ═══════════════════════════════════════════════════════════════════════
// Feedback Types
// ═══════════════════════════════════════════════════════════════════════

/// Form field a validation message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    /// Mobile number.
    Mobile,
    /// Name.
    Name,
    /// Gender.
    Gender,
    /// Email.
    Email,
    /// OTP code.
    Otp,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mobile => "mobile",
            Self::Name => "name",
            Self::Gender => "gender",
            Self::Email => "email",
            Self::Otp => "otp",
        };
        f.write_str(name)
    }
}

/// Field-level validation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Offending field.
    pub field: Field,
    /// Message shown next to the field.
    pub message: String,
}

impl FieldError {
    /// Create a field error.
    #[must_use]
    pub fn new(field: Field, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    /// Informational.
    Info,
    /// Something failed but the workflow continues.
    Warning,
    /// A collaborator call failed.
    Error,
}

/// Non-blocking, dismissible message for the staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Text.
    pub message: String,
}

impl Notice {
    /// Info notice.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    /// Warning notice.
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, message: message.into() }
    }

    /// Error notice.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Session State
// ═══════════════════════════════════════════════════════════════════════

/// OTP challenge status for the resolved rider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OtpStatus {
    /// No OTP sent yet.
    #[default]
    NotSent,

    /// OTP sent to the rider's phone.
    Sent {
        /// Code echoed by the service, kept only when debug echo is enabled.
        /// Display-only; verification always goes through the service.
        echoed_code: Option<String>,
    },

    /// The rider's code was accepted.
    Verified,
}

/// Per-operation in-progress flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct InFlight {
    /// Directory lookup outstanding.
    pub search: bool,
    /// Profile creation outstanding.
    pub create: bool,
    /// OTP send outstanding.
    pub send_otp: bool,
    /// OTP verification outstanding.
    pub verify_otp: bool,
}

/// Derived view of where the session is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Nothing searched yet.
    Idle,
    /// Lookup outstanding.
    Searching,
    /// Rider resolved, no OTP sent.
    Found,
    /// No rider for the mobile; the create form is offered.
    NotFound,
    /// Profile creation outstanding.
    Creating,
    /// OTP send outstanding.
    OtpSending,
    /// OTP sent, waiting for the rider's code.
    OtpSent,
    /// Verification outstanding.
    OtpVerifying,
    /// OTP verified; booking may be authorized.
    OtpVerified,
    /// Booking handed off.
    Authorized,
}

/// Staff-facing operations, used in precondition errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Search by mobile.
    SearchRider,
    /// Create a rider profile.
    CreateRider,
    /// Send an OTP.
    SendOtp,
    /// Type the OTP.
    EnterOtp,
    /// Verify the OTP.
    VerifyOtp,
    /// Proceed to booking.
    AuthorizeBooking,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SearchRider => "search_rider",
            Self::CreateRider => "create_rider",
            Self::SendOtp => "send_otp",
            Self::EnterOtp => "enter_otp",
            Self::VerifyOtp => "verify_otp",
            Self::AuthorizeBooking => "authorize_booking",
        };
        f.write_str(name)
    }
}

/// One rider resolution session.
///
/// # Examples
///
/// ```
/// # use offline_desk_riders::{Phase, ResolutionState};
/// let state = ResolutionState::default();
/// assert_eq!(state.phase(), Phase::Idle);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionState {
    /// Session generation; bumped by every search.
    pub generation: u64,

    /// Mobile last searched.
    pub queried_mobile: Option<Mobile>,

    /// Resolved rider, from lookup or creation.
    pub resolved_rider: Option<RiderRecord>,

    /// Lookup missed (or failed) and the create form is offered.
    pub creation_pending: bool,

    /// Create form values.
    pub create_form: Option<RiderProfileDraft>,

    /// OTP challenge status.
    pub otp: OtpStatus,

    /// OTP digits typed by staff.
    pub pending_otp_input: String,

    /// When the current OTP was sent.
    pub otp_sent_at: Option<DateTime<Utc>>,

    /// Outstanding collaborator calls.
    pub in_flight: InFlight,

    /// Last field-level validation message.
    pub field_error: Option<FieldError>,

    /// Last notice.
    pub notice: Option<Notice>,

    /// Booking handoff, once authorized.
    pub authorization: Option<BookingRequest>,
}

impl ResolutionState {
    /// Where the session is.
    #[must_use]
    pub fn phase(&self) -> Phase {
        if self.authorization.is_some() {
            return Phase::Authorized;
        }
        if self.in_flight.search {
            return Phase::Searching;
        }
        if self.in_flight.create {
            return Phase::Creating;
        }

        if self.resolved_rider.is_some() {
            if self.in_flight.verify_otp {
                return Phase::OtpVerifying;
            }
            if self.in_flight.send_otp {
                return Phase::OtpSending;
            }
            return match self.otp {
                OtpStatus::NotSent => Phase::Found,
                OtpStatus::Sent { .. } => Phase::OtpSent,
                OtpStatus::Verified => Phase::OtpVerified,
            };
        }

        if self.creation_pending {
            Phase::NotFound
        } else {
            Phase::Idle
        }
    }

    /// Check whether `operation` may run now.
    ///
    /// # Errors
    ///
    /// Returns a description of the missing precondition.
    pub fn precondition(&self, operation: Operation) -> Result<(), &'static str> {
        let satisfied = match operation {
            Operation::SearchRider => true,
            Operation::CreateRider => self.creation_pending && self.resolved_rider.is_none(),
            Operation::SendOtp => self.resolved_rider.is_some() && self.authorization.is_none(),
            Operation::EnterOtp | Operation::VerifyOtp => {
                self.resolved_rider.is_some() && matches!(self.otp, OtpStatus::Sent { .. })
            },
            Operation::AuthorizeBooking => {
                self.resolved_rider.is_some() && self.otp == OtpStatus::Verified
            },
        };

        if satisfied {
            Ok(())
        } else {
            Err(required_for(operation))
        }
    }

    /// Start a new session for `mobile`, keeping the generation counter.
    pub(crate) fn begin_search(&mut self, mobile: Mobile) {
        let generation = self.generation.wrapping_add(1);
        *self = Self {
            generation,
            queried_mobile: Some(mobile),
            ..Self::default()
        };
        self.in_flight.search = true;
    }

    /// Replace the resolved rider; any OTP progress belongs to the old one.
    pub(crate) fn resolve_rider(&mut self, rider: RiderRecord) {
        self.resolved_rider = Some(rider);
        self.creation_pending = false;
        self.create_form = None;
        self.otp = OtpStatus::NotSent;
        self.otp_sent_at = None;
        self.pending_otp_input.clear();
    }

    /// Offer the create form for the searched mobile.
    pub(crate) fn offer_creation(&mut self) {
        self.resolved_rider = None;
        self.creation_pending = true;
        self.otp = OtpStatus::NotSent;
        self.otp_sent_at = None;
        self.pending_otp_input.clear();
        self.create_form = self.queried_mobile.as_ref().map(RiderProfileDraft::for_mobile);
    }
}

const fn required_for(operation: Operation) -> &'static str {
    match operation {
        Operation::SearchRider => "nothing",
        Operation::CreateRider => "a mobile with no rider profile",
        Operation::SendOtp => "a resolved rider",
        Operation::EnterOtp | Operation::VerifyOtp => "an OTP sent to the rider",
        Operation::AuthorizeBooking => "a verified OTP",
    }
}
