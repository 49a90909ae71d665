//! Local input validation.
//!
//! Everything here runs before a collaborator is called. Failures become a
//! [`FieldError`] shown next to the offending field.

use crate::state::{Field, FieldError, Gender, Mobile, NewRiderProfile, RiderProfileDraft};

/// Validate the search box.
///
/// # Errors
///
/// Returns a mobile [`FieldError`] when the number is empty or too short.
pub fn search_mobile(raw: &str, min_digits: usize) -> Result<Mobile, FieldError> {
    Mobile::parse_with_min(raw, min_digits)
}

/// Validate the create-profile form.
///
/// Mobile, name and gender are required. Blank email and referral code
/// become `None`.
///
/// # Errors
///
/// Returns the first failing field in form order.
pub fn new_rider(draft: &RiderProfileDraft, min_digits: usize) -> Result<NewRiderProfile, FieldError> {
    let mobile = Mobile::parse_with_min(&draft.mobile, min_digits)?;

    let name = draft.name.trim();
    if name.is_empty() {
        return Err(FieldError::new(Field::Name, "Name is required"));
    }

    let gender = Gender::parse(&draft.gender)?;

    let email = non_blank(&draft.email);
    if let Some(email) = &email {
        let valid = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
        if !valid {
            return Err(FieldError::new(Field::Email, "Email address is invalid"));
        }
    }

    Ok(NewRiderProfile {
        mobile,
        name: name.to_string(),
        gender,
        email,
        referral_code_used: non_blank(&draft.referral_code),
    })
}

/// Cap a typed OTP at `max_len` characters.
#[must_use]
pub fn cap_otp(raw: &str, max_len: usize) -> String {
    raw.trim().chars().take(max_len).collect()
}

/// Validate an OTP submitted for verification.
///
/// # Errors
///
/// Returns an otp [`FieldError`] when nothing was entered.
pub fn otp_code(raw: &str, max_len: usize) -> Result<String, FieldError> {
    let code = cap_otp(raw, max_len);
    if code.is_empty() {
        return Err(FieldError::new(Field::Otp, "OTP is required"));
    }
    Ok(code)
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
