//! Rider desk configuration.
//!
//! Loads configuration from environment variables with sensible defaults.
//! [`FlowConfig`] is the part the reducers see; [`DeskConfig`] adds what
//! the binary needs to reach the back office.

use crate::error::ConfigError;
use crate::state::{MIN_MOBILE_DIGITS, OTP_MAX_LEN};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Rules the reducers apply to staff input and service answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Minimum digits for a mobile number (default: 10)
    pub min_mobile_digits: usize,

    /// OTP length cap (default: 6)
    pub otp_max_len: usize,

    /// Keep an OTP echoed by the service for display.
    ///
    /// Some non-production OTP services return the code they sent. When
    /// enabled, the desk shows it to staff; it is never used to verify.
    ///
    /// Default: `false`
    pub otp_debug_echo: bool,

    /// How long a flow call waits for its collaborator answer before
    /// returning (default: 30s). The answer is still applied when it
    /// arrives later.
    pub settle_timeout: Duration,
}

impl FlowConfig {
    /// Set the minimum mobile digit count.
    #[must_use]
    pub const fn with_min_mobile_digits(mut self, digits: usize) -> Self {
        self.min_mobile_digits = digits;
        self
    }

    /// Set the OTP length cap.
    #[must_use]
    pub const fn with_otp_max_len(mut self, len: usize) -> Self {
        self.otp_max_len = len;
        self
    }

    /// Enable or disable the debug OTP echo.
    #[must_use]
    pub const fn with_otp_debug_echo(mut self, enabled: bool) -> Self {
        self.otp_debug_echo = enabled;
        self
    }

    /// Set how long flow calls wait for collaborator answers.
    #[must_use]
    pub const fn with_settle_timeout(mut self, timeout: Duration) -> Self {
        self.settle_timeout = timeout;
        self
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            min_mobile_digits: MIN_MOBILE_DIGITS,
            otp_max_len: OTP_MAX_LEN,
            otp_debug_echo: false,
            settle_timeout: Duration::from_secs(30),
        }
    }
}

/// Full desk configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeskConfig {
    /// Back-office API base URL (`OFFLINE_DESK_API_URL`)
    pub api_url: Option<String>,

    /// HTTP request timeout (`OFFLINE_DESK_HTTP_TIMEOUT_SECS`, default: 15s)
    pub http_timeout: Duration,

    /// Session cookie to send with every request (`OFFLINE_DESK_SESSION_COOKIE`)
    pub session_cookie: Option<String>,

    /// Reducer rules
    pub flow: FlowConfig,
}

impl DeskConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a variable that is set but
    /// cannot be parsed, a minimum mobile length below
    /// [`MIN_MOBILE_DIGITS`], or an OTP length of zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Load configuration through `lookup` instead of the process
    /// environment.
    ///
    /// # Errors
    ///
    /// See [`DeskConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = FlowConfig::default();

        let flow = FlowConfig {
            min_mobile_digits: parsed(&lookup, "OFFLINE_DESK_MIN_MOBILE_DIGITS")?
                .unwrap_or(defaults.min_mobile_digits),
            otp_max_len: parsed(&lookup, "OFFLINE_DESK_OTP_MAX_LEN")?
                .unwrap_or(defaults.otp_max_len),
            otp_debug_echo: parsed(&lookup, "OFFLINE_DESK_OTP_DEBUG_ECHO")?
                .unwrap_or(defaults.otp_debug_echo),
            settle_timeout: parsed(&lookup, "OFFLINE_DESK_SETTLE_TIMEOUT_SECS")?
                .map_or(defaults.settle_timeout, Duration::from_secs),
        };

        if flow.min_mobile_digits < MIN_MOBILE_DIGITS {
            return Err(ConfigError::Invalid {
                var: "OFFLINE_DESK_MIN_MOBILE_DIGITS",
                value: flow.min_mobile_digits.to_string(),
            });
        }

        if flow.otp_max_len == 0 {
            return Err(ConfigError::Invalid {
                var: "OFFLINE_DESK_OTP_MAX_LEN",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            api_url: lookup("OFFLINE_DESK_API_URL").filter(|url| !url.trim().is_empty()),
            http_timeout: Duration::from_secs(
                parsed(&lookup, "OFFLINE_DESK_HTTP_TIMEOUT_SECS")?.unwrap_or(15),
            ),
            session_cookie: lookup("OFFLINE_DESK_SESSION_COOKIE").filter(|c| !c.is_empty()),
            flow,
        })
    }

    /// The API base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when `OFFLINE_DESK_API_URL` is unset.
    pub fn api_url(&self) -> Result<&str, ConfigError> {
        self.api_url
            .as_deref()
            .ok_or(ConfigError::Missing("OFFLINE_DESK_API_URL"))
    }
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            http_timeout: Duration::from_secs(15),
            session_cookie: None,
            flow: FlowConfig::default(),
        }
    }
}

fn parsed<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}
