//! Error types for the rider desk.

use crate::state::{FieldError, Operation};
use offline_desk_runtime::StoreError;
use thiserror::Error;

/// Result type alias for flow operations.
pub type Result<T> = std::result::Result<T, FlowError>;

/// Errors returned by [`crate::RiderResolutionFlow`] methods.
///
/// Collaborator failures are not errors at this level: they land in the
/// session's notice and the call still returns a snapshot.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FlowError {
    /// Input rejected locally; no collaborator was called.
    #[error("Invalid input: {0}")]
    Validation(FieldError),

    /// Operation called in a state that does not allow it.
    ///
    /// This is a caller bug (a UI offering a button it should not).
    #[error("{operation} requires {required}")]
    InvalidState {
        /// Operation that was attempted
        operation: Operation,
        /// Missing precondition
        required: &'static str,
    },

    /// A new search reset the session before the operation settled.
    ///
    /// The operation's answer, if any, is discarded.
    #[error("{operation} was superseded by a new search")]
    Superseded {
        /// Operation that was attempted
        operation: Operation,
    },

    /// The store rejected the action, or its answer did not arrive within
    /// the settle timeout.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors returned by collaborator providers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Network or HTTP-level failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service answered and refused the request.
    #[error("{message}")]
    Rejected {
        /// Human-readable reason from the service
        message: String,
    },

    /// The response body could not be decoded.
    #[error("Could not decode response: {0}")]
    Decode(String),

    /// The staff session is missing or expired.
    #[error("Staff session expired, please log in again")]
    Unauthorized,
}

impl ServiceError {
    /// Message to show staff: the service's own reason when it gave one,
    /// otherwise `fallback`.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Rejected { message } => message.clone(),
            Self::Unauthorized => self.to_string(),
            Self::Transport(_) | Self::Decode(_) => fallback.to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Required variable not set.
    #[error("Missing environment variable {0}")]
    Missing(&'static str),

    /// Variable set to something unusable.
    #[error("Invalid value {value:?} for {var}")]
    Invalid {
        /// Variable name
        var: &'static str,
        /// Offending value
        value: String,
    },
}
