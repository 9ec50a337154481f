//! Failure taxonomy.
//!
//! Every crate keeps its own `thiserror` enum, and each of those enums maps
//! its variants onto an [`ErrorCategory`]. The category decides what happens
//! next: retry with backoff, re-prompt the user, report "not found", report a
//! generic failure, or log and drop.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification of a failure, independent of the crate that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Socket or connect failure. Retried with a fixed backoff, never fatal.
    TransientNetwork,
    /// The backend rejected the credential.
    Unauthorized,
    /// A referenced post or comment does not exist (or is not visible).
    NotFound,
    /// Any other backend failure.
    BackendOther,
    /// A push payload or response body could not be decoded.
    DecodeFailure,
    /// Session state changed between an event arriving and being processed.
    StaleState,
}

impl ErrorCategory {
    /// Whether an operation failing with this category is worth retrying.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::TransientNetwork)
    }

    /// Stable snake-case label, used in logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TransientNetwork => "transient_network",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::BackendOther => "backend_other",
            Self::DecodeFailure => "decode_failure",
            Self::StaleState => "stale_state",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_failures_are_retryable() {
        assert!(ErrorCategory::TransientNetwork.is_retryable());
        for cat in [
            ErrorCategory::Unauthorized,
            ErrorCategory::NotFound,
            ErrorCategory::BackendOther,
            ErrorCategory::DecodeFailure,
            ErrorCategory::StaleState,
        ] {
            assert!(!cat.is_retryable(), "{cat} should not be retryable");
        }
    }

    #[test]
    fn display_matches_serde() {
        let cat = ErrorCategory::DecodeFailure;
        let json = serde_json::to_string(&cat).unwrap();
        assert_eq!(json, format!("\"{cat}\""));
    }
}
