//! Chat transport errors.

use feedbridge_core::ErrorCategory;
use thiserror::Error;

/// Failures talking to the Bot API.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connect, timeout or body decoding failure.
    #[error("bot api request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered `ok: false`.
    #[error("bot api error {code}: {description}")]
    Api {
        /// `error_code` of the response, or the HTTP status.
        code: u16,
        /// `description` of the response.
        description: String,
    },
}

impl TransportError {
    /// Failure category for logging.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Http(e) if e.is_decode() => ErrorCategory::DecodeFailure,
            Self::Http(_) => ErrorCategory::TransientNetwork,
            Self::Api { code: 401 | 403, .. } => ErrorCategory::Unauthorized,
            Self::Api { code: 404, .. } => ErrorCategory::NotFound,
            Self::Api { code: 429 | 500..=599, .. } => ErrorCategory::TransientNetwork,
            Self::Api { .. } => ErrorCategory::BackendOther,
        }
    }
}

/// Convenience type alias for transport results.
pub type Result<T> = std::result::Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn api(code: u16) -> TransportError {
        TransportError::Api {
            code,
            description: "x".into(),
        }
    }

    #[test]
    fn api_error_categories() {
        assert_eq!(api(401).category(), ErrorCategory::Unauthorized);
        assert_eq!(api(404).category(), ErrorCategory::NotFound);
        assert_eq!(api(429).category(), ErrorCategory::TransientNetwork);
        assert_eq!(api(502).category(), ErrorCategory::TransientNetwork);
        assert_eq!(api(400).category(), ErrorCategory::BackendOther);
    }

    #[test]
    fn display() {
        assert_eq!(
            api(400).to_string(),
            "bot api error 400: x"
        );
    }
}
