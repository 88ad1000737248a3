// crates/narrator/src/error.rs
//! Error types for narration requests

use audioshelf_engine::EngineError;
use thiserror::Error;

pub type NarratorResult<T> = Result<T, NarratorError>;

#[derive(Debug, Error)]
pub enum NarratorError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The environment variable that should hold the key is unset or empty
    #[error("No API key: set {0}")]
    MissingApiKey(String),

    #[error("Narration service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Narration response contained no audio")]
    EmptyResponse,

    #[error("Invalid narration payload: {0}")]
    InvalidPayload(String),
}

impl NarratorError {
    /// Transport failures and server errors are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            NarratorError::Http(e) => !e.is_builder() && !e.is_decode(),
            NarratorError::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<NarratorError> for EngineError {
    fn from(err: NarratorError) -> Self {
        EngineError::Provider(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        let server = NarratorError::Api {
            status: 503,
            message: "overloaded".to_string(),
        };
        let quota = NarratorError::Api {
            status: 429,
            message: "quota".to_string(),
        };
        let bad_key = NarratorError::Api {
            status: 400,
            message: "API key not valid".to_string(),
        };
        assert!(server.is_retryable());
        assert!(quota.is_retryable());
        assert!(!bad_key.is_retryable());
        assert!(!NarratorError::EmptyResponse.is_retryable());
        assert!(!NarratorError::MissingApiKey("GEMINI_API_KEY".to_string()).is_retryable());
    }

    #[test]
    fn test_converts_to_provider_error() {
        let err: EngineError = NarratorError::MissingApiKey("GEMINI_API_KEY".to_string()).into();
        match err {
            EngineError::Provider(message) => assert!(message.contains("GEMINI_API_KEY")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
