//! Error types for coach requests.

use thiserror::Error;

pub type CoachResult<T> = Result<T, CoachError>;

#[derive(Error, Debug)]
pub enum CoachError {
    #[error("API key missing; set BRUJULA_GENAI_API_KEY or user_config.toml")]
    MissingKey,

    #[error("request failed: {0}")]
    Transport(String),

    #[error("service returned {status}: {body}")]
    Service { status: u16, body: String },

    #[error("malformed response: {0}")]
    Parse(String),

    #[error("unknown project: {0}")]
    UnknownProject(String),
}

impl CoachError {
    /// Transient failures worth another attempt: network-class transport
    /// errors, server errors, and rate limiting. Everything else (bad input,
    /// missing auth, malformed responses) propagates after one attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            CoachError::Transport(_) => true,
            CoachError::Service { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(CoachError::Transport("timeout".into()).is_retryable());
        assert!(CoachError::Service { status: 503, body: String::new() }.is_retryable());
        assert!(CoachError::Service { status: 429, body: String::new() }.is_retryable());
        assert!(!CoachError::Service { status: 400, body: String::new() }.is_retryable());
        assert!(!CoachError::MissingKey.is_retryable());
        assert!(!CoachError::Parse("bad json".into()).is_retryable());
    }
}
