//! Error types for the study session.

use tutor_core::backend::{BackendError, GENERIC_ERROR_MESSAGE};
use tutor_core::error::TutorError;

use crate::state_machine::ScanState;

/// Errors from session operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    /// Missing or malformed user input. Rejected before any network call.
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    Server(String),
    #[error("{0}")]
    NotFound(String),
    /// The result belonged to a request that a newer one replaced.
    #[error("result superseded by a newer request")]
    StaleResultDiscarded,
    #[error("invalid state transition: {0} -> {1}")]
    InvalidTransition(ScanState, ScanState),
    #[error("{0}")]
    Storage(String),
    #[error("session state unavailable: {0}")]
    Internal(String),
}

impl SessionError {
    /// Text to show the user, or `None` for discarded results.
    pub fn user_message(&self) -> Option<String> {
        match self {
            SessionError::StaleResultDiscarded => None,
            SessionError::Validation(m)
            | SessionError::Transport(m)
            | SessionError::Server(m)
            | SessionError::NotFound(m)
            | SessionError::Storage(m) => Some(if m.trim().is_empty() {
                GENERIC_ERROR_MESSAGE.to_string()
            } else {
                m.clone()
            }),
            other => Some(other.to_string()),
        }
    }

    /// Validation and not-found errors render next to the control that
    /// caused them; everything else goes to the session banner.
    pub fn is_inline(&self) -> bool {
        matches!(self, SessionError::Validation(_) | SessionError::NotFound(_))
    }

    pub fn is_user_visible(&self) -> bool {
        !matches!(self, SessionError::StaleResultDiscarded)
    }
}

impl From<BackendError> for SessionError {
    fn from(err: BackendError) -> Self {
        let message = err.user_message().to_string();
        match err {
            BackendError::Server(_) => SessionError::Server(message),
            BackendError::Transport(_) => SessionError::Transport(message),
            BackendError::Storage(_) => SessionError::Storage(message),
        }
    }
}

impl From<TutorError> for SessionError {
    fn from(err: TutorError) -> Self {
        SessionError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_backend_error() {
        let err: SessionError = BackendError::Server("PDF too large".to_string()).into();
        assert_eq!(err, SessionError::Server("PDF too large".to_string()));

        let err: SessionError = BackendError::Transport(String::new()).into();
        assert_eq!(err, SessionError::Transport(GENERIC_ERROR_MESSAGE.to_string()));

        let err: SessionError = BackendError::Storage("disk full".to_string()).into();
        assert!(matches!(err, SessionError::Storage(_)));
    }

    #[test]
    fn test_stale_result_is_not_user_visible() {
        let err = SessionError::StaleResultDiscarded;
        assert!(!err.is_user_visible());
        assert_eq!(err.user_message(), None);
    }

    #[test]
    fn test_inline_classification() {
        assert!(SessionError::Validation("x".to_string()).is_inline());
        assert!(SessionError::NotFound("x".to_string()).is_inline());
        assert!(!SessionError::Server("x".to_string()).is_inline());
        assert!(!SessionError::Transport("x".to_string()).is_inline());
    }

    #[test]
    fn test_display() {
        let err = SessionError::InvalidTransition(ScanState::Submitting, ScanState::Submitting);
        assert_eq!(
            err.to_string(),
            "invalid state transition: submitting -> submitting"
        );
        assert_eq!(
            SessionError::Validation("Question cannot be blank".to_string()).to_string(),
            "Question cannot be blank"
        );
        assert_eq!(
            err.user_message().as_deref(),
            Some("invalid state transition: submitting -> submitting")
        );
    }
}
