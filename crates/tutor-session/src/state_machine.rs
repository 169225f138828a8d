//! Scan lifecycle state machine with validated transitions.
//!
//! Idle -> Submitting -> Ready | Error
//! Error -> Idle (acknowledged) | Submitting (retry)
//! Any non-idle state -> Idle (new scan)

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Lifecycle state of the current scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    /// Form open, nothing submitted.
    #[default]
    Idle,
    /// Ingestion in flight. Further submits are rejected.
    Submitting,
    /// Content analyzed; questions may be asked.
    Ready,
    /// Ingestion failed; the banner holds the reason.
    Error,
}

impl ScanState {
    /// Whether the input form accepts edits in this state.
    pub fn form_open(&self) -> bool {
        matches!(self, ScanState::Idle | ScanState::Error)
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanState::Idle => write!(f, "idle"),
            ScanState::Submitting => write!(f, "submitting"),
            ScanState::Ready => write!(f, "ready"),
            ScanState::Error => write!(f, "error"),
        }
    }
}

/// Validate that a scan state transition is allowed.
pub fn validate_transition(from: ScanState, to: ScanState) -> Result<(), SessionError> {
    let valid = matches!(
        (from, to),
        (ScanState::Idle, ScanState::Submitting)
            | (ScanState::Submitting, ScanState::Ready)
            | (ScanState::Submitting, ScanState::Error)
            | (ScanState::Submitting, ScanState::Idle)
            | (ScanState::Error, ScanState::Idle)
            | (ScanState::Error, ScanState::Submitting)
            | (ScanState::Ready, ScanState::Idle)
    );

    if valid {
        Ok(())
    } else {
        Err(SessionError::InvalidTransition(from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =====================================================================
    // Valid transitions
    // =====================================================================

    #[test]
    fn test_idle_to_submitting() {
        assert!(validate_transition(ScanState::Idle, ScanState::Submitting).is_ok());
    }

    #[test]
    fn test_submitting_to_ready() {
        assert!(validate_transition(ScanState::Submitting, ScanState::Ready).is_ok());
    }

    #[test]
    fn test_submitting_to_error() {
        assert!(validate_transition(ScanState::Submitting, ScanState::Error).is_ok());
    }

    #[test]
    fn test_error_to_idle() {
        assert!(validate_transition(ScanState::Error, ScanState::Idle).is_ok());
    }

    #[test]
    fn test_error_retry() {
        assert!(validate_transition(ScanState::Error, ScanState::Submitting).is_ok());
    }

    #[test]
    fn test_new_scan_from_any_non_idle_state() {
        for from in [ScanState::Submitting, ScanState::Ready, ScanState::Error] {
            assert!(validate_transition(from, ScanState::Idle).is_ok(), "{}", from);
        }
    }

    // =====================================================================
    // Invalid transitions
    // =====================================================================

    #[test]
    fn test_duplicate_submit_invalid() {
        let err = validate_transition(ScanState::Submitting, ScanState::Submitting).unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidTransition(ScanState::Submitting, ScanState::Submitting)
        );
    }

    #[test]
    fn test_ready_to_submitting_invalid() {
        assert!(validate_transition(ScanState::Ready, ScanState::Submitting).is_err());
    }

    #[test]
    fn test_idle_to_ready_invalid() {
        assert!(validate_transition(ScanState::Idle, ScanState::Ready).is_err());
    }

    #[test]
    fn test_ready_to_error_invalid() {
        assert!(validate_transition(ScanState::Ready, ScanState::Error).is_err());
    }

    #[test]
    fn test_idle_to_idle_invalid() {
        assert!(validate_transition(ScanState::Idle, ScanState::Idle).is_err());
    }

    #[test]
    fn test_form_open_states() {
        assert!(ScanState::Idle.form_open());
        assert!(ScanState::Error.form_open());
        assert!(!ScanState::Submitting.form_open());
        assert!(!ScanState::Ready.form_open());
    }
}
