//! Dual-link session state machine

use crate::error::{Jt809Error, Jt809Result};
use std::fmt;

/// Session state
///
/// # State Transitions
/// ```text
/// Idle -> DialingMain            (run)
/// DialingMain -> AwaitingSubLink (main link up, login sent)
/// DialingMain -> Closed          (dial failure)
/// AwaitingSubLink -> LoggingIn   (sub link accepted or login acknowledged)
/// LoggingIn -> Established       (both links up and login acknowledged)
/// any state but Closed -> ShuttingDown (shutdown, link loss, login rejected)
/// ShuttingDown -> Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// Not started
    #[default]
    Idle,
    /// Sub-link listener bound, main link being dialed
    DialingMain,
    /// Login sent; waiting for the peer to connect the sub link
    AwaitingSubLink,
    /// One of sub link and login acknowledgement is still outstanding
    LoggingIn,
    /// Both links up and login acknowledged
    Established,
    /// Closing sockets and stopping tasks
    ShuttingDown,
    /// Terminal
    Closed,
}

impl SessionState {
    /// Whether the session is fully established
    pub fn is_established(&self) -> bool {
        matches!(self, SessionState::Established)
    }

    /// Whether the session has begun or finished closing
    pub fn is_closing(&self) -> bool {
        matches!(self, SessionState::ShuttingDown | SessionState::Closed)
    }

    /// Validate state transition
    ///
    /// # Errors
    /// `Jt809Error::Protocol` naming both states if the transition is not
    /// allowed.
    pub fn validate_transition(&self, new_state: SessionState) -> Jt809Result<()> {
        use SessionState::*;

        let valid = match (*self, new_state) {
            (Idle, DialingMain) => true,
            (DialingMain, AwaitingSubLink) => true,
            (DialingMain, Closed) => true,
            (AwaitingSubLink, LoggingIn) => true,
            (LoggingIn, Established) => true,
            (Idle | DialingMain | AwaitingSubLink | LoggingIn | Established, ShuttingDown) => true,
            (ShuttingDown, Closed) => true,
            // Idempotent
            (ShuttingDown, ShuttingDown) | (Closed, Closed) => true,
            _ => false,
        };

        if valid {
            Ok(())
        } else {
            Err(Jt809Error::Protocol(format!(
                "Invalid state transition: {} -> {}",
                self, new_state
            )))
        }
    }

    /// Get human-readable state name
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::DialingMain => "DialingMain",
            SessionState::AwaitingSubLink => "AwaitingSubLink",
            SessionState::LoggingIn => "LoggingIn",
            SessionState::Established => "Established",
            SessionState::ShuttingDown => "ShuttingDown",
            SessionState::Closed => "Closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let path = [
            SessionState::Idle,
            SessionState::DialingMain,
            SessionState::AwaitingSubLink,
            SessionState::LoggingIn,
            SessionState::Established,
            SessionState::ShuttingDown,
            SessionState::Closed,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].validate_transition(pair[1]).is_ok(), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_dial_failure_closes() {
        assert!(SessionState::DialingMain
            .validate_transition(SessionState::Closed)
            .is_ok());
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(SessionState::Idle
            .validate_transition(SessionState::Established)
            .is_err());
        assert!(SessionState::Closed
            .validate_transition(SessionState::DialingMain)
            .is_err());
        assert!(SessionState::Closed
            .validate_transition(SessionState::ShuttingDown)
            .is_err());
        let err = SessionState::Established
            .validate_transition(SessionState::LoggingIn)
            .unwrap_err();
        assert!(err.to_string().contains("Established -> LoggingIn"));
    }

    #[test]
    fn test_flags() {
        assert_eq!(SessionState::default(), SessionState::Idle);
        assert!(SessionState::Established.is_established());
        assert!(SessionState::ShuttingDown.is_closing());
        assert!(SessionState::Closed.is_closing());
        assert!(!SessionState::LoggingIn.is_closing());
    }
}
