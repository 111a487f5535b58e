/// Reveal state definitions for one interactive extraction attempt
///
/// An attempt moves forward through the states below; `Closed` can be
/// reached from any of them so the browser session is released no matter
/// where the attempt stopped.
///
/// ```text
/// NotLaunched -> Navigated -> ConsentHandled -> Revealed -> Closed
///                                           \-> Absent   -> Closed
/// ```
use crate::InteractionError;
use std::fmt;

/// Represents where an interactive reveal attempt currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RevealState {
    /// No session has been opened yet
    NotLaunched,

    /// Session open and the page finished loading
    Navigated,

    /// Cookie-consent overlay dismissed, or confirmed absent
    ConsentHandled,

    // ===== Outcome States =====
    /// The hidden value was captured
    Revealed,

    /// The value could not be revealed (no control, or it never appeared)
    Absent,

    // ===== Terminal State =====
    /// Session released
    Closed,
}

impl RevealState {
    /// Returns true if the attempt has produced its outcome
    pub fn is_outcome(&self) -> bool {
        matches!(self, Self::Revealed | Self::Absent)
    }

    /// Returns true once the session has been released
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Returns true if moving to `next` is a legal step
    pub fn can_transition_to(&self, next: RevealState) -> bool {
        use RevealState::*;

        match (self, next) {
            (Closed, _) => false,
            (_, Closed) => true,
            (NotLaunched, Navigated) => true,
            (Navigated, ConsentHandled) => true,
            (ConsentHandled, Revealed) | (ConsentHandled, Absent) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotLaunched => "not_launched",
            Self::Navigated => "navigated",
            Self::ConsentHandled => "consent_handled",
            Self::Revealed => "revealed",
            Self::Absent => "absent",
            Self::Closed => "closed",
        }
    }

    /// Returns all possible reveal states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::NotLaunched,
            Self::Navigated,
            Self::ConsentHandled,
            Self::Revealed,
            Self::Absent,
            Self::Closed,
        ]
    }
}

impl fmt::Display for RevealState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tracks one attempt's progress and the path it took
#[derive(Debug, Clone)]
pub struct RevealFlow {
    current: RevealState,
    history: Vec<RevealState>,
}

impl RevealFlow {
    pub fn new() -> Self {
        Self {
            current: RevealState::NotLaunched,
            history: vec![RevealState::NotLaunched],
        }
    }

    pub fn current(&self) -> RevealState {
        self.current
    }

    /// Every state visited so far, starting with `NotLaunched`
    pub fn history(&self) -> &[RevealState] {
        &self.history
    }

    /// Moves to `next`, rejecting illegal steps
    pub fn advance(&mut self, next: RevealState) -> Result<(), InteractionError> {
        if !self.current.can_transition_to(next) {
            return Err(InteractionError::InvalidTransition {
                from: self.current,
                to: next,
            });
        }

        tracing::trace!("Reveal state {} -> {}", self.current, next);
        self.current = next;
        self.history.push(next);
        Ok(())
    }
}

impl Default for RevealFlow {
    fn default() -> Self {
        Self::new()
    }
}
