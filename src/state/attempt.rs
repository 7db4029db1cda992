use std::fmt;

/// Attempt phases of the per-item retry machine
///
/// Every input URL moves through at most two fetch attempts:
///
/// ```text
/// First --entity found--> Done
///   |
///   +--anything else--> Second --always--> Done
/// ```
///
/// `Second` forces a fresh session. `Done` is absorbing, so a driver loop
/// over `next` cannot exceed [`AttemptPhase::MAX_ATTEMPTS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptPhase {
    /// Initial fetch on the current session
    First,

    /// Escalation fetch on a forced new session
    Second,

    /// No further attempts
    Done,
}

impl AttemptPhase {
    /// Upper bound on fetch attempts for one input URL
    pub const MAX_ATTEMPTS: u8 = 2;

    /// Returns true if this phase must rotate to a new session
    pub fn forces_new_session(&self) -> bool {
        matches!(self, Self::Second)
    }

    /// Returns true if no further attempt will be made
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// One-based attempt number, `None` once done
    pub fn attempt_number(&self) -> Option<u8> {
        match self {
            Self::First => Some(1),
            Self::Second => Some(2),
            Self::Done => None,
        }
    }

    /// Transition after an attempt finished
    ///
    /// # Arguments
    ///
    /// * `entity_found` - Whether the attempt produced a matching entity
    pub fn next(self, entity_found: bool) -> Self {
        match self {
            Self::First if entity_found => Self::Done,
            Self::First => Self::Second,
            Self::Second | Self::Done => Self::Done,
        }
    }
}

impl fmt::Display for AttemptPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => write!(f, "attempt-1"),
            Self::Second => write!(f, "attempt-2"),
            Self::Done => write!(f, "done"),
        }
    }
}
