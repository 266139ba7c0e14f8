//! Rejoin escalation policy
//!
//! A member's state is derived from their stored leave count alone. Each leave
//! moves the state at most one step forward; only an administrator reset moves
//! it back.

/// Leave count at which a member is blacklisted
pub const BLACKLIST_THRESHOLD: u64 = 2;

/// Escalation state of a member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejoinState {
    /// Never left, or reset by an administrator
    Clean,
    /// Left once
    Warned,
    /// Left at least twice
    Blacklisted,
}

impl RejoinState {
    #[must_use]
    pub const fn from_count(count: u64) -> Self {
        match count {
            0 => Self::Clean,
            c if c < BLACKLIST_THRESHOLD => Self::Warned,
            _ => Self::Blacklisted,
        }
    }
}

impl std::fmt::Display for RejoinState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Clean => write!(f, "Clean"),
            Self::Warned => write!(f, "Warned"),
            Self::Blacklisted => write!(f, "Blacklisted"),
        }
    }
}

/// What the bot should do in response to a member event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    None,
    Warn,
    Blacklist,
}

/// Decide the response to a leave, given the count stored before it
#[must_use]
pub const fn on_leave(previous_count: u64) -> Escalation {
    match RejoinState::from_count(previous_count.saturating_add(1)) {
        RejoinState::Clean => Escalation::None,
        RejoinState::Warned => Escalation::Warn,
        RejoinState::Blacklisted => Escalation::Blacklist,
    }
}

/// Decide the response to a join, given the stored count
#[must_use]
pub const fn on_join(count: u64) -> Escalation {
    match RejoinState::from_count(count) {
        RejoinState::Blacklisted => Escalation::Blacklist,
        RejoinState::Clean | RejoinState::Warned => Escalation::None,
    }
}
