use std::fmt;

/// Where a session is in its room visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresenceState {
    /// Not in any room.
    #[default]
    Idle,
    /// Join sent; nothing heard back yet.
    Joining,
    /// In the room. Rosters are applied as they arrive.
    Joined,
    /// Leave sent; teardown in progress.
    Leaving,
}

impl PresenceState {
    /// Whether a join has been sent and not yet withdrawn.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Joining | Self::Joined)
    }
}

impl fmt::Display for PresenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Joining => "joining",
            Self::Joined => "joined",
            Self::Leaving => "leaving",
        };
        f.write_str(s)
    }
}
