use std::fmt;

use huddle_common::{CaptureError, Participant, User};

use crate::identity::Profile;

/// Which screen owns a controller. Used for log context only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Home,
    Landing,
    Room,
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Home => "home",
            Self::Landing => "landing",
            Self::Room => "room",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub room_id: String,
    /// Freshly entered name and pic. `None` reuses what is stored.
    pub profile: Option<Profile>,
}

impl JoinRequest {
    pub fn new(room_id: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            profile: None,
        }
    }

    pub fn with_profile(mut self, name: &str, pic: Option<&str>) -> Self {
        self.profile = Some(Profile::new(name, pic));
        self
    }
}

/// Result of a successful join.
#[derive(Debug)]
pub struct JoinOutcome {
    pub user: User,
    /// `Err` means the session joined without a microphone.
    pub capture: Result<(), CaptureError>,
}

impl JoinOutcome {
    pub fn is_listen_only(&self) -> bool {
        self.capture.is_err()
    }
}

/// What an inbound message did to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The roster was replaced; carries the new one.
    RosterUpdated(Vec<Participant>),
    /// A voice frame was handed to playback.
    Voice { samples: usize },
    /// The message arrived outside an active room and was ignored.
    Ignored,
}
