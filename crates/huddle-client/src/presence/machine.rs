//! Join/leave state machine and the locally held roster.
//!
//! The relay is the only authority on who is in a room. The machine never
//! edits the roster itself: every `participants` broadcast replaces it
//! wholesale, and the last one received wins.

use huddle_common::{ClientMessage, Participant, User};
use tracing::{debug, info};

use super::types::PresenceState;
use crate::channel::SignalingChannel;

pub struct PresenceMachine {
    channel: SignalingChannel,
    state: PresenceState,
    room_id: Option<String>,
    me: Option<User>,
    roster: Vec<Participant>,
    /// Set by the first roster after a join.
    confirmed: bool,
}

impl PresenceMachine {
    pub fn new(channel: SignalingChannel) -> Self {
        Self {
            channel,
            state: PresenceState::Idle,
            room_id: None,
            me: None,
            roster: Vec::new(),
            confirmed: false,
        }
    }

    pub fn state(&self) -> PresenceState {
        self.state
    }

    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    pub fn me(&self) -> Option<&User> {
        self.me.as_ref()
    }

    pub fn roster(&self) -> &[Participant] {
        &self.roster
    }

    /// Whether the relay has sent a roster since the last join.
    pub fn confirmed(&self) -> bool {
        self.confirmed
    }

    /// Send `join-room` and enter the room.
    ///
    /// The state becomes `Joined` as soon as the message is queued; the relay
    /// never acknowledges a join beyond broadcasting a roster. Calling this
    /// while already joined re-sends the join, which the relay treats as a
    /// replacement of the existing entry.
    pub fn join(&mut self, room_id: &str, user: User) {
        self.state = PresenceState::Joining;
        info!(room_id, user_id = %user.user_id, "Joining room");

        self.channel.send(ClientMessage::JoinRoom {
            room_id: room_id.to_string(),
            user: user.clone(),
        });

        if self.room_id.as_deref() != Some(room_id) {
            self.roster.clear();
        }
        self.room_id = Some(room_id.to_string());
        self.me = Some(user);
        self.confirmed = false;
        self.state = PresenceState::Joined;
    }

    /// Replace the roster with a broadcast from the relay.
    ///
    /// Returns `false` (and changes nothing) when no room is active.
    pub fn apply_roster(&mut self, roster: Vec<Participant>) -> bool {
        if !self.state.is_active() {
            debug!(state = %self.state, "Ignoring roster outside a room");
            return false;
        }
        debug!(participants = roster.len(), "Roster updated");
        self.roster = roster;
        self.confirmed = true;
        true
    }

    /// Send `leave-room` if a room is active. Returns whether it was sent.
    /// A second call before [`finish_leave`](Self::finish_leave) sends nothing.
    pub fn begin_leave(&mut self) -> bool {
        if !self.state.is_active() {
            return false;
        }
        self.state = PresenceState::Leaving;

        if let Some(room_id) = &self.room_id {
            info!(room_id = %room_id, "Leaving room");
            self.channel.send(ClientMessage::LeaveRoom {
                room_id: room_id.clone(),
                user_id: self.me.as_ref().map(|u| u.user_id.clone()),
            });
        }
        true
    }

    /// Drop all room state and return to `Idle`.
    pub fn finish_leave(&mut self) {
        self.state = PresenceState::Idle;
        self.room_id = None;
        self.me = None;
        self.roster.clear();
        self.confirmed = false;
    }
}

impl std::fmt::Debug for PresenceMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceMachine")
            .field("state", &self.state)
            .field("room_id", &self.room_id)
            .field("participants", &self.roster.len())
            .finish()
    }
}
