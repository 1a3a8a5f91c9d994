//! Session controller: sequences one room visit.
//!
//! All methods take `&mut self` and are driven from a single task, so state
//! transitions never interleave. The only await inside `join` is the
//! microphone request.

use huddle_common::{ServerMessage, User, ValidationError};
use tracing::{debug, info, warn};

use super::types::{JoinOutcome, JoinRequest, SessionEvent, Surface};
use crate::audio::{AudioBackend, CaptureHandle, CapturePipeline, PlaybackPipeline};
use crate::channel::{SignalingChannel, Subscription};
use crate::identity::{IdentityStore, Profile};
use crate::presence::{PresenceMachine, PresenceState};

pub struct SessionController {
    surface: Surface,
    channel: SignalingChannel,
    identity: IdentityStore,
    presence: PresenceMachine,
    capture: CapturePipeline,
    capture_handle: Option<CaptureHandle>,
    playback: PlaybackPipeline,
    subscription: Option<Subscription>,
}

impl SessionController {
    pub fn new(
        surface: Surface,
        channel: SignalingChannel,
        identity: IdentityStore,
        audio: AudioBackend,
    ) -> Self {
        Self {
            surface,
            presence: PresenceMachine::new(channel.clone()),
            capture: CapturePipeline::new(audio.device, channel.clone(), audio.frame_size),
            capture_handle: None,
            playback: PlaybackPipeline::new(audio.sink),
            subscription: None,
            channel,
            identity,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn surface(&self) -> Surface {
        self.surface
    }

    pub fn state(&self) -> PresenceState {
        self.presence.state()
    }

    pub fn is_active(&self) -> bool {
        self.presence.state().is_active()
    }

    pub fn room_id(&self) -> Option<&str> {
        self.presence.room_id()
    }

    pub fn me(&self) -> Option<&User> {
        self.presence.me()
    }

    pub fn roster(&self) -> &[huddle_common::Participant] {
        self.presence.roster()
    }

    pub fn confirmed(&self) -> bool {
        self.presence.confirmed()
    }

    pub fn is_capturing(&self) -> bool {
        self.capture_handle.as_ref().is_some_and(CaptureHandle::is_active)
    }

    pub fn frames_sent(&self) -> u64 {
        self.capture_handle.as_ref().map_or(0, CaptureHandle::frames_sent)
    }

    pub fn frames_played(&self) -> u64 {
        self.playback.frames_played()
    }

    pub fn identity(&self) -> &IdentityStore {
        &self.identity
    }

    pub fn channel(&self) -> &SignalingChannel {
        &self.channel
    }

    // -----------------------------------------------------------------------
    // Join / leave
    // -----------------------------------------------------------------------

    /// Enter a room.
    ///
    /// Validation happens before anything is sent. A microphone failure does
    /// not fail the join; it is reported in [`JoinOutcome::capture`] and the
    /// session stays in the room as listen-only.
    pub async fn join(&mut self, request: JoinRequest) -> Result<JoinOutcome, ValidationError> {
        let room_id = request.room_id.trim().to_string();
        if room_id.is_empty() {
            return Err(ValidationError::MissingRoomId);
        }
        let user = self.resolve_user(&room_id, request.profile.as_ref())?;

        let switching = self.presence.room_id().is_some_and(|r| r != room_id)
            || self
                .presence
                .me()
                .is_some_and(|me| me.user_id != user.user_id);
        if switching {
            self.leave();
        }

        if let Some(profile) = &request.profile {
            self.identity.save(profile.name.trim(), profile.pic.as_deref());
        }
        self.identity.save_session_user(&room_id, &user);

        // Subscribe before the join goes out so the first roster is caught.
        if self.subscription.is_none() {
            self.subscription = Some(self.channel.subscribe());
        }
        self.presence.join(&room_id, user.clone());

        // One capture stream at a time.
        self.stop_capture();
        let capture = match self.capture.start(&room_id).await {
            Ok(handle) => {
                self.capture_handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                warn!(
                    surface = %self.surface,
                    room_id = %room_id,
                    error = %e,
                    "Microphone unavailable, joining listen-only"
                );
                Err(e)
            }
        };

        info!(surface = %self.surface, room_id = %room_id, user_id = %user.user_id, "Session joined");
        Ok(JoinOutcome { user, capture })
    }

    /// Re-enter `room_id` without asking for a name, if one is known.
    ///
    /// `Ok(None)` means neither a session user for this room nor a saved
    /// name exists; the caller should collect a profile and call `join`.
    pub async fn resume(&mut self, room_id: &str) -> Result<Option<JoinOutcome>, ValidationError> {
        let room_id = room_id.trim();
        if room_id.is_empty() {
            return Err(ValidationError::MissingRoomId);
        }
        let known = self.identity.load_session_user(room_id).is_some() || self.identity.load().has_name();
        if !known {
            debug!(surface = %self.surface, room_id, "No stored identity, cannot resume");
            return Ok(None);
        }
        self.join(JoinRequest::new(room_id)).await.map(Some)
    }

    /// Leave the current room and release every resource.
    ///
    /// Sends `leave-room` at most once per join, then stops capture, then
    /// closes playback. Safe to call at any time, any number of times.
    pub fn leave(&mut self) {
        let was_active = self.presence.begin_leave();
        let room_id = self.presence.room_id().map(str::to_string);

        self.stop_capture();
        self.playback.close();

        if let Some(room_id) = &room_id {
            self.identity.clear_session_user(room_id);
        }
        self.subscription = None;
        self.presence.finish_leave();

        if was_active {
            info!(surface = %self.surface, room_id = ?room_id, "Session left");
        }
    }

    fn stop_capture(&mut self) {
        if let Some(mut handle) = self.capture_handle.take() {
            handle.stop();
        }
    }

    fn resolve_user(&self, room_id: &str, profile: Option<&Profile>) -> Result<User, ValidationError> {
        if let Some(profile) = profile {
            let name = profile.name.trim();
            if name.is_empty() {
                return Err(ValidationError::MissingName);
            }
            return Ok(User::new(name, profile.pic.as_deref()));
        }

        if let Some(user) = self.identity.load_session_user(room_id) {
            return Ok(user);
        }
        // Keep the current id when re-joining the room we are already in.
        if let Some(me) = self.presence.me() {
            if self.presence.room_id() == Some(room_id) {
                return Ok(me.clone());
            }
        }

        let saved = self.identity.load();
        let name = saved.name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingName);
        }
        Ok(User::new(name, saved.pic.as_deref()))
    }

    // -----------------------------------------------------------------------
    // Inbound
    // -----------------------------------------------------------------------

    /// Wait for the next inbound message and apply it.
    ///
    /// Returns `None` when no room is active, or once the relay connection
    /// has closed and every message it delivered has been handled.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        let subscription = self.subscription.as_mut()?;
        let msg = subscription.recv().await?;
        Some(self.handle_message(msg))
    }

    /// Apply one inbound message: rosters go to presence, voice to playback.
    pub fn handle_message(&mut self, msg: ServerMessage) -> SessionEvent {
        match msg {
            ServerMessage::Participants(roster) => {
                if self.presence.apply_roster(roster) {
                    SessionEvent::RosterUpdated(self.presence.roster().to_vec())
                } else {
                    SessionEvent::Ignored
                }
            }
            ServerMessage::Voice(payload) => {
                if !self.is_active() {
                    return SessionEvent::Ignored;
                }
                let samples = payload.samples();
                self.playback.play_frame(samples);
                SessionEvent::Voice {
                    samples: samples.len(),
                }
            }
        }
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("surface", &self.surface)
            .field("presence", &self.presence)
            .field("capturing", &self.is_capturing())
            .finish()
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.leave();
    }
}
