//! huddle-client: the participant side of a voice room.
//!
//! A [`SessionController`] ties together the pieces a room visit needs:
//! the [`SignalingChannel`] to the relay, the [`IdentityStore`] that
//! remembers who you are, the capture and playback pipelines, and the
//! [`PresenceMachine`] that tracks whether you are in a room.

pub mod audio;
pub mod channel;
pub mod identity;
pub mod presence;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use audio::{
    AudioBackend, AudioBuffer, AudioDevice, AudioSink, CaptureHandle, CapturePipeline, Framer,
    InputStream, NullDevice, NullSink, PlaybackContext, PlaybackPipeline, SampleCallback,
};
pub use channel::{ChannelConfig, Loopback, SignalingChannel, Subscription};
pub use identity::{FileStore, IdentityStore, KeyValueStore, MemoryStore, Profile};
pub use presence::{PresenceMachine, PresenceState};
pub use session::{JoinOutcome, JoinRequest, SessionController, SessionEvent, Surface};

#[cfg(feature = "native-audio")]
pub use audio::native::{CpalDevice, CpalSink};
