use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Rejected join attempts. Raised before anything is sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("room id is missing")]
    MissingRoomId,

    #[error("display name is missing")]
    MissingName,
}

/// Microphone acquisition failures. The session stays joined as listen-only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error("microphone access denied")]
    PermissionDenied,

    #[error("no microphone available: {0}")]
    DeviceUnavailable(String),

    #[error("failed to build capture stream: {0}")]
    StreamError(String),
}

impl CaptureError {
    /// Message suitable for showing to the person at the keyboard.
    pub fn user_message(&self) -> &'static str {
        "Microphone access denied or not available. Check permissions and try again."
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError {
    #[error("no output device available: {0}")]
    DeviceUnavailable(String),

    #[error("failed to build playback stream: {0}")]
    StreamError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("storage encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Inbound payloads that fail shape validation.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(#[source] serde_json::Error),

    #[error("malformed payload for event '{event}': {source}")]
    MalformedPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown event: {0}")]
    UnknownEvent(String),
}

#[derive(Debug, thiserror::Error)]
pub enum HuddleError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("transport error: {0}")]
    Transport(String),
}
