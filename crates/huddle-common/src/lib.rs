pub mod errors;
pub mod id;
pub mod protocol;

pub use errors::{
    CaptureError, ConfigError, HuddleError, PlaybackError, ProtocolError, StorageError,
    ValidationError,
};
pub use id::{new_socket_id, new_user_id, SocketId};
pub use protocol::{ClientMessage, Participant, ServerMessage, User};

pub type Result<T> = std::result::Result<T, HuddleError>;
