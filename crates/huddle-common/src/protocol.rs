//! Wire protocol spoken between clients and the relay.
//!
//! Every WebSocket text frame carries one JSON envelope of the form
//! `{"event": "<name>", "data": <payload>}`. Outbound messages serialize
//! through the derived impls; inbound frames go through `parse` so a bad
//! payload surfaces as a `ProtocolError` instead of a panic.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ProtocolError;
use crate::id::{new_user_id, SocketId};

/// Event names carried in the envelope's `event` field.
pub mod events {
    pub const JOIN_ROOM: &str = "join-room";
    pub const LEAVE_ROOM: &str = "leave-room";
    pub const VOICE: &str = "voice";
    pub const PARTICIPANTS: &str = "participants";
}

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A person taking part in a room visit, as created by their client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub name: String,
    pub pic: Option<String>,
}

impl User {
    /// Create a user with a freshly generated id. Empty pics are stored as `None`.
    pub fn new(name: &str, pic: Option<&str>) -> Self {
        Self {
            user_id: new_user_id(name),
            name: name.to_string(),
            pic: pic.filter(|p| !p.is_empty()).map(str::to_string),
        }
    }
}

/// Server-side roster entry: the user plus the connection that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    #[serde(flatten)]
    pub user: User,
    pub socket_id: SocketId,
}

impl Participant {
    pub fn user_id(&self) -> &str {
        &self.user.user_id
    }

    pub fn name(&self) -> &str {
        &self.user.name
    }
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientMessage {
    #[serde(rename = "join-room")]
    JoinRoom {
        #[serde(rename = "roomId")]
        room_id: String,
        user: User,
    },

    #[serde(rename = "leave-room")]
    LeaveRoom {
        #[serde(rename = "roomId")]
        room_id: String,
        #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
    },

    #[serde(rename = "voice")]
    Voice {
        #[serde(rename = "roomId")]
        room_id: String,
        audio: Vec<f32>,
    },
}

impl ClientMessage {
    pub fn event(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => events::JOIN_ROOM,
            Self::LeaveRoom { .. } => events::LEAVE_ROOM,
            Self::Voice { .. } => events::VOICE,
        }
    }

    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let (event, data) = split_envelope(text)?;
        let fields = |source| ProtocolError::MalformedPayload {
            event: event.clone(),
            source,
        };
        match event.as_str() {
            events::JOIN_ROOM => {
                #[derive(Deserialize)]
                #[serde(rename_all = "camelCase")]
                struct Join {
                    room_id: String,
                    user: User,
                }
                let p: Join = serde_json::from_value(data).map_err(fields)?;
                Ok(Self::JoinRoom {
                    room_id: p.room_id,
                    user: p.user,
                })
            }
            events::LEAVE_ROOM => {
                #[derive(Deserialize)]
                #[serde(rename_all = "camelCase")]
                struct Leave {
                    room_id: String,
                    #[serde(default)]
                    user_id: Option<String>,
                }
                let p: Leave = serde_json::from_value(data).map_err(fields)?;
                Ok(Self::LeaveRoom {
                    room_id: p.room_id,
                    user_id: p.user_id,
                })
            }
            events::VOICE => {
                #[derive(Deserialize)]
                #[serde(rename_all = "camelCase")]
                struct Voice {
                    room_id: String,
                    audio: Vec<f32>,
                }
                let p: Voice = serde_json::from_value(data).map_err(fields)?;
                Ok(Self::Voice {
                    room_id: p.room_id,
                    audio: p.audio,
                })
            }
            _ => Err(ProtocolError::UnknownEvent(event)),
        }
    }
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// A relayed voice frame. Older relays sent the bare sample array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VoicePayload {
    Wrapped { audio: Vec<f32> },
    Bare(Vec<f32>),
}

impl VoicePayload {
    pub fn samples(&self) -> &[f32] {
        match self {
            Self::Wrapped { audio } => audio,
            Self::Bare(audio) => audio,
        }
    }

    pub fn into_samples(self) -> Vec<f32> {
        match self {
            Self::Wrapped { audio } => audio,
            Self::Bare(audio) => audio,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerMessage {
    /// Full roster replacement for the room the client is in.
    #[serde(rename = "participants")]
    Participants(Vec<Participant>),

    #[serde(rename = "voice")]
    Voice(VoicePayload),
}

impl ServerMessage {
    pub fn voice(audio: Vec<f32>) -> Self {
        Self::Voice(VoicePayload::Wrapped { audio })
    }

    pub fn event(&self) -> &'static str {
        match self {
            Self::Participants(_) => events::PARTICIPANTS,
            Self::Voice(_) => events::VOICE,
        }
    }

    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let (event, data) = split_envelope(text)?;
        match event.as_str() {
            events::PARTICIPANTS => {
                // A null roster means an empty room.
                if data.is_null() {
                    return Ok(Self::Participants(Vec::new()));
                }
                serde_json::from_value(data)
                    .map(Self::Participants)
                    .map_err(|source| ProtocolError::MalformedPayload { event, source })
            }
            events::VOICE => serde_json::from_value(data)
                .map(Self::Voice)
                .map_err(|source| ProtocolError::MalformedPayload { event, source }),
            _ => Err(ProtocolError::UnknownEvent(event)),
        }
    }
}

fn split_envelope(text: &str) -> Result<(String, Value), ProtocolError> {
    #[derive(Deserialize)]
    struct Envelope {
        event: String,
        #[serde(default)]
        data: Value,
    }
    let envelope: Envelope =
        serde_json::from_str(text).map_err(ProtocolError::MalformedEnvelope)?;
    Ok((envelope.event, envelope.data))
}
