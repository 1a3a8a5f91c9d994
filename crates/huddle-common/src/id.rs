use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound (exclusive) of the numeric suffix appended to display names.
pub const USER_ID_SUFFIX_RANGE: u32 = 10_000;

/// Build a client-side user id: the display name plus a random numeric suffix.
///
/// Suffixes can collide; the relay deduplicates by the full id, so two people
/// picking the same name and suffix would supersede each other.
pub fn new_user_id(name: &str) -> String {
    let suffix = rand::thread_rng().gen_range(0..USER_ID_SUFFIX_RANGE);
    format!("{name}-{suffix}")
}

pub fn new_socket_id() -> SocketId {
    SocketId(uuid::Uuid::new_v4().to_string())
}

/// Relay-assigned identifier for one transport connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SocketId(String);

impl SocketId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SocketId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_starts_with_name() {
        let id = new_user_id("Alice");
        assert!(id.starts_with("Alice-"));
    }

    #[test]
    fn user_id_suffix_in_range() {
        for _ in 0..100 {
            let id = new_user_id("Bob");
            let suffix: u32 = id.rsplit('-').next().unwrap().parse().unwrap();
            assert!(suffix < USER_ID_SUFFIX_RANGE);
        }
    }

    #[test]
    fn user_id_keeps_dashes_in_name() {
        let id = new_user_id("mary-jane");
        assert!(id.starts_with("mary-jane-"));
    }

    #[test]
    fn socket_id_is_uuid() {
        let sid = new_socket_id();
        let parsed = uuid::Uuid::parse_str(sid.as_str());
        assert!(parsed.is_ok());
        assert_eq!(parsed.unwrap().get_version_num(), 4);
    }

    #[test]
    fn socket_id_is_unique() {
        assert_ne!(new_socket_id(), new_socket_id());
    }

    #[test]
    fn socket_id_display() {
        let sid = new_socket_id();
        assert_eq!(sid.to_string(), sid.as_str());
    }

    #[test]
    fn socket_id_serializes_as_plain_string() {
        let sid = SocketId::from("abc");
        assert_eq!(serde_json::to_string(&sid).unwrap(), "\"abc\"");
    }
}
