//! Room store: the authoritative roster for every room, plus the outbound
//! channels of the connections that are members of each room.

use std::collections::HashMap;
use std::sync::Arc;

use huddle_common::{Participant, SocketId, User};
use tokio::sync::{mpsc, RwLock};

/// Sender half of a connection's outbound queue (serialized JSON frames).
pub type Outbox = mpsc::Sender<String>;

#[derive(Default)]
struct Room {
    /// Roster in join order. At most one entry per `user_id`.
    participants: Vec<Participant>,
    /// Connections owning at least one participant in this room.
    members: HashMap<SocketId, Outbox>,
}

impl Room {
    /// Drop member connections that no longer own a participant.
    fn prune_members(&mut self) {
        let participants = &self.participants;
        self.members
            .retain(|sid, _| participants.iter().any(|p| &p.socket_id == sid));
    }

    fn broadcast(&self, room_id: &str) -> Broadcast {
        Broadcast {
            room_id: room_id.to_string(),
            roster: self.participants.clone(),
            recipients: self.members.values().cloned().collect(),
        }
    }
}

/// A roster snapshot and the connections it must be delivered to.
pub struct Broadcast {
    pub room_id: String,
    pub roster: Vec<Participant>,
    pub recipients: Vec<Outbox>,
}

/// Thread-safe room store.
#[derive(Clone, Default)]
pub struct RoomStore {
    rooms: Arc<RwLock<HashMap<String, Room>>>,
}

impl RoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `user` to `room_id` on behalf of `socket_id`.
    ///
    /// A user id already in the roster is replaced in place, so re-joins keep
    /// their original position and never duplicate.
    pub async fn join(
        &self,
        room_id: &str,
        user: User,
        socket_id: &SocketId,
        outbox: Outbox,
    ) -> Broadcast {
        let mut map = self.rooms.write().await;
        let room = map.entry(room_id.to_string()).or_default();

        let participant = Participant {
            user,
            socket_id: socket_id.clone(),
        };
        match room
            .participants
            .iter_mut()
            .find(|p| p.user.user_id == participant.user.user_id)
        {
            Some(existing) => {
                tracing::debug!(room_id, user_id = %participant.user.user_id, "Superseding participant");
                *existing = participant;
            }
            None => room.participants.push(participant),
        }

        room.members.insert(socket_id.clone(), outbox);
        room.prune_members();
        room.broadcast(room_id)
    }

    /// Remove a participant. Without a `user_id`, every participant owned by
    /// `socket_id` in that room is removed. Returns `None` for unknown rooms.
    pub async fn leave(
        &self,
        room_id: &str,
        user_id: Option<&str>,
        socket_id: &SocketId,
    ) -> Option<Broadcast> {
        let mut map = self.rooms.write().await;
        let room = map.get_mut(room_id)?;

        match user_id {
            Some(uid) => room.participants.retain(|p| p.user.user_id != uid),
            None => room.participants.retain(|p| &p.socket_id != socket_id),
        }
        room.prune_members();

        let broadcast = room.broadcast(room_id);
        if room.participants.is_empty() {
            map.remove(room_id);
            tracing::info!(room_id, "Room closed (empty)");
        }
        Some(broadcast)
    }

    /// Remove everything a dropped connection owned. One broadcast per room
    /// whose roster changed.
    pub async fn disconnect(&self, socket_id: &SocketId) -> Vec<Broadcast> {
        let mut map = self.rooms.write().await;
        let mut broadcasts = Vec::new();

        for (room_id, room) in map.iter_mut() {
            let before = room.participants.len();
            room.participants.retain(|p| &p.socket_id != socket_id);
            if room.participants.len() != before {
                room.prune_members();
                broadcasts.push(room.broadcast(room_id));
            }
        }
        map.retain(|_, room| !room.participants.is_empty());
        broadcasts
    }

    /// Outboxes of every member of `room_id` other than `sender`. Empty when
    /// the sender is not itself a member.
    pub async fn voice_recipients(&self, room_id: &str, sender: &SocketId) -> Vec<Outbox> {
        let map = self.rooms.read().await;
        let Some(room) = map.get(room_id) else {
            return Vec::new();
        };
        if !room.members.contains_key(sender) {
            return Vec::new();
        }
        room.members
            .iter()
            .filter(|(sid, _)| *sid != sender)
            .map(|(_, tx)| tx.clone())
            .collect()
    }

    pub async fn roster(&self, room_id: &str) -> Vec<Participant> {
        self.rooms
            .read()
            .await
            .get(room_id)
            .map(|r| r.participants.clone())
            .unwrap_or_default()
    }

    /// Number of non-empty rooms.
    pub async fn count(&self) -> usize {
        self.rooms.read().await.len()
    }
}
