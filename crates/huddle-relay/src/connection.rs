//! Per-connection handler: assign a socket id, then dispatch client
//! messages and forward queued frames until the transport drops.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use huddle_common::{new_socket_id, ClientMessage, ServerMessage, SocketId};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::rooms::{Broadcast, Outbox, RoomStore};

/// Handle a single WebSocket connection.
pub async fn handle_connection(
    ws: tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>,
    addr: SocketAddr,
    store: RoomStore,
    queue_len: usize,
) {
    let (mut sink, mut stream) = ws.split();
    let socket_id = new_socket_id();
    let (tx, mut rx) = mpsc::channel::<String>(queue_len);

    tracing::info!(peer = %addr, socket = %socket_id, "Client connected");

    loop {
        tokio::select! {
            // Queued frames for this client → its WebSocket
            Some(msg) = rx.recv() => {
                if sink.send(Message::Text(msg.into())).await.is_err() {
                    break;
                }
            }

            // Frames from this client → room store
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => match ClientMessage::parse(text.as_str()) {
                        Ok(msg) => dispatch(msg, &socket_id, &tx, &store).await,
                        Err(e) => {
                            tracing::debug!(peer = %addr, error = %e, "Dropping malformed message");
                        }
                    },
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(peer = %addr, error = %e, "WS error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    tracing::info!(peer = %addr, socket = %socket_id, "Client disconnected");

    for broadcast in store.disconnect(&socket_id).await {
        deliver(&broadcast);
    }
}

/// Apply one client message to the room store and fan out the results.
async fn dispatch(msg: ClientMessage, socket_id: &SocketId, own_tx: &Outbox, store: &RoomStore) {
    match msg {
        ClientMessage::JoinRoom { room_id, user } => {
            tracing::info!(room_id = %room_id, user_id = %user.user_id, socket = %socket_id, "join-room");
            let broadcast = store.join(&room_id, user, socket_id, own_tx.clone()).await;
            deliver(&broadcast);
        }
        ClientMessage::LeaveRoom { room_id, user_id } => {
            tracing::info!(room_id = %room_id, user_id = ?user_id, socket = %socket_id, "leave-room");
            if let Some(broadcast) = store.leave(&room_id, user_id.as_deref(), socket_id).await {
                deliver(&broadcast);
            }
        }
        ClientMessage::Voice { room_id, audio } => {
            let recipients = store.voice_recipients(&room_id, socket_id).await;
            if recipients.is_empty() {
                return;
            }
            tracing::trace!(room_id = %room_id, samples = audio.len(), peers = recipients.len(), "voice");
            fan_out(&ServerMessage::voice(audio), &recipients);
        }
    }
}

/// Send a roster snapshot to every member of its room.
fn deliver(broadcast: &Broadcast) {
    tracing::debug!(
        room_id = %broadcast.room_id,
        participants = broadcast.roster.len(),
        recipients = broadcast.recipients.len(),
        "Broadcasting roster"
    );
    fan_out(
        &ServerMessage::Participants(broadcast.roster.clone()),
        &broadcast.recipients,
    );
}

/// Serialize once, then queue on each outbox. Full or closed queues drop
/// the frame for that recipient only.
fn fan_out(msg: &ServerMessage, recipients: &[Outbox]) {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize server message");
            return;
        }
    };
    for tx in recipients {
        if let Err(e) = tx.try_send(json.clone()) {
            tracing::debug!(event = msg.event(), error = %e, "Dropping frame for slow or closed peer");
        }
    }
}
