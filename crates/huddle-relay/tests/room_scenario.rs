//! End-to-end relay behaviour over real WebSocket connections.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use huddle_common::{ClientMessage, Participant, ServerMessage, User};
use huddle_relay::RoomStore;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_relay() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(huddle_relay::run(listener, RoomStore::new(), 64));
    format!("ws://{addr}")
}

async fn connect(url: &str) -> Ws {
    let (ws, _) = connect_async(url).await.unwrap();
    ws
}

fn user(id: &str, name: &str) -> User {
    User {
        user_id: id.into(),
        name: name.into(),
        pic: None,
    }
}

async fn send(ws: &mut Ws, msg: &ClientMessage) {
    let json = serde_json::to_string(msg).unwrap();
    ws.send(Message::Text(json.into())).await.unwrap();
}

async fn join(ws: &mut Ws, room: &str, u: User) {
    send(ws, &ClientMessage::JoinRoom { room_id: room.into(), user: u }).await;
}

async fn recv(ws: &mut Ws) -> ServerMessage {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for relay")
            .expect("connection closed")
            .unwrap();
        if let Message::Text(text) = frame {
            return ServerMessage::parse(text.as_str()).unwrap();
        }
    }
}

async fn recv_roster(ws: &mut Ws) -> Vec<Participant> {
    match recv(ws).await {
        ServerMessage::Participants(list) => list,
        other => panic!("expected roster, got {other:?}"),
    }
}

fn names(roster: &[Participant]) -> Vec<String> {
    roster.iter().map(|p| p.name().to_string()).collect()
}

#[tokio::test]
async fn two_clients_join_talk_and_leave() {
    let url = start_relay().await;
    let mut a = connect(&url).await;
    let mut b = connect(&url).await;

    join(&mut a, "abc", user("Alice-1", "Alice")).await;
    assert_eq!(names(&recv_roster(&mut a).await), ["Alice"]);

    join(&mut b, "abc", user("Bob-2", "Bob")).await;
    assert_eq!(names(&recv_roster(&mut a).await), ["Alice", "Bob"]);
    assert_eq!(names(&recv_roster(&mut b).await), ["Alice", "Bob"]);

    send(
        &mut a,
        &ClientMessage::Voice {
            room_id: "abc".into(),
            audio: vec![0.0; 4096],
        },
    )
    .await;
    match recv(&mut b).await {
        ServerMessage::Voice(payload) => {
            assert_eq!(payload.samples().len(), 4096);
            assert!(payload.samples().iter().all(|s| *s == 0.0));
        }
        other => panic!("expected voice, got {other:?}"),
    }

    send(
        &mut b,
        &ClientMessage::LeaveRoom {
            room_id: "abc".into(),
            user_id: Some("Bob-2".into()),
        },
    )
    .await;
    assert_eq!(names(&recv_roster(&mut a).await), ["Alice"]);
}

#[tokio::test]
async fn sender_does_not_hear_itself() {
    let url = start_relay().await;
    let mut a = connect(&url).await;
    let mut b = connect(&url).await;

    join(&mut a, "echo", user("Alice-1", "Alice")).await;
    recv_roster(&mut a).await;
    join(&mut b, "echo", user("Bob-2", "Bob")).await;
    recv_roster(&mut a).await;
    recv_roster(&mut b).await;

    send(
        &mut a,
        &ClientMessage::Voice {
            room_id: "echo".into(),
            audio: vec![0.5; 8],
        },
    )
    .await;
    assert!(matches!(recv(&mut b).await, ServerMessage::Voice(_)));

    // The next thing A sees is B's leave broadcast, not its own frame.
    send(
        &mut b,
        &ClientMessage::LeaveRoom {
            room_id: "echo".into(),
            user_id: Some("Bob-2".into()),
        },
    )
    .await;
    assert_eq!(names(&recv_roster(&mut a).await), ["Alice"]);
}

#[tokio::test]
async fn duplicate_join_collapses_to_one_entry() {
    let url = start_relay().await;
    let mut a = connect(&url).await;

    join(&mut a, "dup", user("Alice-1", "Alice")).await;
    recv_roster(&mut a).await;
    join(&mut a, "dup", user("Alice-1", "Alice")).await;

    let roster = recv_roster(&mut a).await;
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].user_id(), "Alice-1");
}

#[tokio::test]
async fn dropped_connection_leaves_the_roster() {
    let url = start_relay().await;
    let mut a = connect(&url).await;
    let mut b = connect(&url).await;

    join(&mut a, "drop", user("Alice-1", "Alice")).await;
    recv_roster(&mut a).await;
    join(&mut b, "drop", user("Bob-2", "Bob")).await;
    recv_roster(&mut a).await;

    b.close(None).await.unwrap();
    drop(b);

    assert_eq!(names(&recv_roster(&mut a).await), ["Alice"]);
}

#[tokio::test]
async fn malformed_frames_are_ignored() {
    let url = start_relay().await;
    let mut a = connect(&url).await;

    a.send(Message::Text("{not json".to_string().into())).await.unwrap();
    a.send(Message::Text(r#"{"event":"voice","data":{"audio":"loud"}}"#.to_string().into()))
        .await
        .unwrap();

    // The connection survives and still serves joins.
    join(&mut a, "ok", user("Alice-1", "Alice")).await;
    assert_eq!(names(&recv_roster(&mut a).await), ["Alice"]);
}
