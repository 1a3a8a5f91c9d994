//! Public handle for the signaling connection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use huddle_common::{ClientMessage, ServerMessage};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::connection::connection_task;
use super::listeners::{Listeners, Subscription};
use super::types::ChannelConfig;

// ---------------------------------------------------------------------------
// Outbound queues
// ---------------------------------------------------------------------------

/// Join and leave travel on their own unbounded queue so a backlog of voice
/// frames can never push them out. Voice is bounded and dropped when full.
#[derive(Clone)]
struct OutboundTx {
    control: mpsc::UnboundedSender<ClientMessage>,
    voice: mpsc::Sender<ClientMessage>,
}

/// Receiving side of both queues. Control messages always come out first.
pub(crate) struct OutboundRx {
    control: mpsc::UnboundedReceiver<ClientMessage>,
    voice: mpsc::Receiver<ClientMessage>,
}

fn outbound(voice_capacity: usize) -> (OutboundTx, OutboundRx) {
    let (control, control_rx) = mpsc::unbounded_channel();
    let (voice, voice_rx) = mpsc::channel(voice_capacity.max(1));
    (
        OutboundTx { control, voice },
        OutboundRx {
            control: control_rx,
            voice: voice_rx,
        },
    )
}

impl OutboundTx {
    fn is_closed(&self) -> bool {
        self.control.is_closed()
    }
}

impl OutboundRx {
    /// Next message to write. `None` once every channel handle is gone and
    /// both queues are empty.
    pub(crate) async fn recv(&mut self) -> Option<ClientMessage> {
        tokio::select! {
            biased;
            Some(msg) = self.control.recv() => Some(msg),
            Some(msg) = self.voice.recv() => Some(msg),
            else => None,
        }
    }

    pub(crate) fn try_recv(&mut self) -> Option<ClientMessage> {
        self.control
            .try_recv()
            .ok()
            .or_else(|| self.voice.try_recv().ok())
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// Cheap to clone; every clone talks to the same connection.
///
/// `send` is callable from any thread, including an audio callback.
#[derive(Clone)]
pub struct SignalingChannel {
    outbound: OutboundTx,
    listeners: Listeners,
    connected: Arc<AtomicBool>,
}

impl SignalingChannel {
    /// Start the background connection. Must be called inside a tokio runtime.
    pub fn connect(config: ChannelConfig) -> Self {
        let (outbound, outbound_rx) = outbound(config.outbound_queue);
        let listeners = Listeners::default();
        let connected = Arc::new(AtomicBool::new(false));

        tokio::spawn(connection_task(
            config,
            outbound_rx,
            listeners.clone(),
            Arc::clone(&connected),
        ));

        Self {
            outbound,
            listeners,
            connected,
        }
    }

    /// A channel wired to an in-process [`Loopback`] instead of a socket.
    /// `capacity` bounds the voice queue.
    pub fn loopback(capacity: usize) -> (Self, Loopback) {
        let (outbound, outbound_rx) = outbound(capacity);
        let listeners = Listeners::default();
        let channel = Self {
            outbound,
            listeners: listeners.clone(),
            connected: Arc::new(AtomicBool::new(true)),
        };
        (
            channel,
            Loopback {
                outbound_rx,
                listeners,
            },
        )
    }

    /// Queue a message for the relay.
    ///
    /// Voice frames are dropped when their queue is full. Join and leave are
    /// always queued. Anything sent while the transport is down is discarded.
    pub fn send(&self, msg: ClientMessage) {
        if let ClientMessage::Voice { .. } = msg {
            match self.outbound.voice.try_send(msg) {
                Ok(()) => {}
                Err(TrySendError::Full(msg)) => {
                    tracing::debug!(event = msg.event(), "Voice queue full, dropping");
                }
                Err(TrySendError::Closed(msg)) => {
                    tracing::trace!(event = msg.event(), "Transport unavailable, dropping");
                }
            }
            return;
        }
        if let Err(mpsc::error::SendError(msg)) = self.outbound.control.send(msg) {
            tracing::trace!(event = msg.event(), "Transport unavailable, dropping");
        }
    }

    /// Register an inbound listener. It receives every message that arrives
    /// after this call, until dropped.
    pub fn subscribe(&self) -> Subscription {
        self.listeners.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && !self.outbound.is_closed()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl std::fmt::Debug for SignalingChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalingChannel")
            .field("connected", &self.is_connected())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Loopback
// ---------------------------------------------------------------------------

/// The far end of a loopback channel: read what the client sent, inject
/// what the relay would say. Reads follow the socket's write order: queued
/// joins and leaves come out before queued voice.
pub struct Loopback {
    outbound_rx: OutboundRx,
    listeners: Listeners,
}

impl Loopback {
    /// Deliver a message to every listener as if it came from the relay.
    pub fn deliver(&self, msg: ServerMessage) {
        self.listeners.dispatch(msg);
    }

    pub async fn recv(&mut self) -> Option<ClientMessage> {
        self.outbound_rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<ClientMessage> {
        self.outbound_rx.try_recv()
    }

    /// Everything sent so far.
    pub fn drain(&mut self) -> Vec<ClientMessage> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

/// Dropping the far end closes listeners the way a closed socket does.
impl Drop for Loopback {
    fn drop(&mut self) {
        self.listeners.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_common::User;

    fn join(room: &str) -> ClientMessage {
        ClientMessage::JoinRoom {
            room_id: room.into(),
            user: User::new("Alice", None),
        }
    }

    #[test]
    fn loopback_carries_sends_in_order() {
        let (channel, mut far) = SignalingChannel::loopback(8);
        channel.send(join("a"));
        channel.send(join("b"));

        let rooms: Vec<String> = far
            .drain()
            .into_iter()
            .map(|m| match m {
                ClientMessage::JoinRoom { room_id, .. } => room_id,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(rooms, ["a", "b"]);
    }

    fn leave() -> ClientMessage {
        ClientMessage::LeaveRoom {
            room_id: "a".into(),
            user_id: None,
        }
    }

    fn voice() -> ClientMessage {
        ClientMessage::Voice {
            room_id: "a".into(),
            audio: vec![0.0; 4],
        }
    }

    #[test]
    fn full_voice_queue_drops_silently() {
        let (channel, mut far) = SignalingChannel::loopback(1);
        channel.send(voice());
        channel.send(voice());
        assert_eq!(far.drain().len(), 1);
    }

    #[test]
    fn join_and_leave_survive_a_full_voice_queue() {
        let (channel, mut far) = SignalingChannel::loopback(2);
        channel.send(join("a"));
        for _ in 0..5 {
            channel.send(voice());
        }
        channel.send(leave());

        let events: Vec<&str> = far.drain().iter().map(ClientMessage::event).collect();
        assert_eq!(events, ["join-room", "leave-room", "voice", "voice"]);
    }

    #[tokio::test]
    async fn recv_prefers_control_over_queued_voice() {
        let (channel, mut far) = SignalingChannel::loopback(4);
        channel.send(voice());
        channel.send(leave());

        assert_eq!(far.recv().await, Some(leave()));
        assert_eq!(far.recv().await.map(|m| m.event()), Some("voice"));
        drop(channel);
        assert_eq!(far.recv().await, None);
    }

    #[test]
    fn send_after_far_end_gone_is_a_no_op() {
        let (channel, far) = SignalingChannel::loopback(4);
        drop(far);
        channel.send(join("a"));
        assert!(!channel.is_connected());
    }

    #[test]
    fn clones_share_listeners() {
        let (channel, far) = SignalingChannel::loopback(4);
        let other = channel.clone();
        let mut sub = other.subscribe();
        assert_eq!(channel.listener_count(), 1);

        far.deliver(ServerMessage::Participants(vec![]));
        assert_eq!(sub.try_recv(), Some(ServerMessage::Participants(vec![])));
    }

    #[tokio::test]
    async fn far_end_gone_ends_subscriptions() {
        let (channel, far) = SignalingChannel::loopback(4);
        let mut sub = channel.subscribe();
        drop(far);
        assert_eq!(sub.recv().await, None);
        assert_eq!(channel.listener_count(), 0);
    }

    #[tokio::test]
    async fn unreachable_relay_leaves_channel_down() {
        let channel = SignalingChannel::connect(ChannelConfig {
            url: "ws://127.0.0.1:1".into(),
            connect_timeout_secs: 2,
            outbound_queue: 4,
        });
        let mut sub = channel.subscribe();
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        assert!(!channel.is_connected());
        channel.send(join("a"));
        assert_eq!(sub.recv().await, None);
    }
}
