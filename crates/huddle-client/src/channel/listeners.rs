//! Inbound listener registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use huddle_common::ServerMessage;
use tokio::sync::mpsc;

use super::types::LISTENER_QUEUE;

/// Sending half of one listener. Messages stay in arrival order. Rosters are
/// never dropped; voice is dropped once `LISTENER_QUEUE` frames are pending.
struct ListenerTx {
    tx: mpsc::UnboundedSender<ServerMessage>,
    pending_voice: Arc<AtomicUsize>,
}

impl ListenerTx {
    /// `false` once the listener is gone.
    fn offer(&self, id: u64, msg: &ServerMessage) -> bool {
        if let ServerMessage::Voice(_) = msg {
            if self.pending_voice.load(Ordering::Acquire) >= LISTENER_QUEUE {
                tracing::debug!(listener = id, "Listener behind on voice, dropping");
                return !self.tx.is_closed();
            }
            self.pending_voice.fetch_add(1, Ordering::AcqRel);
        }
        self.tx.send(msg.clone()).is_ok()
    }
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    senders: HashMap<u64, ListenerTx>,
    closed: bool,
}

#[derive(Clone, Default)]
pub(crate) struct Listeners {
    inner: Arc<Mutex<Registry>>,
}

impl Listeners {
    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending_voice = Arc::new(AtomicUsize::new(0));
        let mut reg = self.lock();
        let id = reg.next_id;
        reg.next_id += 1;
        // Once closed, new listeners start out ended.
        if !reg.closed {
            let sender = ListenerTx {
                tx,
                pending_voice: Arc::clone(&pending_voice),
            };
            reg.senders.insert(id, sender);
        }
        Subscription {
            id,
            rx,
            pending_voice,
            listeners: self.clone(),
        }
    }

    pub(crate) fn unsubscribe(&self, id: u64) {
        self.lock().senders.remove(&id);
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().senders.len()
    }

    /// Forget every listener. Their pending messages can still be read, then
    /// `recv` returns `None`.
    pub(crate) fn close(&self) {
        let mut reg = self.lock();
        reg.closed = true;
        reg.senders.clear();
    }

    /// Hand a message to every listener. Closed listeners are pruned.
    pub(crate) fn dispatch(&self, msg: ServerMessage) {
        self.lock().senders.retain(|id, sender| sender.offer(*id, &msg));
    }
}

/// A registered inbound listener. Dropping it deregisters.
pub struct Subscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<ServerMessage>,
    pending_voice: Arc<AtomicUsize>,
    listeners: Listeners,
}

impl Subscription {
    /// Wait for the next inbound message. `None` once the channel is gone.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        let msg = self.rx.recv().await?;
        Some(self.taken(msg))
    }

    /// Next queued message without waiting.
    pub fn try_recv(&mut self) -> Option<ServerMessage> {
        let msg = self.rx.try_recv().ok()?;
        Some(self.taken(msg))
    }

    fn taken(&self, msg: ServerMessage) -> ServerMessage {
        if let ServerMessage::Voice(_) = msg {
            self.pending_voice.fetch_sub(1, Ordering::AcqRel);
        }
        msg
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.listeners.unsubscribe(self.id);
    }
}
