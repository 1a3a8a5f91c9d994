//! Signaling channel to the relay.
//!
//! One WebSocket per [`SignalingChannel`], driven by a background task.
//! Sends never block and never fail from the caller's point of view: if
//! the transport is down the message is dropped. Voice frames go through a
//! bounded queue and are dropped when it is full; join and leave are never
//! dropped while the socket is up and are written ahead of queued voice.
//! Inbound messages fan out to every live [`Subscription`] in arrival order.
//! A listener that falls behind loses voice frames, never rosters. When the
//! socket closes every subscription ends.
//!
//! There is no reconnect. Once the socket closes the channel stays down,
//! further sends are discarded and new subscriptions end immediately.

mod client;
mod connection;
mod listeners;
mod types;

pub use client::{Loopback, SignalingChannel};
pub use listeners::Subscription;
pub use types::ChannelConfig;
#[cfg(test)]
pub(crate) use types::LISTENER_QUEUE;
