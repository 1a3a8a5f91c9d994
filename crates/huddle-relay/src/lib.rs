//! huddle-relay: WebSocket relay for room presence and voice.
//!
//! Every client connection may join rooms. The relay keeps the authoritative
//! roster per room, broadcasts it after each change, and forwards voice
//! frames to the other members of the sender's room. Frames are never
//! decoded beyond shape validation.

pub mod connection;
pub mod rooms;
pub mod server;

pub use rooms::RoomStore;
pub use server::{run, serve};
