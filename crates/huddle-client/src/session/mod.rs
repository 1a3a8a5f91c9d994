//! One room visit: identity, presence, capture and playback sequenced
//! behind a single controller.

mod controller;
mod types;


pub use controller::SessionController;
pub use types::{JoinOutcome, JoinRequest, SessionEvent, Surface};
