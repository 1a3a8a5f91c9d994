//! Room membership as seen from one client.

mod machine;
mod types;

pub use machine::PresenceMachine;
pub use types::PresenceState;
