//! Configuration schema types for Huddle.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod audio;
mod client;
mod identity;
mod relay;
mod system;

pub use audio::*;
pub use client::*;
pub use identity::*;
pub use relay::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration. Only override what you want to change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HuddleConfig {
    pub relay: RelayConfig,
    pub client: ClientConfig,
    pub audio: AudioConfig,
    pub identity: IdentityConfig,
    pub logging: LoggingConfig,
}
