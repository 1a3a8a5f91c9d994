use serde::{Deserialize, Serialize};

/// Settings for the client side of the signaling channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// WebSocket URL of the relay.
    pub server_url: String,
    pub connect_timeout_secs: u64,
    /// Outbound queue length. Sends beyond it are dropped.
    pub outbound_queue: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://localhost:5000".into(),
            connect_timeout_secs: 15,
            outbound_queue: 256,
        }
    }
}
