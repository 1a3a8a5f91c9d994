use serde::{Deserialize, Serialize};

/// Settings for the relay server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Interface to bind the listener to.
    pub bind: String,
    pub port: u16,
    /// Per-connection outbound queue length. Messages beyond it are dropped.
    pub outbound_queue: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 5000,
            outbound_queue: 256,
        }
    }
}

impl RelayConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
