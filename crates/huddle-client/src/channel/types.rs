use huddle_config::ClientConfig;

/// Per-listener inbound voice queue length. A listener that falls this far
/// behind loses voice frames rather than stalling the socket. Rosters are
/// not counted against it.
pub(crate) const LISTENER_QUEUE: usize = 256;

/// Connection settings for a [`SignalingChannel`](super::SignalingChannel).
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub url: String,
    pub connect_timeout_secs: u64,
    pub outbound_queue: usize,
}

impl ChannelConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::from(&ClientConfig::default())
        }
    }
}

impl From<&ClientConfig> for ChannelConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            url: config.server_url.clone(),
            connect_timeout_secs: config.connect_timeout_secs,
            outbound_queue: config.outbound_queue.max(1),
        }
    }
}
