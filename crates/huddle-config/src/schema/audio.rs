//! Audio capture and playback settings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Samples per outbound voice frame.
    pub frame_size: usize,
    /// Preferred device sample rate in Hz.
    pub sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            frame_size: 4096,
            sample_rate: 48000,
        }
    }
}
