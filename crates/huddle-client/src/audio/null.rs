//! Backends for machines without audio hardware.

use async_trait::async_trait;
use huddle_common::{CaptureError, PlaybackError};

use super::capture::{AudioDevice, InputStream, SampleCallback};
use super::playback::{AudioBuffer, AudioSink, PlaybackContext};

/// A microphone that is never there. Every session joins listen-only.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDevice;

#[async_trait]
impl AudioDevice for NullDevice {
    async fn open_input(
        &self,
        _on_samples: SampleCallback,
    ) -> Result<Box<dyn InputStream>, CaptureError> {
        Err(CaptureError::DeviceUnavailable(
            "no capture backend compiled in".into(),
        ))
    }
}

/// Speakers that accept buffers and discard them.
#[derive(Debug, Clone, Copy)]
pub struct NullSink {
    sample_rate: u32,
}

impl NullSink {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }
}

impl AudioSink for NullSink {
    fn create_context(&self) -> Result<Box<dyn PlaybackContext>, PlaybackError> {
        Ok(Box::new(NullContext {
            sample_rate: self.sample_rate,
        }))
    }
}

struct NullContext {
    sample_rate: u32,
}

impl PlaybackContext for NullContext {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn schedule(&mut self, buffer: AudioBuffer) {
        tracing::trace!(samples = buffer.len(), "Discarding buffer");
    }

    fn close(&mut self) {}
}
