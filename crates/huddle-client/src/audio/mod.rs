//! Microphone capture and speaker playback.
//!
//! Devices sit behind two traits: [`AudioDevice`] produces mono `f32`
//! samples from the microphone and [`AudioSink`] plays mono buffers. The
//! pipelines on top are device-agnostic. [`CapturePipeline`] frames samples
//! and sends them as voice messages. [`PlaybackPipeline`] turns received
//! frames into buffers scheduled on a lazily created context.

mod capture;
mod framer;
mod null;
mod playback;

#[cfg(feature = "native-audio")]
pub mod native;

use std::sync::Arc;

pub use capture::{AudioDevice, CaptureHandle, CapturePipeline, InputStream, SampleCallback};
pub use framer::Framer;
pub use null::{NullDevice, NullSink};
pub use playback::{AudioBuffer, AudioSink, PlaybackContext, PlaybackPipeline};

use huddle_config::AudioConfig;

/// The device pair and framing a session uses.
#[derive(Clone)]
pub struct AudioBackend {
    pub device: Arc<dyn AudioDevice>,
    pub sink: Arc<dyn AudioSink>,
    /// Samples per outbound voice frame.
    pub frame_size: usize,
}

impl AudioBackend {
    pub fn new(
        device: Arc<dyn AudioDevice>,
        sink: Arc<dyn AudioSink>,
        config: &AudioConfig,
    ) -> Self {
        Self {
            device,
            sink,
            frame_size: config.frame_size,
        }
    }

    /// No microphone, silent speakers. Joins succeed as listen-only.
    pub fn null(config: &AudioConfig) -> Self {
        Self::new(
            Arc::new(NullDevice),
            Arc::new(NullSink::new(config.sample_rate)),
            config,
        )
    }

    /// The system's default input and output through cpal.
    #[cfg(feature = "native-audio")]
    pub fn native(config: &AudioConfig) -> Self {
        Self::new(
            Arc::new(native::CpalDevice::default()),
            Arc::new(native::CpalSink::default()),
            config,
        )
    }
}

impl std::fmt::Debug for AudioBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioBackend")
            .field("frame_size", &self.frame_size)
            .finish_non_exhaustive()
    }
}
