//! Playback pipeline: received frames → mono buffers → output context.

use std::sync::Arc;
use std::time::Duration;

use huddle_common::PlaybackError;
use tracing::{debug, warn};

/// One mono buffer at the context's sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl AudioBuffer {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate))
    }
}

/// Speakers. Creating a context acquires the output device.
pub trait AudioSink: Send + Sync {
    fn create_context(&self) -> Result<Box<dyn PlaybackContext>, PlaybackError>;
}

pub trait PlaybackContext: Send {
    fn sample_rate(&self) -> u32;

    /// Start playing `buffer` now. Buffers scheduled while others are still
    /// sounding overlap rather than queue.
    fn schedule(&mut self, buffer: AudioBuffer);

    /// Release the output device. Must tolerate repeated calls.
    fn close(&mut self);
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct PlaybackPipeline {
    sink: Arc<dyn AudioSink>,
    context: Option<Box<dyn PlaybackContext>>,
    frames_played: u64,
}

impl PlaybackPipeline {
    pub fn new(sink: Arc<dyn AudioSink>) -> Self {
        Self {
            sink,
            context: None,
            frames_played: 0,
        }
    }

    /// Play one received voice frame.
    ///
    /// The context is created on the first non-empty frame. Empty frames and
    /// frames with non-finite samples are skipped. If the output device is
    /// unavailable the frame is dropped and the next one retries.
    pub fn play_frame(&mut self, frame: &[f32]) {
        if frame.is_empty() {
            return;
        }
        if frame.iter().any(|s| !s.is_finite()) {
            debug!(samples = frame.len(), "Skipping frame with non-finite samples");
            return;
        }

        if self.context.is_none() {
            match self.sink.create_context() {
                Ok(ctx) => {
                    debug!(sample_rate = ctx.sample_rate(), "Playback context created");
                    self.context = Some(ctx);
                }
                Err(e) => {
                    warn!(error = %e, "Playback unavailable, dropping frame");
                    return;
                }
            }
        }

        if let Some(ctx) = self.context.as_mut() {
            let buffer = AudioBuffer {
                sample_rate: ctx.sample_rate(),
                samples: frame.to_vec(),
            };
            ctx.schedule(buffer);
            self.frames_played += 1;
        }
    }

    /// Close the context if one was created. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(mut ctx) = self.context.take() {
            ctx.close();
            debug!(frames = self.frames_played, "Playback context closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.context.is_some()
    }

    pub fn frames_played(&self) -> u64 {
        self.frames_played
    }
}

impl Drop for PlaybackPipeline {
    fn drop(&mut self) {
        self.close();
    }
}
