//! Capture pipeline: microphone samples → fixed frames → voice messages.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use huddle_common::{CaptureError, ClientMessage};
use tracing::info;

use super::framer::Framer;
use crate::channel::SignalingChannel;

/// Called from the device's audio thread with mono samples in `[-1.0, 1.0]`.
pub type SampleCallback = Box<dyn FnMut(&[f32]) + Send + 'static>;

/// A microphone.
#[async_trait]
pub trait AudioDevice: Send + Sync {
    /// Request access and start delivering samples to `on_samples`.
    ///
    /// Resolves once access is granted or refused. A refused or missing
    /// device yields the matching [`CaptureError`].
    async fn open_input(
        &self,
        on_samples: SampleCallback,
    ) -> Result<Box<dyn InputStream>, CaptureError>;
}

/// A running input stream. Closing stops the callbacks and releases the
/// device. Must tolerate being closed more than once.
pub trait InputStream: Send {
    fn close(&mut self);
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct CapturePipeline {
    device: Arc<dyn AudioDevice>,
    channel: SignalingChannel,
    frame_size: usize,
}

impl CapturePipeline {
    pub fn new(device: Arc<dyn AudioDevice>, channel: SignalingChannel, frame_size: usize) -> Self {
        Self {
            device,
            channel,
            frame_size,
        }
    }

    /// Open the microphone and start streaming frames for `room_id`.
    ///
    /// Each completed frame is sent as one `voice` message. Frames go out in
    /// capture order; the send never blocks the audio thread.
    pub async fn start(&self, room_id: &str) -> Result<CaptureHandle, CaptureError> {
        let frames_sent = Arc::new(AtomicU64::new(0));

        let mut framer = Framer::new(self.frame_size);
        let channel = self.channel.clone();
        let room = room_id.to_string();
        let counter = Arc::clone(&frames_sent);
        let on_samples: SampleCallback = Box::new(move |samples: &[f32]| {
            framer.push(samples, |audio| {
                channel.send(ClientMessage::Voice {
                    room_id: room.clone(),
                    audio,
                });
                counter.fetch_add(1, Ordering::Relaxed);
            });
        });

        let stream = self.device.open_input(on_samples).await?;
        info!(room_id, frame_size = self.frame_size, "Capture started");

        Ok(CaptureHandle {
            stream: Some(stream),
            room_id: room_id.to_string(),
            frames_sent,
        })
    }
}

/// A live capture. Stopping is idempotent and also happens on drop.
pub struct CaptureHandle {
    stream: Option<Box<dyn InputStream>>,
    room_id: String,
    frames_sent: Arc<AtomicU64>,
}

impl CaptureHandle {
    pub fn stop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.close();
            info!(
                room_id = %self.room_id,
                frames = self.frames_sent(),
                "Capture stopped"
            );
        }
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for CaptureHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureHandle")
            .field("room_id", &self.room_id)
            .field("active", &self.is_active())
            .field("frames_sent", &self.frames_sent())
            .finish()
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
