//! Scriptable audio backends for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use huddle_common::{CaptureError, PlaybackError};

use crate::audio::{AudioBuffer, AudioDevice, AudioSink, InputStream, PlaybackContext, SampleCallback};

/// Shared record of teardown steps, in the order they happened.
pub(crate) type EventLog = Arc<Mutex<Vec<&'static str>>>;

// ---------------------------------------------------------------------------
// Device
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub(crate) struct FakeDevice {
    failure: Option<CaptureError>,
    callback: Arc<Mutex<Option<SampleCallback>>>,
    opens: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    log: EventLog,
}

impl FakeDevice {
    pub(crate) fn granted() -> Self {
        Self::default()
    }

    pub(crate) fn failing(err: CaptureError) -> Self {
        Self {
            failure: Some(err),
            ..Self::default()
        }
    }

    pub(crate) fn with_log(mut self, log: EventLog) -> Self {
        self.log = log;
        self
    }

    /// Push samples through the open stream's callback, if any.
    pub(crate) fn feed(&self, samples: &[f32]) {
        if let Some(cb) = self.callback.lock().unwrap().as_mut() {
            cb(samples);
        }
    }

    pub(crate) fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub(crate) fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioDevice for FakeDevice {
    async fn open_input(
        &self,
        on_samples: SampleCallback,
    ) -> Result<Box<dyn InputStream>, CaptureError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        *self.callback.lock().unwrap() = Some(on_samples);
        Ok(Box::new(FakeStream {
            device: self.clone(),
            closed: false,
        }))
    }
}

struct FakeStream {
    device: FakeDevice,
    closed: bool,
}

impl InputStream for FakeStream {
    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.device.callback.lock().unwrap().take();
        self.device.closes.fetch_add(1, Ordering::SeqCst);
        self.device.log.lock().unwrap().push("capture-closed");
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub(crate) struct RecordingSink {
    sample_rate: u32,
    fail: bool,
    buffers: Arc<Mutex<Vec<AudioBuffer>>>,
    attempts: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    log: EventLog,
}

impl RecordingSink {
    pub(crate) fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn with_log(mut self, log: EventLog) -> Self {
        self.log = log;
        self
    }

    pub(crate) fn buffers(&self) -> Vec<AudioBuffer> {
        self.buffers.lock().unwrap().clone()
    }

    /// Successful context creations.
    pub(crate) fn created(&self) -> usize {
        if self.fail {
            0
        } else {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl AudioSink for RecordingSink {
    fn create_context(&self) -> Result<Box<dyn PlaybackContext>, PlaybackError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PlaybackError::DeviceUnavailable("test sink".into()));
        }
        Ok(Box::new(RecordingContext {
            sink: self.clone(),
            closed: false,
        }))
    }
}

struct RecordingContext {
    sink: RecordingSink,
    closed: bool,
}

impl PlaybackContext for RecordingContext {
    fn sample_rate(&self) -> u32 {
        self.sink.sample_rate
    }

    fn schedule(&mut self, buffer: AudioBuffer) {
        self.sink.buffers.lock().unwrap().push(buffer);
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.sink.closes.fetch_add(1, Ordering::SeqCst);
        self.sink.log.lock().unwrap().push("playback-closed");
    }
}
