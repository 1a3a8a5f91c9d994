//! cpal-backed microphone and speakers.
//!
//! `cpal::Stream` is not `Send`, so each stream lives on a dedicated thread
//! that builds it, plays it, and parks until told to stop. The handles
//! returned here only hold the control channel.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use huddle_common::{CaptureError, PlaybackError};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use super::capture::{AudioDevice, InputStream, SampleCallback};
use super::playback::{AudioBuffer, AudioSink, PlaybackContext};

fn capture_build_error(e: cpal::BuildStreamError) -> CaptureError {
    match e {
        cpal::BuildStreamError::DeviceNotAvailable => {
            CaptureError::DeviceUnavailable("input device disappeared".into())
        }
        other => CaptureError::StreamError(other.to_string()),
    }
}

fn playback_build_error(e: cpal::BuildStreamError) -> PlaybackError {
    match e {
        cpal::BuildStreamError::DeviceNotAvailable => {
            PlaybackError::DeviceUnavailable("output device disappeared".into())
        }
        other => PlaybackError::StreamError(other.to_string()),
    }
}

/// Streams here are always built as `f32`. Keep the device default when it
/// already is one, otherwise take an `f32` range at the default rate, or the
/// first `f32` range at its highest rate.
fn f32_config(
    default: cpal::SupportedStreamConfig,
    ranges: impl IntoIterator<Item = cpal::SupportedStreamConfigRange>,
) -> Option<cpal::StreamConfig> {
    if default.sample_format() == cpal::SampleFormat::F32 {
        return Some(default.config());
    }
    let rate = default.sample_rate();
    let candidates: Vec<_> = ranges
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .collect();
    candidates
        .iter()
        .find(|c| c.min_sample_rate() <= rate && rate <= c.max_sample_rate())
        .cloned()
        .map(|c| c.with_sample_rate(rate))
        .or_else(|| candidates.into_iter().next().map(|c| c.with_max_sample_rate()))
        .map(|c| c.config())
}

// ---------------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------------

/// The default (or a named) input device.
#[derive(Debug, Clone, Default)]
pub struct CpalDevice {
    device_name: Option<String>,
}

impl CpalDevice {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            device_name: Some(name.into()),
        }
    }
}

fn find_input(name: Option<&str>) -> Result<cpal::Device, CaptureError> {
    let host = cpal::default_host();
    match name {
        None => host
            .default_input_device()
            .ok_or_else(|| CaptureError::DeviceUnavailable("no default input device".into())),
        Some(wanted) => host
            .input_devices()
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?
            .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
            .ok_or_else(|| CaptureError::DeviceUnavailable(format!("no input device named {wanted}"))),
    }
}

fn build_input(
    name: Option<&str>,
    mut on_samples: SampleCallback,
) -> Result<cpal::Stream, CaptureError> {
    let device = find_input(name)?;
    let default = device
        .default_input_config()
        .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;
    let ranges = device
        .supported_input_configs()
        .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;
    let config = f32_config(default, ranges).ok_or_else(|| {
        CaptureError::DeviceUnavailable("input device offers no f32 format".into())
    })?;
    let channels = usize::from(config.channels.max(1));

    info!(
        device = %device.name().unwrap_or_default(),
        sample_rate = config.sample_rate.0,
        channels,
        "Opening input device"
    );

    let mut mono = Vec::new();
    device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if channels == 1 {
                    on_samples(data);
                    return;
                }
                // First channel only.
                mono.clear();
                mono.extend(data.chunks(channels).map(|frame| frame[0]));
                on_samples(&mono);
            },
            |err| error!("Audio capture stream error: {}", err),
            None,
        )
        .map_err(capture_build_error)
}

#[async_trait]
impl AudioDevice for CpalDevice {
    async fn open_input(
        &self,
        on_samples: SampleCallback,
    ) -> Result<Box<dyn InputStream>, CaptureError> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);
        let name = self.device_name.clone();

        std::thread::Builder::new()
            .name("huddle-capture".into())
            .spawn(move || {
                let stream = match build_input(name.as_deref(), on_samples) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(CaptureError::StreamError(e.to_string())));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                // Park until stopped or the handle is dropped.
                let _ = stop_rx.blocking_recv();
                drop(stream);
                info!("Capture thread stopped");
            })
            .map_err(|e| CaptureError::StreamError(e.to_string()))?;

        match ready_rx.await {
            Ok(Ok(())) => Ok(Box::new(CpalInput {
                stop_tx: Some(stop_tx),
            })),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CaptureError::StreamError("capture thread exited".into())),
        }
    }
}

struct CpalInput {
    stop_tx: Option<mpsc::Sender<()>>,
}

impl InputStream for CpalInput {
    fn close(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.try_send(());
        }
    }
}

impl Drop for CpalInput {
    fn drop(&mut self) {
        self.close();
    }
}

// ---------------------------------------------------------------------------
// Playback
// ---------------------------------------------------------------------------

/// One scheduled buffer and how far into it the output has read.
struct Voice {
    samples: Vec<f32>,
    pos: usize,
}

/// Buffers currently sounding. Overlapping buffers are summed.
#[derive(Default)]
struct Mixer {
    voices: Vec<Voice>,
}

impl Mixer {
    fn next_sample(&mut self) -> f32 {
        let mut sum = 0.0;
        for voice in &mut self.voices {
            if let Some(s) = voice.samples.get(voice.pos) {
                sum += *s;
                voice.pos += 1;
            }
        }
        self.voices.retain(|v| v.pos < v.samples.len());
        sum.clamp(-1.0, 1.0)
    }

    fn fill(&mut self, data: &mut [f32], channels: usize) {
        for frame in data.chunks_mut(channels) {
            frame.fill(self.next_sample());
        }
    }
}

/// The default output device.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpalSink;

impl AudioSink for CpalSink {
    fn create_context(&self) -> Result<Box<dyn PlaybackContext>, PlaybackError> {
        let mixer = Arc::new(Mutex::new(Mixer::default()));
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();
        let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);
        let thread_mixer = Arc::clone(&mixer);

        std::thread::Builder::new()
            .name("huddle-playback".into())
            .spawn(move || {
                let (stream, sample_rate) = match build_output(thread_mixer) {
                    Ok(opened) => opened,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(PlaybackError::StreamError(e.to_string())));
                    return;
                }
                let _ = ready_tx.send(Ok(sample_rate));

                let _ = stop_rx.blocking_recv();
                drop(stream);
                info!("Playback thread stopped");
            })
            .map_err(|e| PlaybackError::StreamError(e.to_string()))?;

        // Device open is short; wait for it so the caller learns the rate.
        let sample_rate = ready_rx
            .recv()
            .map_err(|_| PlaybackError::StreamError("playback thread exited".into()))??;

        Ok(Box::new(CpalContext {
            sample_rate,
            mixer,
            stop_tx: Some(stop_tx),
            mismatch_warned: false,
        }))
    }
}

fn build_output(mixer: Arc<Mutex<Mixer>>) -> Result<(cpal::Stream, u32), PlaybackError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| PlaybackError::DeviceUnavailable("no default output device".into()))?;
    let default = device
        .default_output_config()
        .map_err(|e| PlaybackError::DeviceUnavailable(e.to_string()))?;
    let ranges = device
        .supported_output_configs()
        .map_err(|e| PlaybackError::DeviceUnavailable(e.to_string()))?;
    let config = f32_config(default, ranges).ok_or_else(|| {
        PlaybackError::DeviceUnavailable("output device offers no f32 format".into())
    })?;
    let channels = usize::from(config.channels.max(1));
    let sample_rate = config.sample_rate.0;

    info!(
        device = %device.name().unwrap_or_default(),
        sample_rate,
        channels,
        "Opening output device"
    );

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| match mixer.lock() {
                Ok(mut mixer) => mixer.fill(data, channels),
                Err(_) => data.fill(0.0),
            },
            |err| error!("Audio playback stream error: {}", err),
            None,
        )
        .map_err(playback_build_error)?;

    Ok((stream, sample_rate))
}

struct CpalContext {
    sample_rate: u32,
    mixer: Arc<Mutex<Mixer>>,
    stop_tx: Option<mpsc::Sender<()>>,
    mismatch_warned: bool,
}

impl PlaybackContext for CpalContext {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn schedule(&mut self, buffer: AudioBuffer) {
        if buffer.sample_rate != self.sample_rate && !self.mismatch_warned {
            self.mismatch_warned = true;
            warn!(
                buffer = buffer.sample_rate,
                device = self.sample_rate,
                "Buffer rate differs from device rate; playing unresampled"
            );
        }
        if let Ok(mut mixer) = self.mixer.lock() {
            mixer.voices.push(Voice {
                samples: buffer.samples,
                pos: 0,
            });
        }
    }

    fn close(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.try_send(());
        }
    }
}

impl Drop for CpalContext {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(samples: &[f32]) -> Voice {
        Voice {
            samples: samples.to_vec(),
            pos: 0,
        }
    }

    #[test]
    fn overlapping_voices_are_summed() {
        let mut mixer = Mixer::default();
        mixer.voices.push(voice(&[0.25, 0.25]));
        mixer.voices.push(voice(&[0.5]));

        let mut out = [0.0; 3];
        mixer.fill(&mut out, 1);
        assert_eq!(out, [0.75, 0.25, 0.0]);
        assert!(mixer.voices.is_empty());
    }

    #[test]
    fn mono_is_copied_to_every_channel() {
        let mut mixer = Mixer::default();
        mixer.voices.push(voice(&[0.1, 0.2]));

        let mut out = [0.0; 4];
        mixer.fill(&mut out, 2);
        assert_eq!(out, [0.1, 0.1, 0.2, 0.2]);
    }

    #[test]
    fn sum_is_clamped() {
        let mut mixer = Mixer::default();
        mixer.voices.push(voice(&[0.9]));
        mixer.voices.push(voice(&[0.9]));
        assert_eq!(mixer.next_sample(), 1.0);
    }

    fn range(format: cpal::SampleFormat, min: u32, max: u32) -> cpal::SupportedStreamConfigRange {
        cpal::SupportedStreamConfigRange::new(
            2,
            cpal::SampleRate(min),
            cpal::SampleRate(max),
            cpal::SupportedBufferSize::Unknown,
            format,
        )
    }

    fn default_config(format: cpal::SampleFormat) -> cpal::SupportedStreamConfig {
        cpal::SupportedStreamConfig::new(
            2,
            cpal::SampleRate(48_000),
            cpal::SupportedBufferSize::Unknown,
            format,
        )
    }

    #[test]
    fn f32_default_is_kept() {
        let config = f32_config(default_config(cpal::SampleFormat::F32), Vec::new()).unwrap();
        assert_eq!(config.sample_rate.0, 48_000);
        assert_eq!(config.channels, 2);
    }

    #[test]
    fn i16_default_falls_back_to_f32_range_at_default_rate() {
        let ranges = [
            range(cpal::SampleFormat::I16, 8_000, 96_000),
            range(cpal::SampleFormat::F32, 8_000, 22_050),
            range(cpal::SampleFormat::F32, 44_100, 96_000),
        ];
        let config = f32_config(default_config(cpal::SampleFormat::I16), ranges).unwrap();
        assert_eq!(config.sample_rate.0, 48_000);
    }

    #[test]
    fn f32_range_without_default_rate_uses_its_max() {
        let ranges = [range(cpal::SampleFormat::F32, 8_000, 22_050)];
        let config = f32_config(default_config(cpal::SampleFormat::I16), ranges).unwrap();
        assert_eq!(config.sample_rate.0, 22_050);
    }

    #[test]
    fn device_without_f32_is_rejected() {
        let ranges = [range(cpal::SampleFormat::I16, 8_000, 96_000)];
        assert!(f32_config(default_config(cpal::SampleFormat::I16), ranges).is_none());
    }
}
