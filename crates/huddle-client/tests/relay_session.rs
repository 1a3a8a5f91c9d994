//! Two sessions talking through a real relay.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use huddle_client::{
    AudioBackend, AudioBuffer, AudioDevice, AudioSink, ChannelConfig, IdentityStore, InputStream,
    JoinRequest, PlaybackContext, SampleCallback, SessionController, SessionEvent,
    SignalingChannel, Surface,
};
use huddle_common::{CaptureError, Participant, PlaybackError};
use tokio::net::TcpListener;

const FRAME: usize = 4096;

#[derive(Clone, Default)]
struct ScriptedMic {
    callback: Arc<Mutex<Option<SampleCallback>>>,
}

impl ScriptedMic {
    fn speak(&self, samples: &[f32]) {
        if let Some(cb) = self.callback.lock().unwrap().as_mut() {
            cb(samples);
        }
    }
}

struct ScriptedStream(Arc<Mutex<Option<SampleCallback>>>);

impl InputStream for ScriptedStream {
    fn close(&mut self) {
        self.0.lock().unwrap().take();
    }
}

#[async_trait]
impl AudioDevice for ScriptedMic {
    async fn open_input(
        &self,
        on_samples: SampleCallback,
    ) -> Result<Box<dyn InputStream>, CaptureError> {
        *self.callback.lock().unwrap() = Some(on_samples);
        Ok(Box::new(ScriptedStream(self.callback.clone())))
    }
}

#[derive(Clone, Default)]
struct CollectingSink {
    buffers: Arc<Mutex<Vec<AudioBuffer>>>,
}

struct CollectingContext(Arc<Mutex<Vec<AudioBuffer>>>);

impl AudioSink for CollectingSink {
    fn create_context(&self) -> Result<Box<dyn PlaybackContext>, PlaybackError> {
        Ok(Box::new(CollectingContext(self.buffers.clone())))
    }
}

impl PlaybackContext for CollectingContext {
    fn sample_rate(&self) -> u32 {
        48_000
    }

    fn schedule(&mut self, buffer: AudioBuffer) {
        self.0.lock().unwrap().push(buffer);
    }

    fn close(&mut self) {}
}

async fn start_relay() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(huddle_relay::run(listener, huddle_relay::RoomStore::new(), 64));
    format!("ws://{addr}")
}

fn session(url: &str, mic: &ScriptedMic, sink: &CollectingSink) -> SessionController {
    let channel = SignalingChannel::connect(ChannelConfig::new(url));
    let audio = AudioBackend {
        device: Arc::new(mic.clone()),
        sink: Arc::new(sink.clone()),
        frame_size: FRAME,
    };
    SessionController::new(Surface::Room, channel, IdentityStore::in_memory(), audio)
}

async fn next_event(session: &mut SessionController) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(5), session.next_event())
        .await
        .expect("timed out waiting for relay")
        .expect("session has no subscription")
}

async fn next_roster(session: &mut SessionController) -> Vec<String> {
    loop {
        if let SessionEvent::RosterUpdated(roster) = next_event(session).await {
            return roster.iter().map(Participant::name).map(str::to_string).collect();
        }
    }
}

#[tokio::test]
async fn join_talk_and_leave() {
    let url = start_relay().await;
    let (mic_a, sink_a) = (ScriptedMic::default(), CollectingSink::default());
    let (mic_b, sink_b) = (ScriptedMic::default(), CollectingSink::default());
    let mut a = session(&url, &mic_a, &sink_a);
    let mut b = session(&url, &mic_b, &sink_b);

    a.join(JoinRequest::new("abc").with_profile("Alice", None))
        .await
        .unwrap();
    assert_eq!(next_roster(&mut a).await, ["Alice"]);

    b.join(JoinRequest::new("abc").with_profile("Bob", None))
        .await
        .unwrap();
    assert_eq!(next_roster(&mut a).await, ["Alice", "Bob"]);
    assert_eq!(next_roster(&mut b).await, ["Alice", "Bob"]);

    mic_a.speak(&[0.0; FRAME]);
    assert_eq!(next_event(&mut b).await, SessionEvent::Voice { samples: FRAME });

    let heard = sink_b.buffers.lock().unwrap().clone();
    assert_eq!(heard.len(), 1);
    assert_eq!(heard[0].len(), FRAME);
    assert_eq!(heard[0].sample_rate, 48_000);
    assert!(heard[0].samples.iter().all(|s| *s == 0.0));
    assert!(sink_a.buffers.lock().unwrap().is_empty());

    b.leave();
    assert_eq!(next_roster(&mut a).await, ["Alice"]);
}

#[tokio::test]
async fn dropped_session_disappears_from_roster() {
    let url = start_relay().await;
    let (mic, sink) = (ScriptedMic::default(), CollectingSink::default());
    let mut a = session(&url, &mic, &sink);
    let mut b = session(&url, &mic, &sink);

    a.join(JoinRequest::new("room").with_profile("Alice", None))
        .await
        .unwrap();
    next_roster(&mut a).await;
    b.join(JoinRequest::new("room").with_profile("Bob", None))
        .await
        .unwrap();
    assert_eq!(next_roster(&mut a).await, ["Alice", "Bob"]);

    drop(b);
    assert_eq!(next_roster(&mut a).await, ["Alice"]);
}
