//! LiveBridge against an in-memory Gemini Live service

use ai_bridge::protocol::Setup;
use ai_bridge::{
    AiConfig, BridgeError, ClientMessage, LinkPhase, LiveBridge, LiveConnection, LiveConnector,
    LiveLink, LiveStream, ServerEvent,
};
use async_trait::async_trait;
use codec_core::g711;
use media_core::{
    AudioRingBuffer, CancellationToken, CaptureReader, DropOldestQueue, MediaBridge, MediaPorts,
    PlaybackSink,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing_test::traced_test;

type EventItem = Option<ai_bridge::Result<Vec<ServerEvent>>>;

/// The service side of one session
struct FakePeer {
    sent: UnboundedReceiver<ClientMessage>,
    events: UnboundedSender<EventItem>,
    closed: Arc<AtomicBool>,
}

impl FakePeer {
    async fn next_message(&mut self) -> ClientMessage {
        tokio::time::timeout(Duration::from_secs(2), self.sent.recv())
            .await
            .expect("timed out waiting for a client message")
            .expect("link dropped")
    }

    async fn next_setup(&mut self) -> Setup {
        match self.next_message().await {
            ClientMessage::Setup(setup) => setup,
            other => panic!("expected setup, got {other:?}"),
        }
    }

    async fn next_audio(&mut self) -> Vec<u8> {
        loop {
            if let Some(pcm) = self.next_message().await.audio_payload() {
                return pcm;
            }
        }
    }

    fn send(&self, events: Vec<ServerEvent>) {
        self.events.send(Some(Ok(events))).unwrap();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct FakeLink {
    sent: UnboundedSender<ClientMessage>,
    events: UnboundedSender<EventItem>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl LiveLink for FakeLink {
    async fn send(&mut self, message: &ClientMessage) -> ai_bridge::Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BridgeError::Closed);
        }
        self.sent.send(message.clone()).map_err(|_| BridgeError::Closed)?;
        if matches!(message, ClientMessage::Setup(_)) {
            let _ = self.events.send(Some(Ok(vec![ServerEvent::SetupComplete])));
        }
        Ok(())
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

struct FakeStream {
    events: UnboundedReceiver<EventItem>,
}

#[async_trait]
impl LiveStream for FakeStream {
    async fn next_events(&mut self) -> Option<ai_bridge::Result<Vec<ServerEvent>>> {
        self.events.recv().await.flatten()
    }
}

struct FakeService {
    peers: UnboundedSender<FakePeer>,
    fail_next: AtomicUsize,
    attempts: Mutex<Vec<Instant>>,
}

#[async_trait]
impl LiveConnector for FakeService {
    async fn connect(&self, _config: &AiConfig) -> ai_bridge::Result<LiveConnection> {
        self.attempts.lock().push(Instant::now());
        if self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(BridgeError::Connect("connection refused".into()));
        }

        let (sent_tx, sent_rx) = unbounded_channel();
        let (events_tx, events_rx) = unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let _ = self.peers.send(FakePeer {
            sent: sent_rx,
            events: events_tx.clone(),
            closed: closed.clone(),
        });
        Ok(LiveConnection {
            link: Box::new(FakeLink {
                sent: sent_tx,
                events: events_tx,
                closed,
            }),
            stream: Box::new(FakeStream { events: events_rx }),
        })
    }
}

struct Harness {
    bridge: LiveBridge,
    service: Arc<FakeService>,
    peers: UnboundedReceiver<FakePeer>,
    capture: Arc<AudioRingBuffer>,
    playback: Arc<DropOldestQueue<Vec<u8>>>,
}

impl Harness {
    fn start(config: AiConfig, fail_next: usize) -> Self {
        let (peers_tx, peers) = unbounded_channel();
        let service = Arc::new(FakeService {
            peers: peers_tx,
            fail_next: AtomicUsize::new(fail_next),
            attempts: Mutex::new(Vec::new()),
        });
        let capture = Arc::new(AudioRingBuffer::new(16_000).unwrap());
        let playback = Arc::new(DropOldestQueue::new(100));

        let bridge = LiveBridge::with_connector(config, service.clone());
        bridge
            .start(MediaPorts {
                capture: CaptureReader::new(capture.clone()),
                playback: PlaybackSink::new(playback.clone()),
                cancel: CancellationToken::new(),
            })
            .unwrap();

        Self {
            bridge,
            service,
            peers,
            capture,
            playback,
        }
    }

    async fn next_peer(&mut self) -> FakePeer {
        tokio::time::timeout(Duration::from_secs(3), self.peers.recv())
            .await
            .expect("timed out waiting for a connection")
            .expect("service dropped")
    }

    /// Next session, past its setup and greeting
    async fn next_ready_peer(&mut self) -> FakePeer {
        let mut peer = self.next_peer().await;
        peer.next_setup().await;
        match peer.next_message().await {
            ClientMessage::ClientContent(_) => {}
            other => panic!("expected greeting, got {other:?}"),
        }
        peer
    }
}

fn test_config() -> AiConfig {
    AiConfig {
        api_key: "test-key".into(),
        greeting: "Say hello.".into(),
        reconnect_initial_ms: 50,
        reconnect_max_ms: 400,
        reset_pause_ms: 10,
        connect_timeout_ms: 1_000,
        keepalive_interval_ms: 60_000,
        idle_timeout_ms: 60_000,
        ..AiConfig::default()
    }
}

async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

fn le_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

#[tokio::test]
async fn test_setup_then_greeting() {
    let mut harness = Harness::start(test_config(), 0);
    let mut peer = harness.next_peer().await;

    let setup = peer.next_setup().await;
    assert_eq!(setup.model, "models/gemini-2.5-flash-native-audio-latest");
    assert_eq!(setup.generation_config.response_modalities, vec!["AUDIO"]);
    assert_eq!(
        setup.generation_config.speech_config.voice_config.prebuilt_voice_config.voice_name,
        "Puck"
    );

    match peer.next_message().await {
        ClientMessage::ClientContent(content) => {
            assert!(content.turn_complete);
            assert_eq!(content.turns[0].role.as_deref(), Some("user"));
            assert_eq!(content.turns[0].parts[0].text.as_deref(), Some("Say hello."));
        }
        other => panic!("expected greeting, got {other:?}"),
    }
    assert_eq!(harness.bridge.phase(), LinkPhase::Connected);
    assert_eq!(harness.bridge.stats().connects, 1);

    harness.bridge.shutdown().await;
}

#[tokio::test]
async fn test_uplink_frames_are_upsampled() {
    let mut harness = Harness::start(test_config(), 0);
    let mut peer = harness.next_ready_peer().await;

    harness.capture.write(&[100i16; 320]);
    for _ in 0..2 {
        let pcm = peer.next_audio().await;
        assert_eq!(pcm.len(), 640);
        assert!(pcm.chunks_exact(2).all(|s| i16::from_le_bytes([s[0], s[1]]) == 100));
    }
    assert!(wait_for(|| harness.bridge.stats().frames_sent >= 2).await);

    harness.bridge.shutdown().await;
}

#[tokio::test]
async fn test_downlink_audio_reaches_playback() {
    let mut harness = Harness::start(test_config(), 0);
    let peer = harness.next_ready_peer().await;

    // Two 20 ms frames of 24 kHz audio, split mid-sample.
    let bytes = le_bytes(&[1000i16; 960]);
    peer.send(vec![ServerEvent::Audio(bytes[..1001].to_vec())]);
    peer.send(vec![ServerEvent::Audio(bytes[1001..].to_vec())]);

    let playback = harness.playback.clone();
    assert!(wait_for(|| playback.len() == 2).await);
    let expected = vec![g711::encode(1000); 160];
    assert_eq!(playback.try_pop().unwrap(), expected);
    assert_eq!(playback.try_pop().unwrap(), expected);
    assert_eq!(harness.bridge.stats().frames_received, 2);

    harness.bridge.shutdown().await;
}

#[tokio::test]
async fn test_interruption_flushes_playback() {
    let mut harness = Harness::start(test_config(), 0);
    let peer = harness.next_ready_peer().await;

    peer.send(vec![ServerEvent::Audio(le_bytes(&[0i16; 480 * 3]))]);
    let playback = harness.playback.clone();
    assert!(wait_for(|| playback.len() == 3).await);

    peer.send(vec![ServerEvent::Interrupted]);
    assert!(wait_for(|| playback.is_empty()).await);

    harness.bridge.shutdown().await;
}

#[tokio::test]
#[traced_test]
async fn test_downlink_overflow_is_logged_while_caller_is_silent() {
    let config = AiConfig {
        inbound_queue_capacity: 1,
        ..test_config()
    };
    let mut harness = Harness::start(config, 0);
    let peer = harness.next_ready_peer().await;

    // One burst lands on the inbound queue before the downlink pump runs.
    peer.send(vec![ServerEvent::Audio(vec![0; 960]); 50]);
    assert!(wait_for(|| harness.bridge.stats().inbound_dropped > 0).await);
    assert!(harness.capture.is_empty());

    let deadline = Instant::now() + Duration::from_secs(3);
    while !logs_contain("Gemini Live queues overflowed") && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(logs_contain("Gemini Live queues overflowed"));

    harness.bridge.shutdown().await;
}

#[tokio::test]
async fn test_reconnects_after_transport_error() {
    let mut harness = Harness::start(test_config(), 0);
    let first = harness.next_ready_peer().await;

    first
        .events
        .send(Some(Err(BridgeError::Transport("connection reset".into()))))
        .unwrap();

    let mut second = harness.next_peer().await;
    second.next_setup().await;
    assert!(first.is_closed());
    assert!(wait_for(|| harness.bridge.stats().connects == 2).await);
    assert!(harness.bridge.stats().resets >= 1);

    harness.bridge.shutdown().await;
}

#[tokio::test]
async fn test_unreadable_frame_resets_link() {
    let mut harness = Harness::start(test_config(), 0);
    let first = harness.next_ready_peer().await;

    first
        .events
        .send(Some(Err(BridgeError::Protocol("invalid base64 audio".into()))))
        .unwrap();

    let _second = harness.next_ready_peer().await;
    assert!(first.is_closed());
    assert!(harness.bridge.stats().resets >= 1);

    harness.bridge.shutdown().await;
}

#[tokio::test]
async fn test_reconnects_after_remote_close_and_go_away() {
    let mut harness = Harness::start(test_config(), 0);
    let first = harness.next_ready_peer().await;
    first.events.send(None).unwrap();

    let second = harness.next_ready_peer().await;
    second.send(vec![ServerEvent::GoAway {
        time_left: Some("1s".into()),
    }]);

    let _third = harness.next_ready_peer().await;
    assert!(second.is_closed());
    assert_eq!(harness.service.attempts.lock().len(), 3);

    harness.bridge.shutdown().await;
}

#[tokio::test]
async fn test_failed_connects_back_off_exponentially() {
    let mut harness = Harness::start(test_config(), 3);
    let _peer = harness.next_ready_peer().await;

    let attempts = harness.service.attempts.lock().clone();
    assert_eq!(attempts.len(), 4);
    let gaps: Vec<Duration> = attempts.windows(2).map(|w| w[1] - w[0]).collect();
    assert!(gaps[0] >= Duration::from_millis(50), "{gaps:?}");
    assert!(gaps[1] >= Duration::from_millis(100), "{gaps:?}");
    assert!(gaps[2] >= Duration::from_millis(200), "{gaps:?}");

    harness.bridge.shutdown().await;
}

#[tokio::test]
async fn test_keepalive_sends_silence() {
    let config = AiConfig {
        keepalive_interval_ms: 100,
        ..test_config()
    };
    let mut harness = Harness::start(config, 0);
    let mut peer = harness.next_ready_peer().await;

    let started = Instant::now();
    let pcm = peer.next_audio().await;
    assert!(started.elapsed() >= Duration::from_millis(50));
    assert_eq!(pcm, vec![0u8; 640]);

    harness.bridge.shutdown().await;
}

#[tokio::test]
async fn test_idle_link_is_reset() {
    let config = AiConfig {
        idle_timeout_ms: 150,
        ..test_config()
    };
    let mut harness = Harness::start(config, 0);
    let first = harness.next_ready_peer().await;

    let _second = harness.next_ready_peer().await;
    assert!(first.is_closed());

    harness.bridge.shutdown().await;
}

#[tokio::test]
async fn test_voice_change_reconnects_with_new_voice() {
    let mut harness = Harness::start(test_config(), 0);
    let first = harness.next_ready_peer().await;

    harness.bridge.apply_config(AiConfig {
        voice: "Kore".into(),
        ..test_config()
    });

    let mut second = harness.next_peer().await;
    let setup = second.next_setup().await;
    assert_eq!(
        setup.generation_config.speech_config.voice_config.prebuilt_voice_config.voice_name,
        "Kore"
    );
    assert!(first.is_closed());

    harness.bridge.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_closes_link_and_stops() {
    let mut harness = Harness::start(test_config(), 0);
    let peer = harness.next_ready_peer().await;

    let started = Instant::now();
    harness.bridge.shutdown().await;
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(peer.is_closed());
    assert_eq!(harness.bridge.phase(), LinkPhase::Disconnected);

    // Nothing is processed after shutdown.
    let _ = peer.events.send(Some(Ok(vec![ServerEvent::Audio(vec![0; 960])])));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(harness.playback.is_empty());
    assert_eq!(harness.service.attempts.lock().len(), 1);
}

#[tokio::test]
async fn test_invalid_config_is_refused_at_start() {
    let bridge = LiveBridge::with_connector(
        AiConfig {
            reconnect_initial_ms: 0,
            ..test_config()
        },
        Arc::new(FakeService {
            peers: unbounded_channel().0,
            fail_next: AtomicUsize::new(0),
            attempts: Mutex::new(Vec::new()),
        }),
    );
    let ports = MediaPorts {
        capture: CaptureReader::new(Arc::new(AudioRingBuffer::new(160).unwrap())),
        playback: PlaybackSink::new(Arc::new(DropOldestQueue::new(1))),
        cancel: CancellationToken::new(),
    };
    assert!(matches!(bridge.start(ports), Err(media_core::Error::Bridge(_))));
}
