//! The Gemini Live media bridge
//!
//! Three tasks run per call:
//!
//! - the driver owns the connection lifecycle and pulls caller audio from
//!   the capture buffer, one 20 ms frame at a time
//! - the link reader (one per open session) turns server frames into raw
//!   audio chunks on the inbound queue
//! - the downlink pump reframes inbound audio into PCMU and hands it to the
//!   media session
//!
//! All sends go through one async mutex holding the current link, so setup,
//! greeting, keep-alive and audio never interleave on the socket.

use crate::audio::{FrameAssembler, SILENT_UPLINK_FRAME, downlink_frame, uplink_frame};
use crate::config::AiConfig;
use crate::error::{BridgeError, Result};
use crate::protocol::{ClientMessage, ServerEvent};
use crate::state::{ConnectionState, LinkEvent, LinkPhase, ReconnectBackoff};
use crate::transport::{LiveConnection, LiveConnector, LiveLink, LiveStream, WebSocketConnector};
use async_trait::async_trait;
use codec_core::{AudioGeometry, SAMPLES_PER_FRAME};
use infra_common::LogThrottle;
use media_core::{CaptureReader, DropOldestQueue, MediaBridge, MediaPorts, PlaybackSink};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Upper bound on one send before the link is considered broken
const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on each task during shutdown
const TASK_STOP_TIMEOUT: Duration = Duration::from_secs(2);

const LINK_CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Sleep when the capture buffer has nothing to read
const CAPTURE_POLL_INTERVAL: Duration = Duration::from_millis(5);

const STATS_INTERVAL: Duration = Duration::from_secs(1);

/// Counters for one bridge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Uplink audio frames sent, keep-alives included
    pub frames_sent: u64,
    /// PCMU frames produced from model audio
    pub frames_received: u64,
    pub inbound_dropped: u64,
    pub outbound_dropped: u64,
    /// Sessions successfully set up
    pub connects: u64,
    pub resets: u64,
}

/// Streams one call's audio to and from Gemini Live
pub struct LiveBridge {
    inner: Arc<Inner>,
}

struct Inner {
    config: Mutex<AiConfig>,
    connector: Arc<dyn LiveConnector>,
    geometry: AudioGeometry,
    state: Mutex<ConnectionState>,
    /// Send gate: the open link, if any
    link: tokio::sync::Mutex<Option<Box<dyn LiveLink>>>,
    /// Bumped per session so a stale reader cannot fault a newer one
    generation: AtomicU64,
    reader: Mutex<Option<JoinHandle<()>>>,
    inbound: DropOldestQueue<Vec<u8>>,
    outbound: DropOldestQueue<Vec<u8>>,
    assembler: Mutex<FrameAssembler>,
    playback: Mutex<Option<PlaybackSink>>,
    cancel: Mutex<CancellationToken>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
    frames_sent: AtomicU64,
    frames_received: AtomicU64,
    connects: AtomicU64,
    resets: AtomicU64,
}

impl LiveBridge {
    /// Bridge using the real WebSocket transport
    pub fn new(config: AiConfig) -> Self {
        Self::with_connector(config, Arc::new(WebSocketConnector::new()))
    }

    pub fn with_connector(config: AiConfig, connector: Arc<dyn LiveConnector>) -> Self {
        Self::with_geometry(config, connector, AudioGeometry::default())
    }

    /// Bridge with explicit frame geometry. An invalid geometry makes
    /// [`start`](MediaBridge::start) fail, leaving the call without AI audio.
    pub fn with_geometry(
        config: AiConfig,
        connector: Arc<dyn LiveConnector>,
        geometry: AudioGeometry,
    ) -> Self {
        let backoff = ReconnectBackoff::new(
            Duration::from_millis(config.reconnect_initial_ms),
            Duration::from_millis(config.reconnect_max_ms),
        );
        let inner = Inner {
            inbound: DropOldestQueue::new(config.inbound_queue_capacity.max(1)),
            outbound: DropOldestQueue::new(config.outbound_queue_capacity.max(1)),
            config: Mutex::new(config),
            connector,
            geometry,
            state: Mutex::new(ConnectionState::new(backoff, Instant::now())),
            link: tokio::sync::Mutex::new(None),
            generation: AtomicU64::new(0),
            reader: Mutex::new(None),
            assembler: Mutex::new(FrameAssembler::downlink()),
            playback: Mutex::new(None),
            cancel: Mutex::new(CancellationToken::new()),
            tasks: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
            frames_sent: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            connects: AtomicU64::new(0),
            resets: AtomicU64::new(0),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn phase(&self) -> LinkPhase {
        self.inner.state.lock().phase()
    }

    pub fn config(&self) -> AiConfig {
        self.inner.config.lock().clone()
    }

    /// Swap in new settings. A change of model, voice, prompt, endpoint or
    /// key tears down the current session; the driver reconnects with the
    /// new settings.
    pub fn apply_config(&self, config: AiConfig) {
        let changed = {
            let mut current = self.inner.config.lock();
            let changed = current.requires_reconnect(&config);
            *current = config;
            changed
        };
        if !changed {
            debug!("AI settings updated; session unaffected");
            return;
        }
        let before = self.phase();
        if self.inner.apply(LinkEvent::ConfigChanged) == LinkPhase::NeedsReset
            && before != LinkPhase::NeedsReset
        {
            info!("AI settings changed; reconnecting Gemini Live");
        }
    }

    pub fn stats(&self) -> BridgeStats {
        BridgeStats {
            frames_sent: self.inner.frames_sent.load(Ordering::Relaxed),
            frames_received: self.inner.frames_received.load(Ordering::Relaxed),
            inbound_dropped: self.inner.inbound.dropped(),
            outbound_dropped: self.inner.outbound.dropped(),
            connects: self.inner.connects.load(Ordering::Relaxed),
            resets: self.inner.resets.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for LiveBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveBridge")
            .field("phase", &self.phase())
            .field("stats", &self.stats())
            .finish()
    }
}

#[async_trait]
impl MediaBridge for LiveBridge {
    fn name(&self) -> &str {
        "Gemini Live"
    }

    fn start(&self, ports: MediaPorts) -> media_core::Result<()> {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Err(media_core::Error::AlreadyStarted);
        }

        if let Err(e) = self.inner.geometry.validate() {
            error!("Audio geometry check failed, AI bridging disabled: {}", e);
            return Err(media_core::Error::Bridge(e.to_string()));
        }
        {
            let config = self.inner.config.lock();
            config
                .validate()
                .map_err(|e| media_core::Error::Bridge(e.to_string()))?;
            if !config.is_enabled() {
                return Err(media_core::Error::Bridge(BridgeError::MissingApiKey.to_string()));
            }
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| media_core::Error::Bridge(format!("no async runtime: {e}")))?;

        let cancel = ports.cancel.child_token();
        *self.inner.cancel.lock() = cancel.clone();
        *self.inner.playback.lock() = Some(ports.playback.clone());

        let tasks = vec![
            runtime.spawn(drive(self.inner.clone(), ports.capture, cancel.clone())),
            runtime.spawn(pump_downlink(self.inner.clone(), cancel.clone())),
            runtime.spawn(pump_playback(self.inner.clone(), ports.playback, cancel)),
        ];
        self.inner.tasks.lock().extend(tasks);
        Ok(())
    }

    async fn shutdown(&self) {
        let inner = &self.inner;
        inner.cancel.lock().cancel();
        inner.inbound.close();
        inner.outbound.close();

        let tasks: Vec<_> = inner.tasks.lock().drain(..).collect();
        for task in tasks {
            let abort = task.abort_handle();
            if tokio::time::timeout(TASK_STOP_TIMEOUT, task).await.is_err() {
                warn!("Bridge task did not stop within {:?}; aborting", TASK_STOP_TIMEOUT);
                abort.abort();
            }
        }

        inner.close_link().await;
        inner.state.lock().force(LinkPhase::Disconnected);
        *inner.playback.lock() = None;
        inner.assembler.lock().clear();
        info!(stats = ?self.stats(), "Gemini Live bridge stopped");
    }
}

impl Inner {
    fn apply(&self, event: LinkEvent) -> LinkPhase {
        let mut state = self.state.lock();
        let before = state.phase();
        let after = state.apply(event, Instant::now());
        if before != after {
            debug!(?event, "Gemini Live link {} -> {}", before, after);
        }
        after
    }

    /// Apply an event raised by the reader of session `generation`.
    fn apply_from(&self, generation: u64, event: LinkEvent) {
        if self.generation.load(Ordering::SeqCst) == generation {
            self.apply(event);
        }
    }

    fn touch(&self) {
        self.state.lock().touch(Instant::now());
    }

    /// Send through the gate. Succeeds only while a link is installed.
    async fn send(&self, message: &ClientMessage) -> Result<()> {
        let mut gate = self.link.lock().await;
        let link = gate.as_mut().ok_or(BridgeError::Closed)?;
        match tokio::time::timeout(SEND_TIMEOUT, link.send(message)).await {
            Ok(Ok(())) => {
                self.state.lock().mark_sent(Instant::now());
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(BridgeError::Timeout(format!("send exceeded {SEND_TIMEOUT:?}"))),
        }
    }

    /// Open a session and wait for the service to acknowledge setup.
    async fn open(&self, config: &AiConfig) -> Result<LiveConnection> {
        let mut connection = self.connector.connect(config).await?;
        connection.link.send(&ClientMessage::setup(config)).await?;
        loop {
            match connection.stream.next_events().await {
                Some(Ok(events)) => {
                    if events.contains(&ServerEvent::SetupComplete) {
                        return Ok(connection);
                    }
                    trace!("Ignoring {} events before setup completed", events.len());
                }
                Some(Err(e)) => return Err(e),
                None => return Err(BridgeError::Closed),
            }
        }
    }

    async fn connect(self: &Arc<Self>, cancel: &CancellationToken) {
        self.apply(LinkEvent::ConnectStarted);
        let config = self.config.lock().clone();
        let model = config.model_name();
        info!(model = %model, voice = %config.voice_name(), "Connecting to Gemini Live");

        let attempt = tokio::select! {
            _ = cancel.cancelled() => return,
            r = tokio::time::timeout(config.connect_timeout(), self.open(&config)) => r,
        };

        let connection = match attempt {
            Ok(Ok(connection)) => connection,
            Ok(Err(e)) => {
                warn!("Gemini Live connect failed: {}", e);
                self.apply(LinkEvent::ConnectFailed);
                return;
            }
            Err(_) => {
                warn!("Gemini Live connect timed out after {:?}", config.connect_timeout());
                self.apply(LinkEvent::ConnectFailed);
                return;
            }
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.link.lock().await = Some(connection.link);
        let reader = tokio::spawn(read_link(
            self.clone(),
            connection.stream,
            generation,
            cancel.clone(),
        ));
        if let Some(stale) = self.reader.lock().replace(reader) {
            stale.abort();
        }

        if self.apply(LinkEvent::ConnectSucceeded) == LinkPhase::Connected {
            self.connects.fetch_add(1, Ordering::Relaxed);
            info!(model = %model, "Gemini Live connected");
        }
    }

    async fn close_link(&self) {
        if let Some(reader) = self.reader.lock().take() {
            reader.abort();
        }
        let link = self.link.lock().await.take();
        if let Some(mut link) = link {
            if tokio::time::timeout(LINK_CLOSE_TIMEOUT, link.close()).await.is_err() {
                debug!("Gemini Live close did not finish within {:?}", LINK_CLOSE_TIMEOUT);
            }
        }
    }

    /// Tear the current session down and schedule the next attempt.
    async fn reset(&self) {
        self.close_link().await;
        self.resets.fetch_add(1, Ordering::Relaxed);

        let mut state = self.state.lock();
        state.apply(LinkEvent::ResetComplete, Instant::now());
        let wait = state.next_attempt().saturating_duration_since(Instant::now());
        info!("Gemini Live client reset; next connect attempt in {:?}", wait);
    }

    async fn send_greeting(&self) {
        let greeting = self.config.lock().greeting.clone();
        if greeting.trim().is_empty() {
            self.state.lock().mark_greeting_sent(Instant::now());
            return;
        }
        match self.send(&ClientMessage::text_turn(&greeting)).await {
            Ok(()) => {
                self.state.lock().mark_greeting_sent(Instant::now());
                info!("Greeting sent to Gemini Live");
            }
            Err(e) => {
                warn!("Failed to send greeting: {}", e);
                self.apply(LinkEvent::TransportError);
            }
        }
    }

    /// Idle and keep-alive checks for a connected link.
    async fn supervise(&self, config: &AiConfig) {
        let now = Instant::now();
        let (idle, since_send, greeting_sent) = {
            let state = self.state.lock();
            (state.idle_for(now), state.since_last_send(now), state.greeting_sent())
        };

        if idle > config.idle_timeout() {
            info!("Gemini Live idle for {:?}; resetting", idle);
            self.apply(LinkEvent::IdleTimeout);
            return;
        }

        if since_send > config.keepalive_interval() {
            match self.send(&ClientMessage::audio(&SILENT_UPLINK_FRAME)).await {
                Ok(()) => {
                    self.frames_sent.fetch_add(1, Ordering::Relaxed);
                    debug!("Gemini Live keep-alive sent");
                }
                Err(e) => {
                    warn!("Keep-alive failed: {}", e);
                    self.apply(LinkEvent::TransportError);
                    return;
                }
            }
        }

        if !greeting_sent {
            self.send_greeting().await;
        }
    }

    /// Log one stats window, loudly if either queue dropped audio.
    fn report_window(&self, tx_frames: u64) {
        let inbound_dropped = self.inbound.take_dropped();
        let outbound_dropped = self.outbound.take_dropped();
        if inbound_dropped > 0 || outbound_dropped > 0 {
            warn!(
                tx_frames,
                inbound_dropped, outbound_dropped, "Gemini Live queues overflowed"
            );
        } else {
            debug!(tx_frames, "Gemini Live uplink");
        }
    }

    /// Barge-in reported by the reader of session `generation`.
    fn interrupt_from(&self, generation: u64) {
        if self.generation.load(Ordering::SeqCst) == generation {
            self.flush_playback();
        }
    }

    /// Drop audio queued for the caller after a barge-in.
    fn flush_playback(&self) {
        let inbound = self.inbound.clear();
        let outbound = self.outbound.clear();
        self.assembler.lock().clear();
        let played = self
            .playback
            .lock()
            .as_ref()
            .map(|sink| sink.flush())
            .unwrap_or(0);
        debug!(inbound, outbound, played, "Interrupted; playback flushed");
    }
}

async fn pause(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

/// Connection lifecycle plus the uplink.
async fn drive(inner: Arc<Inner>, capture: CaptureReader, cancel: CancellationToken) {
    let mut frame = [0i16; SAMPLES_PER_FRAME];
    let mut filled = 0usize;
    let mut window_frames = 0u64;
    let mut window_start = Instant::now();
    let send_errors = LogThrottle::new(Duration::from_secs(5));

    info!("Gemini Live bridge started");

    while !cancel.is_cancelled() {
        // Must run before anything below can skip the iteration.
        if window_start.elapsed() >= STATS_INTERVAL {
            inner.report_window(window_frames);
            window_frames = 0;
            window_start = Instant::now();
        }

        let config = inner.config.lock().clone();
        let phase = inner.state.lock().phase();
        match phase {
            LinkPhase::NeedsReset => {
                inner.reset().await;
                if !pause(&cancel, config.reset_pause()).await {
                    break;
                }
                continue;
            }
            LinkPhase::Connected => inner.supervise(&config).await,
            LinkPhase::Disconnected => {
                if inner.state.lock().should_connect(Instant::now()) {
                    inner.connect(&cancel).await;
                }
            }
            LinkPhase::Connecting => {}
        }

        // Capture is drained even while disconnected so the caller's audio
        // is current once a session is up.
        let read = capture.read(&mut frame[filled..]);
        filled += read;
        if filled < frame.len() {
            if read == 0 && !pause(&cancel, CAPTURE_POLL_INTERVAL).await {
                break;
            }
            continue;
        }
        filled = 0;

        if inner.state.lock().phase() != LinkPhase::Connected {
            continue;
        }

        let bytes = match uplink_frame(&frame) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Uplink resampling failed: {}", e);
                if !pause(&cancel, Duration::from_secs(1)).await {
                    break;
                }
                continue;
            }
        };

        match inner.send(&ClientMessage::audio(&bytes)).await {
            Ok(()) => {
                inner.frames_sent.fetch_add(1, Ordering::Relaxed);
                window_frames += 1;
            }
            Err(e) => {
                if send_errors.should_log() {
                    warn!(
                        suppressed = send_errors.take_suppressed(),
                        "Gemini Live send failed: {}", e
                    );
                }
                if e.is_transport_fault() {
                    inner.apply(LinkEvent::TransportError);
                }
            }
        }

    }

    debug!("Gemini Live driver stopped");
}

/// Reader for one session
async fn read_link(
    inner: Arc<Inner>,
    mut stream: Box<dyn LiveStream>,
    generation: u64,
    cancel: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = stream.next_events() => next,
        };
        match next {
            Some(Ok(events)) => {
                for event in events {
                    match event {
                        ServerEvent::Audio(pcm) => {
                            inner.touch();
                            inner.inbound.push(pcm);
                        }
                        ServerEvent::Interrupted => inner.interrupt_from(generation),
                        ServerEvent::GoAway { time_left } => {
                            info!(?time_left, "Gemini Live asked to go away; reconnecting");
                            inner.apply_from(generation, LinkEvent::GoAway);
                        }
                        ServerEvent::Text(text) => debug!("Gemini Live text: {}", text),
                        ServerEvent::TurnComplete => trace!("Gemini Live turn complete"),
                        ServerEvent::SetupComplete => {}
                    }
                }
            }
            Some(Err(e)) => {
                if e.is_transport_fault() {
                    warn!("Gemini Live receive failed: {}", e);
                } else {
                    warn!("Gemini Live sent an unreadable frame: {}", e);
                }
                inner.apply_from(generation, LinkEvent::TransportError);
                break;
            }
            None => {
                info!("Gemini Live disconnected");
                inner.apply_from(generation, LinkEvent::RemoteClosed);
                break;
            }
        }
    }
}

/// Model audio → 20 ms PCMU frames
async fn pump_downlink(inner: Arc<Inner>, cancel: CancellationToken) {
    while let Some(chunk) = inner.inbound.pop(&cancel).await {
        let frames = inner.assembler.lock().push(&chunk);
        for samples in frames {
            match downlink_frame(&samples) {
                Ok(pcmu) => {
                    inner.frames_received.fetch_add(1, Ordering::Relaxed);
                    inner.outbound.push(pcmu);
                }
                Err(e) => warn!("Downlink resampling failed: {}", e),
            }
        }
    }
}

/// PCMU frames → the media session
async fn pump_playback(inner: Arc<Inner>, playback: PlaybackSink, cancel: CancellationToken) {
    let rejected = LogThrottle::new(Duration::from_secs(5));
    while let Some(frame) = inner.outbound.pop(&cancel).await {
        if let Err(e) = playback.push(frame) {
            if rejected.should_log() {
                warn!("Media session rejected a frame: {}", e);
            }
        }
    }
}
