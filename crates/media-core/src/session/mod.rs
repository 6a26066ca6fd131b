//! Media Session Engine
//!
//! Lifecycle: [`MediaSession::new`] binds the socket, [`MediaSession::start`]
//! preloads the connected tone, spawns `rtp-rx` and `rtp-tx` and starts any
//! attached bridge, and [`MediaSession::dispose`] cancels everything and
//! waits (bounded) for both threads before releasing the socket.

mod receive;
mod stats;
mod tone;
mod transmit;

pub use stats::MediaStats;
pub use tone::connected_tone;

use crate::bridge::{CaptureReader, MediaBridge, MediaPorts, PlaybackSink};
use crate::buffer::{AudioRingBuffer, DropOldestQueue};
use crate::config::MediaConfig;
use crate::error::{Error, Result};
use arc_swap::ArcSwap;
use receive::{ReceiveLoop, RECV_POLL_INTERVAL};
use rtp_core::RtpStream;
use stats::SessionCounters;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use transmit::TransmitLoop;

/// RTP media for one call
pub struct MediaSession {
    config: MediaConfig,
    socket: Option<Arc<UdpSocket>>,
    local_addr: SocketAddr,
    remote: Arc<ArcSwap<SocketAddr>>,
    capture: Arc<AudioRingBuffer>,
    outbound: Arc<DropOldestQueue<Vec<u8>>>,
    counters: Arc<SessionCounters>,
    ssrc: u32,
    stream: Option<RtpStream>,
    cancel: CancellationToken,
    bridge: Option<Arc<dyn MediaBridge>>,
    threads: Vec<JoinHandle<()>>,
    started: bool,
    disposed: bool,
}

impl MediaSession {
    /// Bind the RTP socket. Nothing is sent until [`start`](Self::start).
    pub fn new(config: MediaConfig, remote: SocketAddr) -> Result<Self> {
        config.validate()?;

        let bind_addr = SocketAddr::new(config.bind_ip, config.rtp_port);
        let socket = UdpSocket::bind(bind_addr).map_err(|source| Error::Bind {
            addr: bind_addr,
            source,
        })?;
        socket.set_read_timeout(Some(RECV_POLL_INTERVAL))?;
        let local_addr = socket.local_addr()?;

        let stream = RtpStream::new(codec_core::SAMPLES_PER_FRAME as u32);
        let ssrc = stream.ssrc();

        info!(local = %local_addr, remote = %remote, ssrc, "RTP bound");

        Ok(Self {
            capture: Arc::new(AudioRingBuffer::new(config.capture_buffer_samples())?),
            outbound: Arc::new(DropOldestQueue::new(config.outbound_queue_frames)),
            config,
            socket: Some(Arc::new(socket)),
            local_addr,
            remote: Arc::new(ArcSwap::from_pointee(remote)),
            counters: Arc::new(SessionCounters::default()),
            ssrc,
            stream: Some(stream),
            cancel: CancellationToken::new(),
            bridge: None,
            threads: Vec::with_capacity(2),
            started: false,
            disposed: false,
        })
    }

    /// Attach the bridge that will be started together with the media.
    pub fn attach_bridge(&mut self, bridge: Arc<dyn MediaBridge>) -> Result<()> {
        if self.started {
            return Err(Error::AlreadyStarted);
        }
        self.bridge = Some(bridge);
        Ok(())
    }

    pub fn has_bridge(&self) -> bool {
        self.bridge.is_some()
    }

    /// Start transmitting and receiving.
    pub fn start(&mut self) -> Result<()> {
        if self.disposed {
            return Err(Error::Disposed);
        }
        if self.started {
            return Err(Error::AlreadyStarted);
        }
        let socket = self.socket.clone().ok_or(Error::Disposed)?;
        let stream = self.stream.take().ok_or(Error::AlreadyStarted)?;

        if self.config.connected_tone {
            for frame in connected_tone() {
                self.outbound.push(frame);
            }
        }

        let receiver = ReceiveLoop {
            socket: socket.clone(),
            remote: self.remote.clone(),
            capture: self.capture.clone(),
            outbound: self.outbound.clone(),
            counters: self.counters.clone(),
            cancel: self.cancel.clone(),
            echo_delay: self.config.loopback.then_some(self.config.echo_delay_frames),
        };
        let transmitter = TransmitLoop {
            socket,
            remote: self.remote.clone(),
            outbound: self.outbound.clone(),
            stream,
            counters: self.counters.clone(),
            cancel: self.cancel.clone(),
        };

        self.started = true;
        let rx = thread::Builder::new()
            .name("rtp-rx".into())
            .spawn(move || receiver.run());
        match rx {
            Ok(handle) => self.threads.push(handle),
            Err(e) => {
                self.cancel.cancel();
                return Err(e.into());
            }
        }
        let tx = thread::Builder::new()
            .name("rtp-tx".into())
            .spawn(move || transmitter.run());
        match tx {
            Ok(handle) => self.threads.push(handle),
            Err(e) => {
                self.cancel.cancel();
                return Err(e.into());
            }
        }

        if let Some(bridge) = &self.bridge {
            let ports = MediaPorts {
                capture: self.capture_reader(),
                playback: self.playback_sink(),
                cancel: self.cancel.child_token(),
            };
            match bridge.start(ports) {
                Ok(()) => info!("Live mode: patching audio to {}", bridge.name()),
                Err(e) => warn!("{} bridge failed to start, continuing without it: {}", bridge.name(), e),
            }
        } else if self.config.loopback {
            info!(
                delay_frames = self.config.echo_delay_frames,
                "Loopback mode: echo enabled"
            );
        } else {
            info!("No bridge attached; caller hears silence after the tone");
        }
        Ok(())
    }

    /// Stop the bridge and both media threads, then release the socket.
    /// Safe to call more than once.
    pub async fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.cancel.cancel();
        self.outbound.close();

        let timeout = self.config.dispose_timeout();
        if let Some(bridge) = self.bridge.take() {
            if tokio::time::timeout(timeout, bridge.shutdown()).await.is_err() {
                warn!("{} bridge did not shut down within {:?}", bridge.name(), timeout);
            }
        }

        let deadline = Instant::now() + timeout;
        for handle in self.threads.drain(..) {
            let name = handle.thread().name().unwrap_or("rtp").to_string();
            while !handle.is_finished() && Instant::now() < deadline {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            if handle.is_finished() {
                if handle.join().is_err() {
                    error!("{} thread panicked", name);
                }
            } else {
                warn!("{} thread did not stop within {:?}", name, timeout);
            }
        }

        self.socket = None;
        self.capture.clear();
        self.outbound.clear();
        debug!(local = %self.local_addr, "Media session disposed");
    }

    /// Transmit loop is running and not yet cancelled
    pub fn is_running(&self) -> bool {
        self.started && !self.cancel.is_cancelled()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Where packets are currently sent
    pub fn remote_endpoint(&self) -> SocketAddr {
        **self.remote.load()
    }

    /// Override the destination, e.g. after a re-negotiation.
    /// Incoming traffic overrides it again.
    pub fn update_remote_endpoint(&self, remote: SocketAddr) {
        self.remote.store(Arc::new(remote));
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    pub fn config(&self) -> &MediaConfig {
        &self.config
    }

    pub fn capture_reader(&self) -> CaptureReader {
        CaptureReader::new(self.capture.clone())
    }

    pub fn playback_sink(&self) -> PlaybackSink {
        PlaybackSink::new(self.outbound.clone())
    }

    /// Pull captured 8 kHz samples; returns how many were read.
    pub fn read_capture(&self, out: &mut [i16]) -> usize {
        self.capture.read(out)
    }

    /// Queue one 160-byte PCMU frame for the caller.
    pub fn push_playback(&self, frame: Vec<u8>) -> Result<()> {
        self.playback_sink().push(frame)
    }

    /// Samples waiting in the capture buffer
    pub fn buffered_capture_samples(&self) -> usize {
        self.capture.len()
    }

    pub fn stats(&self) -> MediaStats {
        MediaStats::from_counters(
            &self.counters,
            self.capture.dropped_count(),
            self.outbound.dropped(),
            self.outbound.len(),
        )
    }
}

impl Drop for MediaSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for MediaSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaSession")
            .field("local_addr", &self.local_addr)
            .field("remote", &self.remote_endpoint())
            .field("ssrc", &self.ssrc)
            .field("started", &self.started)
            .field("disposed", &self.disposed)
            .finish()
    }
}
