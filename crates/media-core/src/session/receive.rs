//! RTP receive loop
//!
//! Blocks on the socket with a short read timeout so cancellation is seen
//! promptly. Every datagram's source becomes the transmit destination
//! (symmetric RTP), which is how NATed callers are reached.

use super::stats::SessionCounters;
use crate::buffer::{AudioRingBuffer, DropOldestQueue};
use arc_swap::ArcSwap;
use codec_core::{g711, PAYLOAD_TYPE_PCMU, PCMU_PAYLOAD_BYTES, SAMPLES_PER_FRAME};
use infra_common::LogThrottle;
use rtp_core::RtpPacketView;
use std::collections::VecDeque;
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Read timeout on the RTP socket; bounds how long cancellation goes unseen
pub(crate) const RECV_POLL_INTERVAL: Duration = Duration::from_millis(100);

const WARN_INTERVAL: Duration = Duration::from_secs(5);
const STATS_INTERVAL: Duration = Duration::from_secs(1);

pub(crate) struct ReceiveLoop {
    pub socket: Arc<UdpSocket>,
    pub remote: Arc<ArcSwap<SocketAddr>>,
    pub capture: Arc<AudioRingBuffer>,
    pub outbound: Arc<DropOldestQueue<Vec<u8>>>,
    pub counters: Arc<SessionCounters>,
    pub cancel: CancellationToken,
    /// Echo delay in frames when loopback is enabled
    pub echo_delay: Option<usize>,
}

impl ReceiveLoop {
    pub fn run(self) {
        let mut datagram = [0u8; 2048];
        let mut pcm = [0i16; SAMPLES_PER_FRAME];
        let mut echo: VecDeque<Vec<u8>> = VecDeque::new();
        let throttle = LogThrottle::new(WARN_INTERVAL);
        let mut last_report = Instant::now();

        info!("RTP RX loop running");

        while !self.cancel.is_cancelled() {
            let (len, source) = match self.socket.recv_from(&mut datagram) {
                Ok(received) => received,
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                    ) =>
                {
                    continue;
                }
                Err(e) => {
                    // ICMP unreachable surfaces here as ConnectionReset on some hosts.
                    if throttle.should_log() {
                        debug!("RTP RX socket error: {}", e);
                    }
                    thread::sleep(Duration::from_millis(1));
                    continue;
                }
            };

            self.learn_remote(source);
            SessionCounters::bump(&self.counters.packets_received);

            let packet = match RtpPacketView::parse(&datagram[..len]) {
                Ok(packet) => packet,
                Err(e) => {
                    SessionCounters::bump(&self.counters.malformed_packets);
                    if throttle.should_log() {
                        warn!(from = %source, "RTP RX dropped packet: {}", e);
                    }
                    continue;
                }
            };

            if packet.payload_type != PAYLOAD_TYPE_PCMU {
                SessionCounters::bump(&self.counters.ignored_packets);
                trace!(payload_type = packet.payload_type, "RTP RX ignored payload type");
                continue;
            }

            if packet.payload.len() != PCMU_PAYLOAD_BYTES {
                SessionCounters::bump(&self.counters.malformed_packets);
                if throttle.should_log() {
                    warn!(
                        "RTP RX unexpected payload size {} bytes (expected {})",
                        packet.payload.len(),
                        PCMU_PAYLOAD_BYTES
                    );
                }
                continue;
            }

            if g711::decode_block(packet.payload, &mut pcm).is_ok() {
                self.capture.write(&pcm);
            }

            if let Some(delay) = self.echo_delay {
                echo.push_back(packet.payload.to_vec());
                if echo.len() > delay {
                    if let Some(frame) = echo.pop_front() {
                        self.outbound.push(frame);
                        SessionCounters::bump(&self.counters.echoed_frames);
                    }
                }
            }

            if last_report.elapsed() >= STATS_INTERVAL {
                last_report = Instant::now();
                debug!(
                    rx = self.counters.packets_received.load(Ordering::Relaxed),
                    from = %source,
                    buffered = self.capture.len(),
                    "RTP RX ok"
                );
            }
        }

        debug!("RTP RX loop stopped");
    }

    fn learn_remote(&self, source: SocketAddr) {
        let current = **self.remote.load();
        if current != source {
            self.remote.store(Arc::new(source));
            info!(previous = %current, learned = %source, "RTP remote endpoint learned");
        }
    }
}
