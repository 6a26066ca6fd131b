//! Paced RTP transmit loop
//!
//! Runs on a dedicated OS thread. Deadlines are absolute, advanced by
//! exactly one frame per packet, so scheduling jitter never accumulates.

use super::stats::SessionCounters;
use crate::buffer::DropOldestQueue;
use arc_swap::ArcSwap;
use codec_core::g711::ULAW_SILENCE;
use codec_core::{FRAME_MS, PAYLOAD_TYPE_PCMU, PCMU_PAYLOAD_BYTES};
use infra_common::LogThrottle;
use rtp_core::packet::encode_into;
use rtp_core::{RtpStream, RTP_HEADER_SIZE};
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Sleep coarsely only when the deadline is further away than this
const COARSE_SLEEP_THRESHOLD: Duration = Duration::from_millis(2);

/// Wake this long before the deadline and spin the rest
const SPIN_MARGIN: Duration = Duration::from_millis(1);

/// Falling further behind than this re-anchors the clock instead of bursting
const MAX_LAG_FRAMES: u32 = 5;

const LOG_INTERVAL: Duration = Duration::from_secs(5);

pub(crate) struct TransmitLoop {
    pub socket: Arc<UdpSocket>,
    pub remote: Arc<ArcSwap<SocketAddr>>,
    pub outbound: Arc<DropOldestQueue<Vec<u8>>>,
    pub stream: RtpStream,
    pub counters: Arc<SessionCounters>,
    pub cancel: CancellationToken,
}

impl TransmitLoop {
    pub fn run(mut self) {
        let frame = Duration::from_millis(FRAME_MS as u64);
        let max_lag = frame * MAX_LAG_FRAMES;
        let throttle = LogThrottle::new(LOG_INTERVAL);
        let frame_errors = LogThrottle::new(LOG_INTERVAL);
        let silence = [ULAW_SILENCE; PCMU_PAYLOAD_BYTES];
        let mut packet = [0u8; RTP_HEADER_SIZE + PCMU_PAYLOAD_BYTES];
        let mut deadline = Instant::now();

        info!(ssrc = self.stream.ssrc(), "RTP TX loop running");

        while !self.cancel.is_cancelled() {
            wait_until(deadline);

            let now = Instant::now();
            if now.saturating_duration_since(deadline) > max_lag {
                debug!(
                    lag_ms = now.saturating_duration_since(deadline).as_millis() as u64,
                    "RTP TX clock re-anchored"
                );
                deadline = now;
            }
            deadline += frame;

            let queued = self.outbound.try_pop();
            let payload: &[u8] = match queued.as_deref() {
                Some(data) if data.len() == PCMU_PAYLOAD_BYTES => data,
                Some(data) => {
                    SessionCounters::bump(&self.counters.invalid_frames);
                    if frame_errors.should_log() {
                        warn!(
                            len = data.len(),
                            suppressed = frame_errors.take_suppressed(),
                            "Queued frame is not {} bytes; sending silence",
                            PCMU_PAYLOAD_BYTES
                        );
                    }
                    &silence
                }
                None => &silence,
            };

            let header = self.stream.next_header(PAYLOAD_TYPE_PCMU);
            let len = match encode_into(&mut packet, &header, payload) {
                Ok(len) => len,
                Err(e) => {
                    error!("RTP TX framing failed: {}", e);
                    continue;
                }
            };

            let remote = **self.remote.load();
            match self.socket.send_to(&packet[..len], remote) {
                Ok(_) => SessionCounters::bump(&self.counters.packets_sent),
                Err(e) => {
                    SessionCounters::bump(&self.counters.send_errors);
                    if throttle.should_log() {
                        warn!(
                            remote = %remote,
                            suppressed = throttle.take_suppressed(),
                            "RTP TX send failed: {}", e
                        );
                    }
                }
            }
        }

        debug!("RTP TX loop stopped");
    }
}

fn wait_until(deadline: Instant) {
    let now = Instant::now();
    if deadline <= now {
        return;
    }
    let wait = deadline - now;
    if wait > COARSE_SLEEP_THRESHOLD {
        thread::sleep(wait - SPIN_MARGIN);
    }
    while Instant::now() < deadline {
        std::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtp_core::RtpPacketView;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_wrong_length_frame_is_counted_and_silenced() {
        let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").unwrap());
        let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
        peer.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

        let outbound = Arc::new(DropOldestQueue::new(10));
        outbound.push(vec![0x55; 100]);
        let counters = Arc::new(SessionCounters::default());
        let cancel = CancellationToken::new();
        let tx = TransmitLoop {
            socket,
            remote: Arc::new(ArcSwap::from_pointee(peer.local_addr().unwrap())),
            outbound,
            stream: RtpStream::with_start(0x1234, 1, 0, 160),
            counters: counters.clone(),
            cancel: cancel.clone(),
        };
        let handle = thread::spawn(move || tx.run());

        let mut buf = [0u8; 2048];
        let len = peer.recv(&mut buf).unwrap();
        let packet = RtpPacketView::parse(&buf[..len]).unwrap();
        assert_eq!(packet.payload, &[ULAW_SILENCE; PCMU_PAYLOAD_BYTES][..]);

        cancel.cancel();
        handle.join().unwrap();
        assert_eq!(counters.invalid_frames.load(Ordering::Relaxed), 1);
    }
}
