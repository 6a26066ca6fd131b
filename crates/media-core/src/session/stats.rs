use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by the media threads
#[derive(Debug, Default)]
pub(crate) struct SessionCounters {
    pub packets_sent: AtomicU64,
    pub send_errors: AtomicU64,
    pub packets_received: AtomicU64,
    pub malformed_packets: AtomicU64,
    pub ignored_packets: AtomicU64,
    pub echoed_frames: AtomicU64,
    pub invalid_frames: AtomicU64,
}

impl SessionCounters {
    #[inline]
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time view of a media session's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediaStats {
    pub packets_sent: u64,
    pub send_errors: u64,
    pub packets_received: u64,
    /// Undecodable packets and PCMU packets of the wrong size
    pub malformed_packets: u64,
    /// Well-formed packets with a payload type other than PCMU
    pub ignored_packets: u64,
    pub echoed_frames: u64,
    /// Queued playback frames of the wrong length, sent as silence
    pub invalid_frames: u64,
    pub capture_dropped_samples: u64,
    pub outbound_dropped_frames: u64,
    pub outbound_queued_frames: usize,
}

impl MediaStats {
    pub(crate) fn from_counters(
        counters: &SessionCounters,
        capture_dropped_samples: u64,
        outbound_dropped_frames: u64,
        outbound_queued_frames: usize,
    ) -> Self {
        Self {
            packets_sent: counters.packets_sent.load(Ordering::Relaxed),
            send_errors: counters.send_errors.load(Ordering::Relaxed),
            packets_received: counters.packets_received.load(Ordering::Relaxed),
            malformed_packets: counters.malformed_packets.load(Ordering::Relaxed),
            ignored_packets: counters.ignored_packets.load(Ordering::Relaxed),
            echoed_frames: counters.echoed_frames.load(Ordering::Relaxed),
            invalid_frames: counters.invalid_frames.load(Ordering::Relaxed),
            capture_dropped_samples,
            outbound_dropped_frames,
            outbound_queued_frames,
        }
    }
}
