//! Outbound stream stamping
//!
//! One [`RtpStream`] belongs to the transmit loop of a call. It owns the
//! SSRC and the next sequence number and timestamp, and advances both with
//! wrapping arithmetic after every packet.

use crate::packet::RtpHeader;
use rand::Rng;

/// Random, non-zero synchronization source
pub fn generate_ssrc() -> u32 {
    let mut rng = rand::thread_rng();
    loop {
        let ssrc: u32 = rng.r#gen();
        if ssrc != 0 {
            return ssrc;
        }
    }
}

/// Random starting sequence number
pub fn random_initial_sequence() -> u16 {
    rand::thread_rng().r#gen()
}

/// Random starting timestamp
pub fn random_initial_timestamp() -> u32 {
    rand::thread_rng().r#gen()
}

/// Sequencing state of one outbound RTP stream
#[derive(Debug, Clone)]
pub struct RtpStream {
    ssrc: u32,
    next_sequence: u16,
    next_timestamp: u32,
    samples_per_packet: u32,
}

impl RtpStream {
    /// New stream with random SSRC, sequence number and timestamp
    pub fn new(samples_per_packet: u32) -> Self {
        Self::with_start(
            generate_ssrc(),
            random_initial_sequence(),
            random_initial_timestamp(),
            samples_per_packet,
        )
    }

    pub fn with_start(ssrc: u32, sequence: u16, timestamp: u32, samples_per_packet: u32) -> Self {
        Self {
            ssrc,
            next_sequence: sequence,
            next_timestamp: timestamp,
            samples_per_packet,
        }
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    pub fn next_sequence(&self) -> u16 {
        self.next_sequence
    }

    pub fn next_timestamp(&self) -> u32 {
        self.next_timestamp
    }

    /// Header for the next packet; advances sequence by one and timestamp
    /// by one frame.
    pub fn next_header(&mut self, payload_type: u8) -> RtpHeader {
        let header = RtpHeader::new(
            payload_type,
            self.next_sequence,
            self.next_timestamp,
            self.ssrc,
        );
        self.next_sequence = self.next_sequence.wrapping_add(1);
        self.next_timestamp = self.next_timestamp.wrapping_add(self.samples_per_packet);
        header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssrc_is_never_zero() {
        for _ in 0..1000 {
            assert_ne!(generate_ssrc(), 0);
        }
    }

    #[test]
    fn test_wraps_at_boundaries() {
        let mut stream = RtpStream::with_start(7, u16::MAX, u32::MAX - 100, 160);
        let first = stream.next_header(0);
        let second = stream.next_header(0);

        assert_eq!(first.sequence_number, u16::MAX);
        assert_eq!(second.sequence_number, 0);
        assert_eq!(first.timestamp, u32::MAX - 100);
        assert_eq!(second.timestamp, 59);
        assert_eq!(second.ssrc, 7);
    }
}
