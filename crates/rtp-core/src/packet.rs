//! RTP packet structure

use crate::error::{Result, RtpError};

/// RTP protocol version
pub const RTP_VERSION: u8 = 2;

/// Size of the fixed RTP header in bytes
pub const RTP_HEADER_SIZE: usize = 12;

/// Fixed RTP header fields written on every outbound packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtpHeader {
    pub marker: bool,
    pub payload_type: u8,
    pub sequence_number: u16,
    pub timestamp: u32,
    pub ssrc: u32,
}

impl RtpHeader {
    pub fn new(payload_type: u8, sequence_number: u16, timestamp: u32, ssrc: u32) -> Self {
        Self {
            marker: false,
            payload_type,
            sequence_number,
            timestamp,
            ssrc,
        }
    }

    /// Write the 12-byte header into the front of `buf`.
    pub fn write_to(&self, buf: &mut [u8]) -> Result<()> {
        if buf.len() < RTP_HEADER_SIZE {
            return Err(RtpError::BufferTooSmall {
                needed: RTP_HEADER_SIZE,
                actual: buf.len(),
            });
        }

        // V=2, P=0, X=0, CC=0
        buf[0] = RTP_VERSION << 6;
        buf[1] = (if self.marker { 0x80 } else { 0 }) | (self.payload_type & 0x7F);
        buf[2..4].copy_from_slice(&self.sequence_number.to_be_bytes());
        buf[4..8].copy_from_slice(&self.timestamp.to_be_bytes());
        buf[8..12].copy_from_slice(&self.ssrc.to_be_bytes());
        Ok(())
    }
}

/// Owned RTP packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpPacket {
    pub header: RtpHeader,
    pub payload: Vec<u8>,
}

impl RtpPacket {
    pub fn new(header: RtpHeader, payload: Vec<u8>) -> Self {
        Self { header, payload }
    }

    /// Total size on the wire
    pub fn size(&self) -> usize {
        RTP_HEADER_SIZE + self.payload.len()
    }

    /// Serialize into a new buffer
    pub fn encode(&self) -> Vec<u8> {
        let mut data = vec![0u8; self.size()];
        // The buffer is sized for header and payload, so this cannot fail.
        let _ = encode_into(&mut data, &self.header, &self.payload);
        data
    }
}

/// Serialize header and payload into `buf`, returning the packet length.
///
/// The transmit loop reuses one buffer for every packet of a call.
pub fn encode_into(buf: &mut [u8], header: &RtpHeader, payload: &[u8]) -> Result<usize> {
    let total = RTP_HEADER_SIZE + payload.len();
    if buf.len() < total {
        return Err(RtpError::BufferTooSmall {
            needed: total,
            actual: buf.len(),
        });
    }
    header.write_to(buf)?;
    buf[RTP_HEADER_SIZE..total].copy_from_slice(payload);
    Ok(total)
}

/// Zero-copy view of a received packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtpPacketView<'a> {
    pub marker: bool,
    pub payload_type: u8,
    pub sequence_number: u16,
    pub timestamp: u32,
    pub ssrc: u32,
    pub csrc_count: u8,
    pub payload: &'a [u8],
}

impl<'a> RtpPacketView<'a> {
    /// Parse a datagram, skipping CSRC entries, any header extension and
    /// trailing padding.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        if data.len() < RTP_HEADER_SIZE {
            return Err(RtpError::PacketTooShort(data.len()));
        }

        let version = data[0] >> 6;
        if version != RTP_VERSION {
            return Err(RtpError::InvalidVersion(version));
        }

        let padding = (data[0] & 0x20) != 0;
        let extension = (data[0] & 0x10) != 0;
        let csrc_count = data[0] & 0x0F;
        let marker = (data[1] & 0x80) != 0;
        let payload_type = data[1] & 0x7F;
        let sequence_number = u16::from_be_bytes([data[2], data[3]]);
        let timestamp = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        let ssrc = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);

        let mut offset = RTP_HEADER_SIZE + csrc_count as usize * 4;
        if data.len() < offset {
            return Err(RtpError::TruncatedHeader {
                needed: offset,
                actual: data.len(),
            });
        }

        if extension {
            if data.len() < offset + 4 {
                return Err(RtpError::TruncatedHeader {
                    needed: offset + 4,
                    actual: data.len(),
                });
            }
            let words = u16::from_be_bytes([data[offset + 2], data[offset + 3]]) as usize;
            offset += 4 + words * 4;
            if data.len() < offset {
                return Err(RtpError::TruncatedHeader {
                    needed: offset,
                    actual: data.len(),
                });
            }
        }

        let mut end = data.len();
        if padding {
            let pad = data[end - 1] as usize;
            if pad == 0 || offset + pad > end {
                return Err(RtpError::TruncatedHeader {
                    needed: offset + pad.max(1),
                    actual: data.len(),
                });
            }
            end -= pad;
        }

        Ok(Self {
            marker,
            payload_type,
            sequence_number,
            timestamp,
            ssrc,
            csrc_count,
            payload: &data[offset..end],
        })
    }

    pub fn to_owned_packet(&self) -> RtpPacket {
        RtpPacket {
            header: RtpHeader {
                marker: self.marker,
                payload_type: self.payload_type,
                sequence_number: self.sequence_number,
                timestamp: self.timestamp,
                ssrc: self.ssrc,
            },
            payload: self.payload.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let header = RtpHeader::new(0, 0x1234, 0xDEADBEEF, 0x01020304);
        let packet = RtpPacket::new(header, vec![0xFF; 160]);
        let data = packet.encode();

        assert_eq!(data.len(), 172);
        assert_eq!(data[0], 0x80);
        assert_eq!(data[1], 0x00);
        assert_eq!(&data[2..4], &[0x12, 0x34]);
        assert_eq!(&data[4..8], &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(&data[8..12], &[0x01, 0x02, 0x03, 0x04]);
        assert!(data[12..].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_marker_bit() {
        let mut header = RtpHeader::new(101, 1, 2, 3);
        header.marker = true;
        let mut buf = [0u8; 12];
        header.write_to(&mut buf).unwrap();
        assert_eq!(buf[1], 0x80 | 101);
    }

    #[test]
    fn test_parse_round_trip() {
        let header = RtpHeader::new(0, 65535, u32::MAX, 42);
        let data = RtpPacket::new(header, vec![1, 2, 3]).encode();
        let view = RtpPacketView::parse(&data).unwrap();
        assert_eq!(view.to_owned_packet().header, header);
        assert_eq!(view.payload, &[1, 2, 3]);
    }

    #[test]
    fn test_parse_rejects_short_and_bad_version() {
        assert_eq!(RtpPacketView::parse(&[0x80; 11]), Err(RtpError::PacketTooShort(11)));

        let mut data = RtpPacket::new(RtpHeader::new(0, 0, 0, 0), vec![0; 4]).encode();
        data[0] = 0x40;
        assert_eq!(RtpPacketView::parse(&data), Err(RtpError::InvalidVersion(1)));
    }

    #[test]
    fn test_parse_skips_csrc_list() {
        let mut data = vec![0x82, 0x00, 0, 1, 0, 0, 0, 160, 0, 0, 0, 9];
        data.extend_from_slice(&[0xAA; 8]);
        data.extend_from_slice(&[7, 7]);
        let view = RtpPacketView::parse(&data).unwrap();
        assert_eq!(view.csrc_count, 2);
        assert_eq!(view.payload, &[7, 7]);
    }

    #[test]
    fn test_parse_rejects_truncated_csrc_list() {
        let data = [0x8F, 0x00, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0];
        assert!(matches!(
            RtpPacketView::parse(&data),
            Err(RtpError::TruncatedHeader { needed: 72, .. })
        ));
    }

    #[test]
    fn test_parse_skips_extension_and_padding() {
        let mut data = vec![0xB0, 0x00, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1];
        // profile 0xBEDE, one 32-bit word
        data.extend_from_slice(&[0xBE, 0xDE, 0x00, 0x01, 1, 2, 3, 4]);
        data.extend_from_slice(&[9, 9, 9]);
        data.extend_from_slice(&[0, 0, 3]);
        let view = RtpPacketView::parse(&data).unwrap();
        assert_eq!(view.payload, &[9, 9, 9]);
    }

    #[test]
    fn test_encode_into_small_buffer() {
        let mut buf = [0u8; 20];
        let err = encode_into(&mut buf, &RtpHeader::new(0, 0, 0, 0), &[0; 160]).unwrap_err();
        assert_eq!(err, RtpError::BufferTooSmall { needed: 172, actual: 20 });
    }
}
