use super::line_parser::{parse_connection_value, parse_media_value, parse_sdp_line};
use crate::error::{Error, Result};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tracing::{debug, trace};

/// What the gateway takes from a remote offer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdpOffer {
    pub connection_address: String,
    pub audio_port: u16,
    /// Offered payload types, in preference order
    pub payload_types: Vec<String>,
}

impl SdpOffer {
    pub fn offers_pcmu(&self) -> bool {
        self.payload_types.iter().any(|pt| pt == "0")
    }

    /// Where the remote expects RTP
    pub fn rtp_endpoint(&self) -> Result<SocketAddr> {
        let ip: Ipv4Addr = self.connection_address.parse().map_err(|_| {
            Error::Sdp(format!(
                "connection address {:?} is not an IPv4 address",
                self.connection_address
            ))
        })?;
        Ok(SocketAddr::new(IpAddr::V4(ip), self.audio_port))
    }
}

/// Read the connection address and first audio stream from an offer.
///
/// The last `c=IN IP4` line wins, so a media-level connection overrides the
/// session-level one. Lines that fail to parse are skipped. An offer without
/// an IPv4 connection or without an audio stream is rejected.
pub fn parse_offer(sdp: &str) -> Result<SdpOffer> {
    let mut connection = None;
    let mut audio = None;

    for raw in sdp.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let Ok((_, (kind, value))) = parse_sdp_line(line) else {
            trace!("Skipping malformed SDP line {:?}", line);
            continue;
        };
        match kind {
            'c' => {
                if let Ok((_, (_, addr_type, address))) = parse_connection_value(value) {
                    if addr_type.eq_ignore_ascii_case("IP4") {
                        connection = Some(address.to_string());
                    } else {
                        debug!(addr_type, "Ignoring non-IPv4 connection line");
                    }
                }
            }
            'm' if audio.is_none() => {
                if let Ok((_, (media, port, _, formats))) = parse_media_value(value) {
                    if media.eq_ignore_ascii_case("audio") {
                        audio = Some((port, formats.into_iter().map(str::to_string).collect()));
                    }
                }
            }
            _ => {}
        }
    }

    let connection_address =
        connection.ok_or_else(|| Error::Sdp("no IPv4 connection line".into()))?;
    let (audio_port, payload_types) =
        audio.ok_or_else(|| Error::Sdp("no audio media line".into()))?;
    if audio_port == 0 {
        return Err(Error::Sdp("audio stream is disabled (port 0)".into()));
    }

    Ok(SdpOffer {
        connection_address,
        audio_port,
        payload_types,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const OFFER: &str = "v=0\r\no=- 1 1 IN IP4 10.0.0.5\r\ns=-\r\nc=IN IP4 10.0.0.5\r\nt=0 0\r\nm=audio 12000 RTP/AVP 0 8 101\r\na=rtpmap:0 PCMU/8000\r\n";

    #[test]
    fn test_parse_offer() {
        let offer = parse_offer(OFFER).unwrap();
        assert_eq!(offer.connection_address, "10.0.0.5");
        assert_eq!(offer.audio_port, 12000);
        assert_eq!(offer.payload_types, vec!["0", "8", "101"]);
        assert!(offer.offers_pcmu());
        assert_eq!(offer.rtp_endpoint().unwrap(), "10.0.0.5:12000".parse().unwrap());
    }

    #[test]
    fn test_missing_lines_are_errors() {
        assert!(matches!(
            parse_offer("v=0\r\nm=audio 12000 RTP/AVP 0\r\n"),
            Err(Error::Sdp(_))
        ));
        assert!(matches!(
            parse_offer("v=0\r\nc=IN IP4 10.0.0.5\r\n"),
            Err(Error::Sdp(_))
        ));
        assert!(parse_offer("").is_err());
    }

    #[test]
    fn test_media_level_connection_and_lf_endings() {
        let sdp = "v=0\nc=IN IP4 10.0.0.1\nm=video 5000 RTP/AVP 96\nm=audio 6000 RTP/AVP 8\nc=IN IP4 10.0.0.2\n";
        let offer = parse_offer(sdp).unwrap();
        assert_eq!(offer.connection_address, "10.0.0.2");
        assert_eq!(offer.audio_port, 6000);
        assert!(!offer.offers_pcmu());
    }

    #[test]
    fn test_ipv6_only_is_rejected() {
        assert!(parse_offer("c=IN IP6 ::1\r\nm=audio 4000 RTP/AVP 0\r\n").is_err());
    }

    #[test]
    fn test_non_ip_address_fails_endpoint() {
        let offer = parse_offer("c=IN IP4 pbx.example.com\r\nm=audio 4000 RTP/AVP 0\r\n").unwrap();
        assert!(matches!(offer.rtp_endpoint(), Err(Error::Sdp(_))));
    }
}
