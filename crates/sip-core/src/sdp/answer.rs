use std::net::IpAddr;

pub const SDP_CONTENT_TYPE: &str = "application/sdp";

/// `s=` line of every answer
pub const SESSION_NAME: &str = "callbridge";

/// Answer offering PCMU (0) and telephone-event (101) on `rtp_port`.
pub fn build_answer(local_ip: IpAddr, rtp_port: u16) -> String {
    [
        "v=0".to_string(),
        format!("o=- 0 0 IN IP4 {local_ip}"),
        format!("s={SESSION_NAME}"),
        format!("c=IN IP4 {local_ip}"),
        "t=0 0".to_string(),
        format!("m=audio {rtp_port} RTP/AVP 0 101"),
        "a=rtpmap:0 PCMU/8000".to_string(),
        "a=rtpmap:101 telephone-event/8000".to_string(),
        "a=fmtp:101 0-15".to_string(),
        "a=sendrecv".to_string(),
        String::new(),
    ]
    .join("\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdp::parse_offer;

    #[test]
    fn test_answer_template() {
        let answer = build_answer("192.168.88.254".parse().unwrap(), 40000);
        assert_eq!(
            answer,
            "v=0\r\n\
o=- 0 0 IN IP4 192.168.88.254\r\n\
s=callbridge\r\n\
c=IN IP4 192.168.88.254\r\n\
t=0 0\r\n\
m=audio 40000 RTP/AVP 0 101\r\n\
a=rtpmap:0 PCMU/8000\r\n\
a=rtpmap:101 telephone-event/8000\r\n\
a=fmtp:101 0-15\r\n\
a=sendrecv\r\n"
        );
    }

    #[test]
    fn test_answer_parses_as_offer() {
        let answer = build_answer("10.1.2.3".parse().unwrap(), 41000);
        let parsed = parse_offer(&answer).unwrap();
        assert_eq!(parsed.rtp_endpoint().unwrap(), "10.1.2.3:41000".parse().unwrap());
        assert_eq!(parsed.payload_types, vec!["0", "101"]);
    }
}
