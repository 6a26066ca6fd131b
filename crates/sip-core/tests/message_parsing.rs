//! Parsing datagrams as they arrive from real user agents

use proptest::prelude::*;
use sip_core::sdp::{build_answer, parse_offer};
use sip_core::{HeaderName, Method, SipMessage, SipRequest, SipResponse, StatusCode};

/// INVITE as sent by a softphone behind a proxy, with LF-only SDP body
fn softphone_invite() -> Vec<u8> {
    let body = "v=0\no=- 3900000000 3900000000 IN IP4 172.16.0.20\ns=softphone\nc=IN IP4 172.16.0.20\nt=0 0\nm=audio 7078 RTP/AVP 0 8 18 101\na=rtpmap:101 telephone-event/8000\na=fmtp:101 0-16\n";
    format!(
        "INVITE sip:ai@192.168.88.254:5070;transport=udp SIP/2.0\r\n\
         Via: SIP/2.0/UDP 172.16.0.1:5060;branch=z9hG4bK-proxy;received=172.16.0.1\r\n\
         Via: SIP/2.0/UDP 172.16.0.20:5062;rport=5062;branch=z9hG4bK-phone\r\n\
         From: \"Desk\" <sip:2001@172.16.0.1>;tag=as58f4201b\r\n\
         To: <sip:ai@192.168.88.254:5070>\r\n\
         Contact: <sip:2001@172.16.0.20:5062>\r\n\
         Call-ID: 3848276298220188511@172.16.0.20\r\n\
         CSeq: 102 INVITE\r\n\
         User-Agent: Softphone 5.1\r\n\
         Allow: INVITE, ACK, CANCEL, OPTIONS, BYE, REFER, NOTIFY\r\n\
         Content-Type: application/sdp\r\n\
         Content-Length: {}\r\n\r\n{}",
        body.len(),
        body
    )
    .into_bytes()
}

#[test]
fn test_softphone_invite_and_answer() {
    let request = SipRequest::parse(&softphone_invite()).unwrap();
    assert_eq!(request.method, Method::Invite);
    assert_eq!(request.headers_named(&HeaderName::Via).count(), 2);
    assert_eq!(request.header(&HeaderName::UserAgent), Some("Softphone 5.1"));

    let offer = parse_offer(request.body_str().unwrap()).unwrap();
    assert_eq!(offer.rtp_endpoint().unwrap(), "172.16.0.20:7078".parse().unwrap());
    assert_eq!(offer.payload_types, vec!["0", "8", "18", "101"]);

    let answer = build_answer("192.168.88.254".parse().unwrap(), 40000);
    let response = SipResponse::for_request(&request, StatusCode::Ok)
        .with_to_tag("1a2b3c4d5e")
        .with_contact("sip:ai@192.168.88.254:5070")
        .with_body("application/sdp", answer.clone());

    // What the phone sees must parse back into the same dialog.
    let echoed = match SipMessage::parse(&response.to_bytes()).unwrap() {
        SipMessage::Response(r) => r,
        other => panic!("expected response, got {other:?}"),
    };
    assert_eq!(echoed.status, StatusCode::Ok);
    assert_eq!(echoed.call_id(), request.call_id());
    assert_eq!(echoed.cseq(), Some((102, Method::Invite)));
    assert_eq!(echoed.to_tag(), Some("1a2b3c4d5e"));
    assert_eq!(
        echoed.headers_named(&HeaderName::Via).collect::<Vec<_>>(),
        request.headers_named(&HeaderName::Via).collect::<Vec<_>>()
    );
    assert_eq!(echoed.body_str(), Some(answer.as_str()));
}

#[test]
fn test_compact_form_bye() {
    let data = b"BYE sip:ai@192.168.88.254:5070 SIP/2.0\r\n\
v: SIP/2.0/UDP 172.16.0.20:5062;branch=z9hG4bK-bye\r\n\
f: <sip:2001@172.16.0.1>;tag=as58f4201b\r\n\
t: <sip:ai@192.168.88.254:5070>;tag=1a2b3c4d5e\r\n\
i: 3848276298220188511@172.16.0.20\r\n\
CSeq: 103 BYE\r\n\
l: 0\r\n\r\n";
    let request = SipRequest::parse(data).unwrap();
    assert_eq!(request.method, Method::Bye);
    assert_eq!(request.to_tag(), Some("1a2b3c4d5e"));
    assert!(request.body.is_empty());
}

#[test]
fn test_unknown_method_is_preserved() {
    let data = b"INFO sip:ai@h SIP/2.0\r\nVia: SIP/2.0/UDP h\r\nFrom: <sip:a@h>;tag=1\r\nTo: <sip:ai@h>\r\nCall-ID: x\r\nCSeq: 5 INFO\r\n\r\n";
    let request = SipRequest::parse(data).unwrap();
    assert_eq!(request.method, Method::Other("INFO".into()));
}

proptest! {
    #[test]
    fn parse_never_panics(data in proptest::collection::vec(any::<u8>(), 0..512)) {
        let _ = SipMessage::parse(&data);
    }

    #[test]
    fn truncated_invites_are_rejected_cleanly(cut in 0usize..200) {
        let invite = softphone_invite();
        let cut = invite.len() - 1 - cut.min(invite.len() - 1);
        // Either a clean error or, for cuts inside trailing SDP, a body error.
        if let Ok(SipMessage::Request(r)) = SipMessage::parse(&invite[..cut]) {
            prop_assert_eq!(r.method, Method::Invite);
        }
    }

    #[test]
    fn offers_with_any_port_round_trip(port in 1u16.., a in 1u8..=254, b in 0u8..=255) {
        let ip = format!("10.{a}.{b}.1");
        let sdp = format!("v=0\r\nc=IN IP4 {ip}\r\nm=audio {port} RTP/AVP 0\r\n");
        let offer = parse_offer(&sdp).unwrap();
        prop_assert_eq!(offer.rtp_endpoint().unwrap().port(), port);
        prop_assert_eq!(offer.connection_address, ip);
    }
}
