use super::{find_header, find_headers, parse_cseq, tag_param, write_headers};
use crate::error::{Error, Result};
use crate::types::{Header, HeaderName, Method, StatusCode};
use crate::message::SipRequest;
use bytes::Bytes;

/// A SIP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SipResponse {
    pub status: StatusCode,
    pub reason: String,
    pub headers: Vec<Header>,
    pub body: Bytes,
}

impl SipResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            reason: status.reason_phrase().to_string(),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Response to `request`: every Via in order, then From, To, Call-ID
    /// and CSeq copied unchanged (RFC 3261 §8.2.6.2).
    pub fn for_request(request: &SipRequest, status: StatusCode) -> Self {
        let mut response = Self::new(status);
        response.headers.extend(
            request
                .headers
                .iter()
                .filter(|h| h.name == HeaderName::Via)
                .cloned(),
        );
        for name in [HeaderName::From, HeaderName::To, HeaderName::CallId, HeaderName::CSeq] {
            if let Some(value) = request.header(&name) {
                response.headers.push(Header::new(name, value));
            }
        }
        response
    }

    /// Parse a datagram that must hold a response.
    pub fn parse(data: &[u8]) -> Result<Self> {
        match super::SipMessage::parse(data)? {
            super::SipMessage::Response(response) => Ok(response),
            super::SipMessage::Request(_) => Err(Error::parse("expected a response, got a request")),
        }
    }

    /// Add a `tag` to the To header unless it already has one.
    pub fn with_to_tag(mut self, tag: &str) -> Self {
        if let Some(to) = self.headers.iter_mut().find(|h| h.name == HeaderName::To) {
            if tag_param(&to.value).is_none() {
                to.value = format!("{};tag={}", to.value, tag);
            }
        }
        self
    }

    pub fn with_contact(self, uri: &str) -> Self {
        self.with_header(HeaderName::Contact, format!("<{uri}>"))
    }

    pub fn with_header(mut self, name: HeaderName, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(name, value));
        self
    }

    pub fn with_body(mut self, content_type: &str, body: impl Into<Bytes>) -> Self {
        self.headers.retain(|h| h.name != HeaderName::ContentType);
        self.headers.push(Header::new(HeaderName::ContentType, content_type));
        self.body = body.into();
        self
    }

    pub fn header(&self, name: &HeaderName) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn headers_named<'a>(&'a self, name: &'a HeaderName) -> impl Iterator<Item = &'a str> + 'a {
        find_headers(&self.headers, name)
    }

    pub fn call_id(&self) -> Option<&str> {
        self.header(&HeaderName::CallId)
    }

    pub fn cseq(&self) -> Option<(u32, Method)> {
        self.header(&HeaderName::CSeq).and_then(|v| parse_cseq(v).ok())
    }

    pub fn to_tag(&self) -> Option<&str> {
        self.header(&HeaderName::To).and_then(tag_param)
    }

    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Wire form; Content-Length is always written and always correct.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = format!("SIP/2.0 {} {}\r\n", self.status.as_u16(), self.reason).into_bytes();
        write_headers(&mut out, &self.headers, &self.body);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SipRequest {
        SipRequest::new(Method::Invite, "sip:ai@10.0.0.1:5070")
            .with_header(HeaderName::Via, "SIP/2.0/UDP 10.0.0.9;branch=z9hG4bKproxy")
            .with_header(HeaderName::Via, "SIP/2.0/UDP 10.0.0.2:5060;branch=z9hG4bKua")
            .with_header(HeaderName::MaxForwards, "69")
            .with_header(HeaderName::From, "<sip:alice@10.0.0.2>;tag=abc")
            .with_header(HeaderName::To, "<sip:ai@10.0.0.1:5070>")
            .with_header(HeaderName::CallId, "call-1")
            .with_header(HeaderName::CSeq, "7 INVITE")
    }

    #[test]
    fn test_copies_dialog_headers() {
        let response = SipResponse::for_request(&request(), StatusCode::Trying);
        let names: Vec<_> = response.headers.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["Via", "Via", "From", "To", "Call-ID", "CSeq"]);
        let vias: Vec<_> = response.headers_named(&HeaderName::Via).collect();
        assert_eq!(
            vias,
            vec![
                "SIP/2.0/UDP 10.0.0.9;branch=z9hG4bKproxy",
                "SIP/2.0/UDP 10.0.0.2:5060;branch=z9hG4bKua"
            ]
        );
        assert_eq!(response.header(&HeaderName::MaxForwards), None);
    }

    #[test]
    fn test_to_tag_added_once() {
        let response = SipResponse::for_request(&request(), StatusCode::Ok)
            .with_to_tag("t1")
            .with_to_tag("t2");
        assert_eq!(response.header(&HeaderName::To), Some("<sip:ai@10.0.0.1:5070>;tag=t1"));
        assert_eq!(response.to_tag(), Some("t1"));
    }

    #[test]
    fn test_wire_format() {
        let bytes = SipResponse::for_request(&request(), StatusCode::Ok)
            .with_to_tag("t1")
            .with_contact("sip:ai@10.0.0.1:5070")
            .with_body("application/sdp", "v=0\r\n")
            .to_bytes();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("SIP/2.0 200 OK\r\n"));
        assert!(text.contains("\r\nContact: <sip:ai@10.0.0.1:5070>\r\n"));
        assert!(text.contains("\r\nContent-Type: application/sdp\r\n"));
        assert!(text.ends_with("Content-Length: 5\r\n\r\nv=0\r\n"));
    }

    #[test]
    fn test_empty_body_still_has_content_length() {
        let text = String::from_utf8(SipResponse::new(StatusCode::Ok).to_bytes()).unwrap();
        assert_eq!(text, "SIP/2.0 200 OK\r\nContent-Length: 0\r\n\r\n");
    }

    #[test]
    fn test_parse_round_trip() {
        let response = SipResponse::for_request(&request(), StatusCode::CallOrTransactionDoesNotExist);
        let mut parsed = SipResponse::parse(&response.to_bytes()).unwrap();
        parsed.headers.retain(|h| h.name != HeaderName::ContentLength);
        assert_eq!(parsed, response);
        assert_eq!(parsed.cseq(), Some((7, Method::Invite)));
    }
}
