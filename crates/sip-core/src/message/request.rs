use super::{find_header, find_headers, parse_cseq, tag_param, write_headers};
use crate::error::{Error, Result};
use crate::types::{Header, HeaderName, Method};
use bytes::Bytes;

/// A SIP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SipRequest {
    pub method: Method,
    pub uri: String,
    pub headers: Vec<Header>,
    pub body: Bytes,
}

impl SipRequest {
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Parse a datagram that must hold a request.
    pub fn parse(data: &[u8]) -> Result<Self> {
        match super::SipMessage::parse(data)? {
            super::SipMessage::Request(request) => Ok(request),
            super::SipMessage::Response(_) => Err(Error::parse("expected a request, got a response")),
        }
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

    /// First value of `name`
    pub fn header(&self, name: &HeaderName) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// All values of `name`, in message order
    pub fn headers_named<'a>(&'a self, name: &'a HeaderName) -> impl Iterator<Item = &'a str> + 'a {
        find_headers(&self.headers, name)
    }

    pub fn call_id(&self) -> Option<&str> {
        self.header(&HeaderName::CallId)
    }

    pub fn cseq(&self) -> Option<(u32, Method)> {
        self.header(&HeaderName::CSeq).and_then(|v| parse_cseq(v).ok())
    }

    pub fn from_tag(&self) -> Option<&str> {
        self.header(&HeaderName::From).and_then(tag_param)
    }

    pub fn to_tag(&self) -> Option<&str> {
        self.header(&HeaderName::To).and_then(tag_param)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(&HeaderName::ContentType)
    }

    /// Body as text, if it is valid UTF-8
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Check the headers RFC 3261 §8.1.1 requires of every request.
    pub fn validate(&self) -> Result<()> {
        for name in [
            HeaderName::Via,
            HeaderName::From,
            HeaderName::To,
            HeaderName::CallId,
            HeaderName::CSeq,
        ] {
            if self.header(&name).is_none() {
                return Err(Error::MissingHeader(name));
            }
        }
        if let Some(cseq) = self.header(&HeaderName::CSeq) {
            parse_cseq(cseq)?;
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = format!("{} {} SIP/2.0\r\n", self.method, self.uri).into_bytes();
        write_headers(&mut out, &self.headers, &self.body);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INVITE: &str = "INVITE sip:ai@192.168.88.254:5070 SIP/2.0\r\n\
Via: SIP/2.0/UDP 192.168.88.10:5060;branch=z9hG4bK776asdhds;rport\r\n\
Max-Forwards: 70\r\n\
f: \"Alice\" <sip:alice@192.168.88.10>;tag=1928301774\r\n\
t: <sip:ai@192.168.88.254:5070>\r\n\
i: a84b4c76e66710@192.168.88.10\r\n\
CSeq: 314159 INVITE\r\n\
m: <sip:alice@192.168.88.10:5060>\r\n\
c: application/sdp\r\n\
l: 124\r\n\
\r\n\
v=0\r\n\
o=alice 2890844526 2890844526 IN IP4 192.168.88.10\r\n\
s=-\r\n\
c=IN IP4 192.168.88.10\r\n\
t=0 0\r\n\
m=audio 49170 RTP/AVP 0 8 101\r\n";

    #[test]
    fn test_parse_invite() {
        let request = SipRequest::parse(INVITE.as_bytes()).unwrap();
        assert_eq!(request.method, Method::Invite);
        assert_eq!(request.uri, "sip:ai@192.168.88.254:5070");
        assert_eq!(request.call_id(), Some("a84b4c76e66710@192.168.88.10"));
        assert_eq!(request.cseq(), Some((314159, Method::Invite)));
        assert_eq!(request.from_tag(), Some("1928301774"));
        assert_eq!(request.to_tag(), None);
        assert_eq!(request.content_type(), Some("application/sdp"));
        assert_eq!(request.header(&HeaderName::MaxForwards), Some("70"));
        let body = request.body_str().unwrap();
        assert!(body.starts_with("v=0\r\n"));
        assert!(body.ends_with("101\r\n"));
        assert_eq!(request.body.len(), 124);
    }

    #[test]
    fn test_missing_call_id_is_rejected() {
        let data = INVITE.replace("i: a84b4c76e66710@192.168.88.10\r\n", "");
        assert_eq!(
            SipRequest::parse(data.as_bytes()).unwrap_err(),
            Error::MissingHeader(HeaderName::CallId)
        );
    }

    #[test]
    fn test_response_is_not_a_request() {
        assert!(SipRequest::parse(b"SIP/2.0 200 OK\r\nContent-Length: 0\r\n\r\n").is_err());
    }

    #[test]
    fn test_to_bytes_round_trip() {
        let request = SipRequest::new(Method::Bye, "sip:ai@10.0.0.1")
            .with_header(HeaderName::Via, "SIP/2.0/UDP 10.0.0.2;branch=z9hG4bKx")
            .with_header(HeaderName::From, "<sip:a@10.0.0.2>;tag=1")
            .with_header(HeaderName::To, "<sip:ai@10.0.0.1>;tag=2")
            .with_header(HeaderName::CallId, "xyz")
            .with_header(HeaderName::CSeq, "2 BYE");
        let mut parsed = SipRequest::parse(&request.to_bytes()).unwrap();
        assert_eq!(parsed.header(&HeaderName::ContentLength), Some("0"));
        parsed.headers.retain(|h| h.name != HeaderName::ContentLength);
        assert_eq!(parsed, request);
    }
}
