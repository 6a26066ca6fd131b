//! SIP requests and responses

mod request;
mod response;

pub use request::SipRequest;
pub use response::SipResponse;

use crate::error::{Error, Result};
use crate::parser::{Head, StartLine, parse_head, split_head_body};
use crate::types::{Header, HeaderName, Method};
use bytes::Bytes;

/// Either kind of SIP message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SipMessage {
    Request(SipRequest),
    Response(SipResponse),
}

impl SipMessage {
    /// Parse one datagram.
    ///
    /// Leading blank lines (keep-alive CRLFs) are skipped. The body is cut to
    /// Content-Length when present, otherwise it runs to the end of the
    /// datagram. Requests must carry Via, From, To, Call-ID and CSeq.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let start = data
            .iter()
            .position(|b| !matches!(b, b'\r' | b'\n'))
            .ok_or_else(|| Error::parse("empty message"))?;
        let (head, body) = split_head_body(&data[start..]);
        let head = std::str::from_utf8(head).map_err(|_| Error::parse("message head is not UTF-8"))?;

        let Head { start, headers } = parse_head(head)?;
        let body = bounded_body(&headers, body)?;

        match start {
            StartLine::Request { method, uri } => {
                let request = SipRequest {
                    method,
                    uri,
                    headers,
                    body,
                };
                request.validate()?;
                Ok(SipMessage::Request(request))
            }
            StartLine::Response { status, reason } => Ok(SipMessage::Response(SipResponse {
                status,
                reason,
                headers,
                body,
            })),
        }
    }

    pub fn call_id(&self) -> Option<&str> {
        match self {
            SipMessage::Request(r) => r.call_id(),
            SipMessage::Response(r) => r.call_id(),
        }
    }
}

fn bounded_body(headers: &[Header], body: &[u8]) -> Result<Bytes> {
    let Some(value) = find_header(headers, &HeaderName::ContentLength) else {
        return Ok(Bytes::copy_from_slice(body));
    };
    let expected: usize = value
        .parse()
        .map_err(|_| Error::invalid_header(HeaderName::ContentLength, value))?;
    if body.len() < expected {
        return Err(Error::TruncatedBody {
            expected,
            actual: body.len(),
        });
    }
    Ok(Bytes::copy_from_slice(&body[..expected]))
}

pub(crate) fn find_header<'a>(headers: &'a [Header], name: &HeaderName) -> Option<&'a str> {
    headers
        .iter()
        .find(|h| h.name.matches(name))
        .map(|h| h.value.as_str())
}

pub(crate) fn find_headers<'a>(
    headers: &'a [Header],
    name: &'a HeaderName,
) -> impl Iterator<Item = &'a str> + 'a {
    headers
        .iter()
        .filter(move |h| h.name.matches(name))
        .map(|h| h.value.as_str())
}

/// `tag` parameter of a From or To value
pub(crate) fn tag_param(value: &str) -> Option<&str> {
    value.split(';').skip(1).find_map(|param| {
        let (key, val) = param.split_once('=')?;
        key.trim().eq_ignore_ascii_case("tag").then(|| val.trim())
    })
}

/// `CSeq: <number> <method>`
pub(crate) fn parse_cseq(value: &str) -> Result<(u32, Method)> {
    let mut parts = value.split_whitespace();
    let number = parts
        .next()
        .and_then(|n| n.parse::<u32>().ok())
        .ok_or_else(|| Error::invalid_header(HeaderName::CSeq, value))?;
    let method = parts
        .next()
        .ok_or_else(|| Error::invalid_header(HeaderName::CSeq, value))?;
    if parts.next().is_some() {
        return Err(Error::invalid_header(HeaderName::CSeq, value));
    }
    match method.parse::<Method>() {
        Ok(method) => Ok((number, method)),
        Err(never) => match never {},
    }
}

pub(crate) fn write_headers(out: &mut Vec<u8>, headers: &[Header], body: &[u8]) {
    for header in headers.iter().filter(|h| h.name != HeaderName::ContentLength) {
        out.extend_from_slice(header.to_string().as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(format!("Content-Length: {}\r\n\r\n", body.len()).as_bytes());
    out.extend_from_slice(body);
}
