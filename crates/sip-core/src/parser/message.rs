//! Start line and header parsing
//!
//! A message head is a start line followed by header lines, each ended by
//! CRLF (a bare LF is tolerated). Folded lines are joined before parsing.

use super::utils::unfold_lws;
use crate::error::{Error, Result};
use crate::types::{Header, HeaderName, Method, StatusCode};
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_till1, take_while1, take_while_m_n},
    character::complete::{char, not_line_ending, space0, space1},
    combinator::map_res,
    multi::many0,
    sequence::{terminated, tuple},
};

/// First line of a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartLine {
    Request { method: Method, uri: String },
    Response { status: StatusCode, reason: String },
}

/// Parsed start line and headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Head {
    pub start: StartLine,
    pub headers: Vec<Header>,
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-.!%*_+`'~".contains(c)
}

fn token(input: &str) -> IResult<&str, &str> {
    take_while1(is_token_char)(input)
}

fn line_end(input: &str) -> IResult<&str, &str> {
    alt((tag("\r\n"), tag("\n")))(input)
}

fn sip_version(input: &str) -> IResult<&str, &str> {
    tag_no_case("SIP/2.0")(input)
}

/// `Method SP Request-URI SP SIP-Version CRLF`
fn request_line(input: &str) -> IResult<&str, StartLine> {
    let (input, (method, _, uri, _, _)) = terminated(
        tuple((
            token,
            space1,
            take_till1(|c: char| c.is_ascii_whitespace()),
            space1,
            sip_version,
        )),
        line_end,
    )(input)?;

    let method = match method.parse::<Method>() {
        Ok(method) => method,
        Err(never) => match never {},
    };
    Ok((
        input,
        StartLine::Request {
            method,
            uri: uri.to_string(),
        },
    ))
}

/// `SIP-Version SP Status-Code SP Reason-Phrase CRLF`
fn status_line(input: &str) -> IResult<&str, StartLine> {
    let (input, (_, _, status, _, reason)) = terminated(
        tuple((
            sip_version,
            space1,
            map_res(take_while_m_n(3, 3, |c: char| c.is_ascii_digit()), |code: &str| {
                code.parse::<u16>()
                    .map_err(|e| Error::parse(e.to_string()))
                    .and_then(StatusCode::from_u16)
            }),
            space0,
            not_line_ending,
        )),
        line_end,
    )(input)?;

    Ok((
        input,
        StartLine::Response {
            status,
            reason: reason.trim().to_string(),
        },
    ))
}

/// `field-name HCOLON field-value CRLF`
fn header_line(input: &str) -> IResult<&str, Header> {
    let (input, (name, _, _, _, value)) = terminated(
        tuple((token, space0, char(':'), space0, not_line_ending)),
        line_end,
    )(input)?;

    let name = match name.parse::<HeaderName>() {
        Ok(name) => name,
        Err(never) => match never {},
    };
    Ok((input, Header::new(name, value.trim())))
}

/// Parse the head of a message (everything before the blank line).
pub fn parse_head(head: &str) -> Result<Head> {
    let unfolded = unfold_lws(head);
    let input: &str = &unfolded;

    let (input, start) = alt((status_line, request_line))(input)
        .map_err(|e| Error::parse(format!("invalid start line: {e}")))?;
    let (input, headers) = many0(header_line)(input)
        .map_err(|e| Error::parse(format!("invalid header block: {e}")))?;

    let leftover = input.trim();
    if !leftover.is_empty() {
        let line = leftover.lines().next().unwrap_or(leftover);
        return Err(Error::parse(format!("malformed header line: {line:?}")));
    }

    Ok(Head { start, headers })
}

/// Split a datagram at the first blank line. The head keeps the line break
/// ending its last header; the body is everything after the blank line.
pub fn split_head_body(data: &[u8]) -> (&[u8], &[u8]) {
    if let Some(pos) = find(data, b"\r\n\r\n") {
        return (&data[..pos + 2], &data[pos + 4..]);
    }
    if let Some(pos) = find(data, b"\n\n") {
        return (&data[..pos + 1], &data[pos + 2..]);
    }
    (data, &[])
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
