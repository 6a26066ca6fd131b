//! SDP line parsing
//!
//! Every SDP line has the form `<type>=<value>` with a single-character
//! type (RFC 8866 §5).

use nom::{
    IResult,
    bytes::complete::{tag_no_case, take_till1, take_while1},
    character::complete::{anychar, char, digit1, not_line_ending, space1},
    combinator::{map_res, opt},
    multi::many0,
    sequence::preceded,
};

/// Split one line into its type character and trimmed value.
pub fn parse_sdp_line(input: &str) -> IResult<&str, (char, &str)> {
    let (input, key) = anychar(input)?;
    let (input, _) = char('=')(input)?;
    let (input, value) = not_line_ending(input)?;
    let input = input.trim_start_matches(['\r', '\n']);
    Ok((input, (key, value.trim())))
}

fn field(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c.is_ascii_whitespace())(input)
}

/// `c=` value: `<nettype> <addrtype> <connection-address>`
///
/// Any TTL or address count suffix (`/127`, `/3`) is stripped from the address.
pub fn parse_connection_value(input: &str) -> IResult<&str, (&str, &str, &str)> {
    let (input, net_type) = tag_no_case("IN")(input)?;
    let (input, _) = space1(input)?;
    let (input, addr_type) = take_while1(|c: char| c.is_ascii_alphanumeric())(input)?;
    let (input, _) = space1(input)?;
    let (input, address) = field(input)?;
    let address = address.split('/').next().unwrap_or(address);
    Ok((input, (net_type, addr_type, address)))
}

/// `m=` value: `<media> <port>[/<count>] <proto> <fmt> ...`
pub fn parse_media_value(input: &str) -> IResult<&str, (&str, u16, &str, Vec<&str>)> {
    let (input, media) = field(input)?;
    let (input, _) = space1(input)?;
    let (input, port) = map_res(digit1, str::parse::<u16>)(input)?;
    let (input, _) = opt(preceded(char('/'), digit1))(input)?;
    let (input, _) = space1(input)?;
    let (input, proto) = field(input)?;
    let (input, formats) = many0(preceded(space1, field))(input)?;
    Ok((input, (media, port, proto, formats)))
}
