//! Pure parsing of request heads, query strings and bodies.
//!
//! Nothing here performs I/O. The connection loop hands in the bytes the
//! frame reader collected and gets structured values back.

use std::borrow::Cow;
use std::collections::HashMap;

use memchr::memmem;
use percent_encoding::percent_decode_str;
use serde_json::Value;
use thiserror::Error;

use crate::http::headers::Headers;
use crate::http::request::Method;

pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("request line needs method, target and version")]
    MalformedRequestLine,
    #[error("invalid Content-Length value {0:?}")]
    InvalidContentLength(String),
}

/// The three tokens of the first line of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Method,
    pub target: String,
    pub version: String,
}

/// Request line plus header fields, everything before the body.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    /// Raw request target, query string included.
    pub target: String,
    pub version: String,
    pub headers: Headers,
}

impl RequestHead {
    /// Declared body length; zero when the header is absent.
    pub fn content_length(&self) -> Result<usize, ParseError> {
        match self.headers.get("Content-Length") {
            None => Ok(0),
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ParseError::InvalidContentLength(value.to_string())),
        }
    }
}

/// Finds the end of the header block, terminator included.
///
/// `from` lets callers skip bytes they already scanned.
pub fn find_header_end(buf: &[u8], from: usize) -> Option<usize> {
    let from = from.min(buf.len());
    memmem::find(&buf[from..], HEADER_TERMINATOR).map(|pos| from + pos + HEADER_TERMINATOR.len())
}

/// Splits a frame into the header block (terminator excluded) and whatever
/// followed it.
pub fn split_header_block(frame: &[u8]) -> (&[u8], &[u8]) {
    match find_header_end(frame, 0) {
        Some(end) => (&frame[..end - HEADER_TERMINATOR.len()], &frame[end..]),
        None => (frame, &[]),
    }
}

/// Parses `METHOD SP target SP version`.
///
/// Tokens are separated by single spaces. Anything past the third token is
/// ignored and the version is not validated.
pub fn parse_request_line(line: &[u8]) -> Result<RequestLine, ParseError> {
    let mut parts = line.split(|b| *b == b' ');
    let (Some(method), Some(target), Some(version)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(ParseError::MalformedRequestLine);
    };

    Ok(RequestLine {
        method: Method::parse(&String::from_utf8_lossy(method)),
        target: String::from_utf8_lossy(target).into_owned(),
        version: String::from_utf8_lossy(version).into_owned(),
    })
}

/// Parses header lines into a map.
///
/// Each line is split on its first colon and both sides are trimmed. Lines
/// without a colon are skipped.
pub fn parse_headers<'a, I>(lines: I) -> Headers
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut headers = Headers::new();

    for line in lines {
        let Some(colon) = memchr::memchr(b':', line) else {
            continue;
        };
        let name = String::from_utf8_lossy(&line[..colon]);
        let value = String::from_utf8_lossy(&line[colon + 1..]);
        headers.insert(name.trim(), value.trim());
    }

    headers
}

/// Parses a header block (no terminator) into its request line and headers.
pub fn parse_head(head: &[u8]) -> Result<RequestHead, ParseError> {
    let mut lines = split_lines(head);
    let first = lines.next().ok_or(ParseError::MalformedRequestLine)?;
    let line = parse_request_line(first)?;
    let headers = parse_headers(lines.filter(|l| !l.is_empty()));

    Ok(RequestHead {
        method: line.method,
        target: line.target,
        version: line.version,
        headers,
    })
}

fn split_lines(block: &[u8]) -> impl Iterator<Item = &[u8]> {
    let mut rest = Some(block);
    std::iter::from_fn(move || {
        let current = rest?;
        match memmem::find(current, b"\r\n") {
            Some(pos) => {
                rest = Some(&current[pos + 2..]);
                Some(&current[..pos])
            }
            None => {
                rest = None;
                Some(current)
            }
        }
    })
}

/// Splits a request target on its first `?`.
pub fn split_path_and_query(target: &str) -> (&str, Option<&str>) {
    match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    }
}

/// Parses `application/x-www-form-urlencoded` data.
///
/// Pairs without an `=` are skipped. Keys and values are decoded
/// independently; a token that fails to decode is kept as sent.
pub fn parse_form_encoded(data: &[u8]) -> HashMap<String, String> {
    let text = String::from_utf8_lossy(data);
    let mut pairs = HashMap::new();

    for pair in text.split('&') {
        if let Some((key, value)) = pair.split_once('=') {
            pairs.insert(decode_component(key), decode_component(value));
        }
    }

    pairs
}

/// Decodes one form/query token: `+` becomes a space and `%XX` escapes are
/// resolved. Returns the token unchanged if an escape is malformed or the
/// result is not UTF-8.
pub fn decode_component(token: &str) -> String {
    if !has_valid_escapes(token.as_bytes()) {
        return token.to_string();
    }

    let spaced: Cow<'_, str> = if token.contains('+') {
        Cow::Owned(token.replace('+', " "))
    } else {
        Cow::Borrowed(token)
    };

    match percent_decode_str(&spaced).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => token.to_string(),
    }
}

fn has_valid_escapes(bytes: &[u8]) -> bool {
    let mut i = 0;
    while let Some(offset) = memchr::memchr(b'%', &bytes[i..]) {
        let at = i + offset;
        match bytes.get(at + 1..at + 3) {
            Some([hi, lo]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => i = at + 3,
            _ => return false,
        }
    }
    true
}

/// Parses a JSON object into string fields.
///
/// String values are taken as-is, every other value is rendered as JSON
/// text. Input that is not a JSON object yields an empty map.
pub fn parse_json_object(data: &[u8]) -> HashMap<String, String> {
    let Ok(object) = serde_json::from_slice::<serde_json::Map<String, Value>>(data) else {
        return HashMap::new();
    };

    object
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (key, text)
        })
        .collect()
}

/// Decodes a body according to its Content-Type.
pub fn parse_body(content_type: Option<&str>, body: &[u8]) -> HashMap<String, String> {
    if body.is_empty() {
        return HashMap::new();
    }

    match content_type {
        Some(ct) if ct.contains("application/json") => parse_json_object(body),
        _ => parse_form_encoded(body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_end_skips_scanned_prefix() {
        let frame = b"GET / HTTP/1.1\r\nHost: x\r\n\r\nbody";
        assert_eq!(find_header_end(frame, 0), Some(frame.len() - 4));
        assert_eq!(find_header_end(frame, 20), Some(frame.len() - 4));
        assert_eq!(find_header_end(b"GET / HTTP/1.1\r\n", 0), None);
    }

    #[test]
    fn split_lines_keeps_trailing_segment() {
        let lines: Vec<&[u8]> = split_lines(b"a\r\nb\r\nc").collect();
        assert_eq!(lines, vec![&b"a"[..], &b"b"[..], &b"c"[..]]);
    }

    #[test]
    fn escape_validation() {
        assert!(has_valid_escapes(b"John%20Doe"));
        assert!(has_valid_escapes(b"plain"));
        assert!(!has_valid_escapes(b"100%"));
        assert!(!has_valid_escapes(b"%zz"));
    }
}
