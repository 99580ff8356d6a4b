//! Request head decoder.
//!
//! Parses the request line and the header block into a [`RequestHead`]. The
//! parser is deliberately strict: the request line must consist of exactly three
//! tokens separated by single spaces, header lines must use `": "` as separator,
//! and the whole block must fit within the configured byte ceiling.
//!
//! Both `\r\n` and bare `\n` are accepted as line terminators.

use bytes::BytesMut;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{DEFAULT_MAX_HEADER_BYTES, ParseError, RequestHead};

/// Decoder for the head of an HTTP request.
#[derive(Debug, Clone, Copy)]
pub struct HeaderDecoder {
    max_header_bytes: usize,
}

impl HeaderDecoder {
    pub fn new(max_header_bytes: usize) -> Self {
        Self { max_header_bytes }
    }
}

impl Default for HeaderDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HEADER_BYTES)
    }
}

impl Decoder for HeaderDecoder {
    type Item = RequestHead;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(head_len) = find_head_end(src)? else {
            ensure!(src.len() < self.max_header_bytes, ParseError::too_large_header(src.len(), self.max_header_bytes));
            return Ok(None);
        };

        trace!(head_len, "found end of request head");
        ensure!(head_len <= self.max_header_bytes, ParseError::too_large_header(head_len, self.max_header_bytes));

        let head_bytes = src.split_to(head_len).freeze();
        let mut lines = Lines::new(&head_bytes);

        let request_line = lines.next().ok_or_else(|| ParseError::invalid_request_line("missing request line"))?;
        let (method, full_path, version) = parse_request_line(request_line)?;

        let mut headers = HeaderMap::new();
        for line in lines {
            if line.is_empty() {
                break;
            }
            let (name, value) = parse_header_line(line)?;
            headers.insert(name, value);
        }

        Ok(Some(RequestHead::new(method, full_path, version, headers)))
    }
}

/// Returns the length of the head including the terminating empty line, if present.
fn find_head_end(src: &[u8]) -> Result<Option<usize>, ParseError> {
    let mut line_start = 0;
    for (i, b) in src.iter().enumerate() {
        if *b != b'\n' {
            continue;
        }
        let line = trim_cr(&src[line_start..i]);
        if line.is_empty() {
            ensure!(line_start > 0, ParseError::invalid_request_line("empty request line"));
            return Ok(Some(i + 1));
        }
        line_start = i + 1;
    }
    Ok(None)
}

fn trim_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

struct Lines<'a> {
    rest: &'a [u8],
}

impl<'a> Lines<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { rest: bytes }
    }
}

impl<'a> Iterator for Lines<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let end = self.rest.iter().position(|b| *b == b'\n')?;
        let line = trim_cr(&self.rest[..end]);
        self.rest = &self.rest[end + 1..];
        Some(line)
    }
}

fn parse_request_line(line: &[u8]) -> Result<(Method, String, String), ParseError> {
    let line = std::str::from_utf8(line).map_err(|_| ParseError::invalid_request_line("request line is not utf-8"))?;

    let tokens: Vec<&str> = line.split(' ').collect();
    let [method, full_path, version] = tokens[..] else {
        return Err(ParseError::invalid_request_line(format!("expected 3 tokens, got {}", tokens.len())));
    };
    ensure!(
        !method.is_empty() && !full_path.is_empty() && !version.is_empty(),
        ParseError::invalid_request_line("empty token")
    );

    let method = Method::from_bytes(method.as_bytes()).map_err(|_| ParseError::InvalidMethod)?;

    ensure!(full_path.starts_with('/'), ParseError::invalid_path(full_path));
    let path = full_path.split('?').next().unwrap_or(full_path);
    ensure!(!path.contains("/../") && !path.contains("/./"), ParseError::path_traversal(full_path));

    Ok((method, full_path.to_string(), version.to_string()))
}

fn parse_header_line(line: &[u8]) -> Result<(HeaderName, HeaderValue), ParseError> {
    let separator = line
        .windows(2)
        .position(|w| w == b": ")
        .ok_or_else(|| ParseError::invalid_header(format!("missing separator in {:?}", String::from_utf8_lossy(line))))?;

    let name = HeaderName::from_bytes(&line[..separator])
        .map_err(|e| ParseError::invalid_header(format!("invalid header name: {e}")))?;
    let value = HeaderValue::from_bytes(&line[separator + 2..])
        .map_err(|e| ParseError::invalid_header(format!("invalid header value: {e}")))?;

    Ok((name, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn decode(s: &str) -> Result<Option<RequestHead>, ParseError> {
        HeaderDecoder::default().decode(&mut BytesMut::from(s))
    }

    #[test]
    fn leaves_body_in_buffer() {
        let str = indoc! {r##"
        GET /index.html HTTP/1.1
        Host: 127.0.0.1:8080
        User-Agent: curl/7.79.1
        Accept: */*

        123"##};

        let mut bytes = BytesMut::from(str);
        let head = HeaderDecoder::default().decode(&mut bytes).unwrap();

        assert!(head.is_some());
        assert_eq!(&bytes[..], &b"123"[..]);
    }

    #[test]
    fn from_curl() {
        let str = indoc! {r##"
        GET /index.html HTTP/1.1
        Host: 127.0.0.1:8080
        User-Agent: curl/7.79.1
        Accept: */*

        "##};

        let head = decode(str).unwrap().unwrap();

        assert_eq!(head.method(), &Method::GET);
        assert_eq!(head.version(), "HTTP/1.1");
        assert_eq!(head.path(), "/index.html");
        assert_eq!(head.query_string(), "");
        assert_eq!(head.headers().len(), 3);
        assert_eq!(head.header("accept"), Some("*/*"));
        assert_eq!(head.header("HOST"), Some("127.0.0.1:8080"));
        assert_eq!(head.header("user-agent"), Some("curl/7.79.1"));
    }

    #[test]
    fn crlf_and_last_write_wins() {
        let head = decode("GET /a?b=1 HTTP/1.0\r\nX-Key: one\r\nx-key: two\r\n\r\n").unwrap().unwrap();

        assert_eq!(head.version(), "HTTP/1.0");
        assert_eq!(head.query_string(), "b=1");
        assert_eq!(head.header("X-KEY"), Some("two"));
        assert_eq!(head.headers().len(), 1);
    }

    #[test]
    fn partial_head_needs_more_data() {
        assert!(decode("GET / HTTP/1.1\r\nHost: a\r\n").unwrap().is_none());
        assert!(decode("").unwrap().is_none());
    }

    #[test]
    fn malformed_request_lines() {
        for line in ["GET /\r\n\r\n", "GET  / HTTP/1.1\r\n\r\n", "GET / HTTP/1.1 extra\r\n\r\n", "\r\n\r\n"] {
            assert!(matches!(decode(line), Err(ParseError::InvalidRequestLine { .. })), "{line:?}");
        }
        assert!(matches!(decode("G(T / HTTP/1.1\r\n\r\n"), Err(ParseError::InvalidMethod)));
        assert!(matches!(decode("GET index HTTP/1.1\r\n\r\n"), Err(ParseError::InvalidPath { .. })));
    }

    #[test]
    fn traversal_is_rejected() {
        assert!(matches!(decode("GET /a/../b HTTP/1.1\r\n\r\n"), Err(ParseError::PathTraversal { .. })));
        assert!(matches!(decode("GET /a/./b HTTP/1.1\r\n\r\n"), Err(ParseError::PathTraversal { .. })));
        assert!(matches!(decode("GET /a/../b?x=1 HTTP/1.1\r\n\r\n"), Err(ParseError::PathTraversal { .. })));
        assert!(decode("GET /a/..b/.c HTTP/1.1\r\n\r\n").unwrap().is_some());
    }

    #[test]
    fn traversal_guard_ignores_query() {
        let head = decode("GET /login?next=/a/../b HTTP/1.1\r\n\r\n").unwrap().unwrap();
        assert_eq!(head.path(), "/login");
        assert_eq!(head.full_path(), "/login?next=/a/../b");
    }

    #[test]
    fn malformed_headers() {
        assert!(matches!(decode("GET / HTTP/1.1\r\nHost:a\r\n\r\n"), Err(ParseError::InvalidHeader { .. })));
        assert!(matches!(decode("GET / HTTP/1.1\r\nBad Name: a\r\n\r\n"), Err(ParseError::InvalidHeader { .. })));
    }

    #[test]
    fn header_ceiling() {
        let mut decoder = HeaderDecoder::new(32);

        let mut partial = BytesMut::from(&[b'a'; 32][..]);
        assert!(matches!(decoder.decode(&mut partial), Err(ParseError::TooLargeHeader { .. })));

        let mut complete = BytesMut::from("GET / HTTP/1.1\r\nHost: example.com\r\n\r\n");
        assert!(matches!(decoder.decode(&mut complete), Err(ParseError::TooLargeHeader { .. })));

        let mut fits = BytesMut::from("GET / HTTP/1.1\r\nA: b\r\n\r\n");
        assert!(decoder.decode(&mut fits).unwrap().is_some());
    }
}
