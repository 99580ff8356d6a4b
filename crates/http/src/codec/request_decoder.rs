//! HTTP request decoder.
//!
//! Decodes one complete [`Request`] in two phases:
//! 1. the head, through [`HeaderDecoder`]
//! 2. for `POST` only, a body of exactly `Content-Length` bytes through [`LengthDecoder`]
//!
//! The decoder keeps the parsed head while it waits for the body, so it can be
//! driven by `FramedRead` as bytes trickle in.

use bytes::BytesMut;
use http::header;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::body::LengthDecoder;
use crate::codec::header::HeaderDecoder;
use crate::ensure;
use crate::protocol::{Limits, ParseError, Request, RequestHead};

/// A decoder producing fully parsed requests.
#[derive(Debug)]
pub struct RequestDecoder {
    header_decoder: HeaderDecoder,
    max_post_bytes: usize,
    pending: Option<(RequestHead, LengthDecoder)>,
}

impl RequestDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: &Limits) -> Self {
        Self {
            header_decoder: HeaderDecoder::new(limits.max_header_bytes),
            max_post_bytes: limits.max_post_bytes,
            pending: None,
        }
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self::with_limits(&Limits::default())
    }
}

impl Decoder for RequestDecoder {
    type Item = Request;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.pending.is_none() {
            let Some(head) = self.header_decoder.decode(src)? else {
                return Ok(None);
            };

            if !head.has_body() {
                return Request::from_parts(head, None).map(Some);
            }

            let length = content_length(&head, self.max_post_bytes)?;
            trace!(length, "reading request body");
            self.pending = Some((head, LengthDecoder::new(length)));
        }

        let Some((_, body_decoder)) = &mut self.pending else {
            return Ok(None);
        };

        match body_decoder.decode(src)? {
            Some(body) => {
                let Some((head, _)) = self.pending.take() else {
                    return Ok(None);
                };
                Request::from_parts(head, Some(body)).map(Some)
            }
            None => Ok(None),
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(request) = self.decode(buf)? {
            return Ok(Some(request));
        }

        if let Some((_, body_decoder)) = &self.pending {
            return Err(ParseError::premature_end(format!(
                "expected {} body bytes, got {}",
                body_decoder.length(),
                buf.len()
            )));
        }

        ensure!(buf.is_empty(), ParseError::premature_end("stream ended inside the request head"));
        Ok(None)
    }
}

/// Reads `Content-Length` as a signed integer, exactly as sent.
fn content_length(head: &RequestHead, max_post_bytes: usize) -> Result<usize, ParseError> {
    let value = head
        .header(header::CONTENT_LENGTH.as_str())
        .ok_or_else(|| ParseError::invalid_content_length("missing content-length"))?;

    let length = value
        .parse::<i64>()
        .map_err(|_| ParseError::invalid_content_length(format!("value {value} is not an integer")))?;

    let length = u64::try_from(length).map_err(|_| ParseError::invalid_content_length(format!("negative value {length}")))?;

    match usize::try_from(length) {
        Ok(length) if length <= max_post_bytes => Ok(length),
        _ => Err(ParseError::too_large_body(length, max_post_bytes)),
    }
}
