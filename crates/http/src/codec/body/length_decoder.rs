//! Decoder for a request body of known length.
//!
//! The body is buffered in full: the decoder yields nothing until all
//! `Content-Length` bytes are available, then returns them at once.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::Decoder;

use crate::protocol::ParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthDecoder {
    length: usize,
}

impl LengthDecoder {
    /// `length` must already be checked against the body ceiling.
    pub fn new(length: usize) -> Self {
        Self { length }
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl Decoder for LengthDecoder {
    type Item = Bytes;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < self.length {
            src.reserve(self.length - src.len());
            return Ok(None);
        }

        Ok(Some(src.split_to(self.length).freeze()))
    }
}
