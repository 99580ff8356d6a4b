use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;

use crate::codec::header::HeaderEncoder;
use crate::protocol::{Response, SendError};

/// Serializes a [`Response`]: head, blank line, then the raw body.
///
/// The response is prepared before its head is written, so a `Connection: close`
/// header is always present unless the caller set its own.
#[derive(Debug, Default)]
pub struct ResponseEncoder {
    header_encoder: HeaderEncoder,
}

impl ResponseEncoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Encoder<&mut Response> for ResponseEncoder {
    type Error = SendError;

    fn encode(&mut self, response: &mut Response, dst: &mut BytesMut) -> Result<(), Self::Error> {
        response.prepare();
        self.header_encoder.encode(&*response, dst)?;

        dst.reserve(response.body().len());
        dst.put_slice(response.body());
        Ok(())
    }
}
