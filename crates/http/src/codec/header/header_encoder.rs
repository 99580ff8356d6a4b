//! Response head encoder.
//!
//! Writes the status line followed by every header of a [`Response`] in
//! insertion order and the blank line that ends the head. No header is added
//! implicitly; [`Response::prepare`] is the only place defaults are applied.

use std::io;
use std::io::Write;

use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;

use crate::protocol::{Response, SendError};

/// Initial buffer size reserved for the head
const INIT_HEADER_SIZE: usize = 1024;

/// Encoder for the status line and headers of a [`Response`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderEncoder;

impl Encoder<&Response> for HeaderEncoder {
    type Error = SendError;

    fn encode(&mut self, response: &Response, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(INIT_HEADER_SIZE);

        write!(FastWrite(dst), "HTTP/1.1 {} {}\r\n", response.status().as_u16(), response.status_message())?;

        for entry in response.headers() {
            dst.put_slice(entry.key().as_bytes());
            dst.put_slice(b": ");
            dst.put_slice(entry.value().as_bytes());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// Adapts `BytesMut` to `io::Write` so `write!` can format straight into the buffer.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
