use std::fmt;

use bytes::BytesMut;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::codec::{RequestDecoder, ResponseEncoder};
use crate::protocol::{Limits, ParseError, Request, Response, SendError};

/// Initial capacity of the read buffer
const READ_BUFFER_SIZE: usize = 4 * 1024;

/// One HTTP exchange over a pair of byte streams.
///
/// A connection reads exactly one request and writes exactly one response.
/// Afterwards it can be turned into an [`Upgraded`] stream pair, e.g. to run a
/// websocket session after a `101 Switching Protocols` response.
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    framed_write: FramedWrite<W, ResponseEncoder>,
    limits: Limits,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Send + Unpin + 'static,
    W: AsyncWrite + Send + Unpin + 'static,
{
    pub fn new(reader: R, writer: W, limits: Limits) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, RequestDecoder::with_limits(&limits), READ_BUFFER_SIZE),
            framed_write: FramedWrite::new(writer, ResponseEncoder::new()),
            limits,
        }
    }

    /// Reads and parses the request.
    ///
    /// A stream that ends before a complete request is read fails with
    /// [`ParseError::PrematureEnd`].
    pub async fn read_request(&mut self) -> Result<Request, ParseError> {
        match self.framed_read.next().await {
            Some(Ok(request)) => {
                debug!(method = %request.method(), path = request.path(), "received request");
                Ok(request)
            }
            Some(Err(e)) => Err(e),
            None => Err(ParseError::premature_end("connection closed before a request was received")),
        }
    }

    /// Prepares, serializes and flushes `response`.
    pub async fn send_response(&mut self, response: &mut Response) -> Result<(), SendError> {
        self.framed_write.send(&mut *response).await?;
        trace!(status = response.status().as_u16(), "response sent");
        Ok(())
    }

    /// Releases the underlying streams, keeping any bytes read past the request.
    pub fn into_upgraded(mut self, shutdown: CancellationToken) -> Upgraded {
        let read_buf = self.framed_read.read_buffer_mut().split();
        let reader = self.framed_read.into_inner();
        let writer = self.framed_write.into_inner();
        Upgraded { reader: Box::new(reader), read_buf, writer: Box::new(writer), limits: self.limits, shutdown }
    }
}

impl<R, W> fmt::Debug for HttpConnection<R, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpConnection").field("limits", &self.limits).finish_non_exhaustive()
    }
}

/// The streams of a connection once its HTTP exchange is over.
pub struct Upgraded {
    reader: Box<dyn AsyncRead + Send + Unpin>,
    read_buf: BytesMut,
    writer: Box<dyn AsyncWrite + Send + Unpin>,
    limits: Limits,
    shutdown: CancellationToken,
}

/// The owned pieces of an [`Upgraded`] connection.
pub struct UpgradedParts {
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
    /// Bytes already read from `reader` but not consumed by the request parser.
    pub read_buf: BytesMut,
    pub writer: Box<dyn AsyncWrite + Send + Unpin>,
    pub limits: Limits,
    pub shutdown: CancellationToken,
}

impl Upgraded {
    pub fn new<R, W>(reader: R, writer: W, limits: Limits, shutdown: CancellationToken) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self { reader: Box::new(reader), read_buf: BytesMut::new(), writer: Box::new(writer), limits, shutdown }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Cancelled when the server shuts down.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub fn read_buf(&self) -> &[u8] {
        &self.read_buf
    }

    pub fn into_parts(self) -> UpgradedParts {
        UpgradedParts {
            reader: self.reader,
            read_buf: self.read_buf,
            writer: self.writer,
            limits: self.limits,
            shutdown: self.shutdown,
        }
    }
}

impl fmt::Debug for Upgraded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upgraded")
            .field("buffered", &self.read_buf.len())
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for UpgradedParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpgradedParts")
            .field("buffered", &self.read_buf.len())
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}
