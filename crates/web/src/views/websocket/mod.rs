//! Websocket views.
//!
//! Both views answer the opening handshake from [`View::response`](crate::View::response)
//! and run the session from `post_response` once the `101` has been sent,
//! occupying their worker for the lifetime of the session.

mod bidirectional;
mod broadcast;

pub use bidirectional::{BidirectionalWebSocketView, SessionFn, SessionHandler, WebSocket, session_fn};
pub use broadcast::{BroadcastWebSocketView, Broadcaster};

use std::io::Cursor;

use bytes::BytesMut;
use nano_http::connection::Upgraded;
use nano_http::protocol::{Limits, Response};
use nano_http::ws::{MessageDecoder, MessageEncoder};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, Chain};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;

type BufferedReader = Chain<Cursor<BytesMut>, Box<dyn AsyncRead + Send + Unpin>>;

pub(crate) type MessageReader = FramedRead<BufferedReader, MessageDecoder>;
pub(crate) type MessageWriter = FramedWrite<Box<dyn AsyncWrite + Send + Unpin>, MessageEncoder>;

/// Per-view overrides of the server-wide websocket ceilings.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SessionLimits {
    pub max_frame_payload: Option<usize>,
    pub max_message_size: Option<usize>,
}

impl SessionLimits {
    fn apply(self, limits: &Limits) -> Limits {
        let mut limits = *limits;
        if let Some(size) = self.max_frame_payload {
            limits = limits.max_frame_payload(size);
        }
        if let Some(size) = self.max_message_size {
            limits = limits.max_message_size(size);
        }
        limits
    }
}

/// Whether the handshake succeeded and the session should run.
pub(crate) fn is_upgraded(res: &Response) -> bool {
    res.status() == http::StatusCode::SWITCHING_PROTOCOLS
}

/// Turns the upgraded connection into a message stream and sink.
///
/// Bytes the client sent right after the handshake are decoded first.
pub(crate) fn message_streams(
    upgraded: Upgraded,
    overrides: SessionLimits,
) -> (MessageReader, MessageWriter, CancellationToken) {
    let parts = upgraded.into_parts();
    let limits = overrides.apply(&parts.limits);
    let reader = Cursor::new(parts.read_buf).chain(parts.reader);
    (
        FramedRead::new(reader, MessageDecoder::with_limits(&limits)),
        FramedWrite::new(parts.writer, MessageEncoder::default()),
        parts.shutdown,
    )
}
