use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use nano_http::connection::Upgraded;
use nano_http::protocol::{Request, Response};
use nano_http::ws::{Message, WsError, handshake, opcode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::{MessageReader, MessageWriter, SessionLimits, is_upgraded, message_streams};
use crate::router::Route;
use crate::view::{BoxError, View};

/// One open websocket session, driven by its [`SessionHandler`].
///
/// Pings are answered and pongs swallowed inside [`WebSocket::next_message`],
/// so the handler only ever sees data messages.
pub struct WebSocket {
    request: Request,
    reader: MessageReader,
    writer: MessageWriter,
    shutdown: CancellationToken,
    open: bool,
}

impl WebSocket {
    fn new(request: Request, upgraded: Upgraded, limits: SessionLimits) -> Self {
        let (reader, writer, shutdown) = message_streams(upgraded, limits);
        Self { request, reader, writer, shutdown, open: true }
    }

    /// The upgrade request that opened the session.
    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Whether inbound bytes are already buffered, so that
    /// [`next_message`](Self::next_message) can make progress without waiting
    /// on the client. Buffered bytes may still be a partial frame.
    pub fn message_available(&self) -> bool {
        let (leftover, _) = self.reader.get_ref().get_ref();
        let unread = u64::try_from(leftover.get_ref().len()).is_ok_and(|len| leftover.position() < len);
        self.open && (unread || !self.reader.read_buffer().is_empty())
    }

    /// Waits for the next text or binary message.
    ///
    /// Returns `Ok(None)` once the session is closed: the client sent a close
    /// frame, the stream ended, or the server is shutting down. A protocol
    /// violation closes the session and is returned as the error.
    pub async fn next_message(&mut self) -> Result<Option<Message>, WsError> {
        while self.open {
            let next = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => {
                    debug!("server shutting down, closing websocket");
                    self.close().await?;
                    return Ok(None);
                }
                next = self.reader.next() => next,
            };

            let message = match next {
                Some(Ok(message)) => message,
                Some(Err(e)) => {
                    self.open = false;
                    return Err(e);
                }
                None => {
                    debug!("websocket stream ended without close frame");
                    self.open = false;
                    return Ok(None);
                }
            };

            match message.opcode() {
                opcode::PING => {
                    trace!(len = message.data().len(), "ping");
                    self.writer.send(Message::pong(message.into_data())).await?;
                }
                opcode::PONG => trace!("pong"),
                opcode::CLOSE => {
                    debug!("client closed websocket");
                    self.open = false;
                }
                _ => return Ok(Some(message)),
            }
        }
        Ok(None)
    }

    /// Sends `message` as a single frame.
    pub async fn send(&mut self, message: Message) -> Result<(), WsError> {
        if !self.open {
            return Err(WsError::SessionClosed);
        }
        self.writer.send(message).await
    }

    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<(), WsError> {
        self.send(Message::text(text)).await
    }

    pub async fn send_binary(&mut self, data: impl Into<Bytes>) -> Result<(), WsError> {
        self.send(Message::binary(data)).await
    }

    /// Sends a close frame and marks the session closed. Closing twice is a no-op.
    pub async fn close(&mut self) -> Result<(), WsError> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        self.writer.send(Message::close()).await
    }
}

impl fmt::Debug for WebSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocket").field("path", &self.request.path()).field("open", &self.open).finish_non_exhaustive()
    }
}

/// Runs a bidirectional session.
#[async_trait]
pub trait SessionHandler: Send + Sync {
    async fn handle(&self, socket: WebSocket) -> Result<(), BoxError>;
}

/// A [`SessionHandler`] built from an async closure, see [`session_fn`].
pub struct SessionFn<F> {
    f: F,
}

impl<F> fmt::Debug for SessionFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionFn").finish_non_exhaustive()
    }
}

/// Wraps an async closure into a [`SessionHandler`].
///
/// ```
/// use nano_web::views::session_fn;
///
/// let echo = session_fn(|mut socket| async move {
///     while let Some(message) = socket.next_message().await? {
///         socket.send(message).await?;
///     }
///     Ok::<_, nano_web::BoxError>(())
/// });
/// ```
pub fn session_fn<F, Fut>(f: F) -> SessionFn<F>
where
    F: Fn(WebSocket) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    SessionFn { f }
}

#[async_trait]
impl<F, Fut> SessionHandler for SessionFn<F>
where
    F: Fn(WebSocket) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    async fn handle(&self, socket: WebSocket) -> Result<(), BoxError> {
        (self.f)(socket).await
    }
}

/// Accepts websocket upgrades and hands every session to a [`SessionHandler`].
pub struct BidirectionalWebSocketView<H> {
    handler: H,
    limits: SessionLimits,
}

impl<H: SessionHandler> BidirectionalWebSocketView<H> {
    pub fn new(handler: H) -> Self {
        Self { handler, limits: SessionLimits::default() }
    }

    /// Overrides the server-wide frame payload ceiling for this view.
    pub fn max_frame_payload(mut self, size: usize) -> Self {
        self.limits.max_frame_payload = Some(size);
        self
    }

    /// Overrides the server-wide message size ceiling for this view.
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.limits.max_message_size = Some(size);
        self
    }
}

impl<H> fmt::Debug for BidirectionalWebSocketView<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BidirectionalWebSocketView").field("limits", &self.limits).finish_non_exhaustive()
    }
}

#[async_trait]
impl<H: SessionHandler> View for BidirectionalWebSocketView<H> {
    async fn response(&self, req: &Request, _route: &Route) -> Result<Response, BoxError> {
        Ok(handshake::response(req))
    }

    async fn post_response(&self, req: &Request, res: &Response, upgraded: Upgraded) -> Result<(), BoxError> {
        if !is_upgraded(res) {
            return Ok(());
        }
        debug!(path = req.path(), "websocket session opened");

        let socket = WebSocket::new(req.clone(), upgraded, self.limits);
        self.handler.handle(socket).await?;
        debug!(path = req.path(), "websocket session closed");
        Ok(())
    }
}
