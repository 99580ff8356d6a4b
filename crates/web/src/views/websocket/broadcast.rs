use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use nano_http::connection::Upgraded;
use nano_http::protocol::{Request, Response};
use nano_http::ws::{Message, handshake, opcode};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::{SessionLimits, is_upgraded, message_streams};
use crate::router::Route;
use crate::view::{BoxError, View};

type Sessions = HashMap<u64, mpsc::UnboundedSender<Message>>;

#[derive(Default)]
struct Registry {
    sessions: Mutex<Sessions>,
    next_id: AtomicU64,
}

/// Fans messages out to every open session of a [`BroadcastWebSocketView`].
///
/// Cloning is cheap and every clone feeds the same sessions. Sending never
/// waits for a client: each session has its own queue, drained by the
/// worker serving that session.
#[derive(Clone, Default)]
pub struct Broadcaster {
    registry: Arc<Registry>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `message` for every open session and returns how many got it.
    pub fn send(&self, message: Message) -> usize {
        let sessions = self.sessions();
        sessions.values().filter(|queue| queue.send(message.clone()).is_ok()).count()
    }

    pub fn send_text(&self, text: impl Into<String>) -> usize {
        self.send(Message::text(text))
    }

    pub fn send_binary(&self, data: impl Into<Bytes>) -> usize {
        self.send(Message::binary(data))
    }

    pub fn session_count(&self) -> usize {
        self.sessions().len()
    }

    fn register(&self) -> Registration {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::unbounded_channel();
        self.sessions().insert(id, sender);
        Registration { id, receiver, registry: Arc::clone(&self.registry) }
    }

    fn sessions(&self) -> MutexGuard<'_, Sessions> {
        lock(&self.registry)
    }
}

// a panic while holding the lock cannot leave the map half-updated
fn lock(registry: &Registry) -> MutexGuard<'_, Sessions> {
    registry.sessions.lock().unwrap_or_else(PoisonError::into_inner)
}

impl fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broadcaster").field("sessions", &self.session_count()).finish()
    }
}

/// A session's queue; leaves the registry when dropped.
struct Registration {
    id: u64,
    receiver: mpsc::UnboundedReceiver<Message>,
    registry: Arc<Registry>,
}

impl Drop for Registration {
    fn drop(&mut self) {
        lock(&self.registry).remove(&self.id);
    }
}

/// Accepts websocket upgrades and relays everything sent through its
/// [`Broadcaster`] to all connected clients.
///
/// Inbound data messages are ignored; a close frame ends the session and a
/// ping is answered with a pong.
pub struct BroadcastWebSocketView {
    broadcaster: Broadcaster,
    limits: SessionLimits,
}

impl BroadcastWebSocketView {
    pub fn new() -> Self {
        Self { broadcaster: Broadcaster::new(), limits: SessionLimits::default() }
    }

    /// A handle for sending to this view's sessions, usable from any task or thread.
    pub fn broadcaster(&self) -> Broadcaster {
        self.broadcaster.clone()
    }

    pub fn max_frame_payload(mut self, size: usize) -> Self {
        self.limits.max_frame_payload = Some(size);
        self
    }

    pub fn max_message_size(mut self, size: usize) -> Self {
        self.limits.max_message_size = Some(size);
        self
    }
}

impl Default for BroadcastWebSocketView {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BroadcastWebSocketView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastWebSocketView")
            .field("broadcaster", &self.broadcaster)
            .field("limits", &self.limits)
            .finish()
    }
}

#[async_trait]
impl View for BroadcastWebSocketView {
    async fn response(&self, req: &Request, _route: &Route) -> Result<Response, BoxError> {
        Ok(handshake::response(req))
    }

    async fn post_response(&self, req: &Request, res: &Response, upgraded: Upgraded) -> Result<(), BoxError> {
        if !is_upgraded(res) {
            return Ok(());
        }

        let (mut reader, mut writer, shutdown) = message_streams(upgraded, self.limits);
        let mut registration = self.broadcaster.register();
        debug!(path = req.path(), session = registration.id, "broadcast session opened");

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => {
                    writer.send(Message::close()).await?;
                    break;
                }
                inbound = reader.next() => match inbound {
                    Some(Ok(message)) => match message.opcode() {
                        opcode::CLOSE => break,
                        opcode::PING => writer.send(Message::pong(message.into_data())).await?,
                        other => trace!(opcode = other, "ignoring inbound message"),
                    },
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                },
                Some(message) = registration.receiver.recv() => writer.send(message).await?,
            }
        }

        debug!(path = req.path(), session = registration.id, "broadcast session closed");
        Ok(())
    }
}
