//! Ready-made views.

mod directory;
pub mod websocket;

pub use directory::DirectoryView;
pub use websocket::{BidirectionalWebSocketView, BroadcastWebSocketView, Broadcaster, SessionHandler, WebSocket, session_fn};
