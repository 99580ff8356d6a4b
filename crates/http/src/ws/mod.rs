//! Websocket wire engine (RFC 6455).
//!
//! - [`handshake`]: upgrade validation and the `101 Switching Protocols` response
//! - [`Frame`], [`FrameDecoder`]: single frame encoding and decoding
//! - [`MessageDecoder`]: reassembly of masked client frames into [`Message`]s
//! - [`MessageEncoder`]: unmasked, unfragmented server messages

mod error;
mod frame;
pub mod handshake;
mod message;

pub use error::HandshakeError;
pub use error::WsError;
pub use frame::{Frame, FrameDecoder, FrameHeader, MAX_CONTROL_PAYLOAD, apply_mask, opcode};
pub use message::{Message, MessageDecoder, MessageEncoder};
