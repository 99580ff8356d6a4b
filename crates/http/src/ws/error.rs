use std::io;
use thiserror::Error;

/// A websocket protocol violation or transport failure.
///
/// Every variant except [`WsError::Io`] means the peer broke the framing rules
/// or exceeded a ceiling; the session must be terminated.
#[derive(Error, Debug)]
pub enum WsError {
    #[error("client frame is not masked")]
    UnmaskedFrame,

    #[error("extended payload length has the top bit set")]
    NegativeLength,

    #[error("message starts with a continuation frame")]
    ContinuationFirst,

    #[error("expected a continuation frame, got opcode {opcode:#x}")]
    UnexpectedOpcode { opcode: u8 },

    #[error("control frame with opcode {opcode:#x} is fragmented")]
    FragmentedControl { opcode: u8 },

    #[error("frame payload {length} exceed the limit {max_size}")]
    FrameTooLarge { length: u64, max_size: usize },

    #[error("message size {length} exceed the limit {max_size}")]
    MessageTooLarge { length: u64, max_size: usize },

    #[error("control frame payload {length} exceed 125 bytes")]
    ControlTooLarge { length: u64 },

    #[error("opcode {opcode} is outside 1..=15")]
    OpcodeOutOfRange { opcode: u8 },

    #[error("stream ended inside a frame or a fragmented message")]
    UnexpectedEof,

    #[error("websocket session is closed")]
    SessionClosed,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl WsError {
    pub fn frame_too_large(length: u64, max_size: usize) -> Self {
        Self::FrameTooLarge { length, max_size }
    }

    pub fn message_too_large(length: u64, max_size: usize) -> Self {
        Self::MessageTooLarge { length, max_size }
    }

    /// Whether the error was caused by the peer rather than by the transport.
    pub fn is_protocol_violation(&self) -> bool {
        !matches!(self, Self::Io { .. })
    }
}

/// Why an upgrade request was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    #[error("upgrade requires GET, got {0}")]
    MethodNotGet(String),

    #[error("upgrade header is not 'websocket'")]
    NotWebSocket,

    #[error("connection header has no 'upgrade' token")]
    MissingConnectionUpgrade,

    #[error("sec-websocket-key is missing or not 24 bytes long")]
    InvalidKey,

    #[error("sec-websocket-version is missing or outside 6..=13")]
    UnsupportedVersion,
}
