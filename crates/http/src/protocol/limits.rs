//! Resource ceilings applied while reading from a connection.

use serde::{Deserialize, Serialize};

/// Default ceiling for the request line plus headers.
pub const DEFAULT_MAX_HEADER_BYTES: usize = 4 * 1024;

/// Default ceiling for a POST body.
pub const DEFAULT_MAX_POST_BYTES: usize = 64 * 1024;

/// Default ceiling for the payload of a single websocket frame.
pub const DEFAULT_MAX_FRAME_PAYLOAD: usize = 64 * 1024;

/// Default ceiling for a reassembled websocket message.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Byte ceilings for every bounded read the server performs.
///
/// Every field is a hard limit: input exceeding it fails the read instead of
/// being truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Request line and header block, including line terminators.
    pub max_header_bytes: usize,
    /// Largest accepted `Content-Length` of a POST request.
    pub max_post_bytes: usize,
    /// Largest accepted payload of one websocket frame.
    pub max_frame_payload: usize,
    /// Largest accepted cumulative payload of one websocket message.
    pub max_message_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
            max_post_bytes: DEFAULT_MAX_POST_BYTES,
            max_frame_payload: DEFAULT_MAX_FRAME_PAYLOAD,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl Limits {
    /// Sets the ceiling for the request line and headers.
    pub fn max_header_bytes(mut self, size: usize) -> Self {
        self.max_header_bytes = size;
        self
    }

    /// Sets the largest accepted POST body.
    pub fn max_post_bytes(mut self, size: usize) -> Self {
        self.max_post_bytes = size;
        self
    }

    /// Sets the largest accepted websocket frame payload.
    pub fn max_frame_payload(mut self, size: usize) -> Self {
        self.max_frame_payload = size;
        self
    }

    /// Sets the largest accepted reassembled websocket message.
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }
}
