//! Websocket frame codec.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
//! |N|V|V|V|       |S|             |   (if payload len==126/127)   |
//! | |1|2|3|       |K|             |                               |
//! +-+-+-+-+-------+-+-------------+ - - - - - - - - - - - - - - - +
//! |     Extended payload length continued, if payload len == 127  |
//! + - - - - - - - - - - - - - - - +-------------------------------+
//! |                               |Masking-key, if MASK set to 1  |
//! +-------------------------------+-------------------------------+
//! | Masking-key (continued)       |          Payload Data         |
//! +-------------------------------- - - - - - - - - - - - - - - - +
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::DEFAULT_MAX_FRAME_PAYLOAD;
use crate::ws::WsError;

pub mod opcode {
    pub const CONTINUATION: u8 = 0x0;
    pub const TEXT: u8 = 0x1;
    pub const BINARY: u8 = 0x2;
    pub const CLOSE: u8 = 0x8;
    pub const PING: u8 = 0x9;
    pub const PONG: u8 = 0xA;

    /// Control opcodes have bit 3 set.
    pub const fn is_control(opcode: u8) -> bool {
        opcode & 0x8 != 0
    }
}

/// Largest payload a control frame may carry.
pub const MAX_CONTROL_PAYLOAD: usize = 125;

/// One websocket frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub fin: bool,
    pub rsv1: bool,
    pub rsv2: bool,
    pub rsv3: bool,
    pub opcode: u8,
    /// Masking key. On decoded frames this is the key that was read and the
    /// payload is already unmasked.
    pub mask: Option<[u8; 4]>,
    pub payload: Bytes,
}

impl Frame {
    /// A final, unmasked frame without reserved bits.
    pub fn new(opcode: u8, payload: impl Into<Bytes>) -> Self {
        Self { fin: true, rsv1: false, rsv2: false, rsv3: false, opcode, mask: None, payload: payload.into() }
    }

    pub fn fin(mut self, fin: bool) -> Self {
        self.fin = fin;
        self
    }

    pub fn masked(mut self, key: [u8; 4]) -> Self {
        self.mask = Some(key);
        self
    }

    /// Writes the frame using the shortest length encoding.
    ///
    /// When a mask is present the payload is masked with it on the way out.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<(), WsError> {
        ensure!(self.opcode <= 0xF, WsError::OpcodeOutOfRange { opcode: self.opcode });

        let payload_len = self.payload.len();
        let header_len = 2
            + match payload_len {
                0..=125 => 0,
                126..=65535 => 2,
                _ => 8,
            }
            + if self.mask.is_some() { 4 } else { 0 };
        dst.reserve(header_len + payload_len);

        let mut first_byte = self.opcode;
        if self.fin {
            first_byte |= 0x80;
        }
        if self.rsv1 {
            first_byte |= 0x40;
        }
        if self.rsv2 {
            first_byte |= 0x20;
        }
        if self.rsv3 {
            first_byte |= 0x10;
        }
        dst.put_u8(first_byte);

        let mask_bit = if self.mask.is_some() { 0x80 } else { 0 };
        match u16::try_from(payload_len) {
            Ok(len) if len <= 125 => dst.put_u8(mask_bit | len as u8),
            Ok(len) => {
                dst.put_u8(mask_bit | 126);
                dst.put_u16(len);
            }
            Err(_) => {
                dst.put_u8(mask_bit | 127);
                dst.put_u64(payload_len as u64);
            }
        }

        match self.mask {
            Some(key) => {
                dst.put_slice(&key);
                let start = dst.len();
                dst.put_slice(&self.payload);
                apply_mask(&mut dst[start..], key);
            }
            None => dst.put_slice(&self.payload),
        }
        Ok(())
    }
}

/// XORs `payload` in place with `key`; applying it twice restores the input.
pub fn apply_mask(payload: &mut [u8], key: [u8; 4]) {
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte ^= key[i % 4];
    }
}

/// The fixed part of a frame, parsed without consuming input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub fin: bool,
    pub rsv1: bool,
    pub rsv2: bool,
    pub rsv3: bool,
    pub opcode: u8,
    pub mask: Option<[u8; 4]>,
    pub payload_len: u64,
    /// Bytes taken by the header, including extended length and masking key.
    pub header_len: usize,
}

impl FrameHeader {
    /// Parses the header at the start of `src`, or returns `None` when more bytes are needed.
    pub fn parse(src: &[u8]) -> Result<Option<Self>, WsError> {
        if src.len() < 2 {
            return Ok(None);
        }

        let first_byte = src[0];
        let second_byte = src[1];
        let masked = second_byte & 0x80 != 0;

        let mut header_len = 2;
        let payload_len = match second_byte & 0x7F {
            126 => {
                if src.len() < header_len + 2 {
                    return Ok(None);
                }
                header_len += 2;
                u64::from((&src[2..4]).get_u16())
            }
            127 => {
                if src.len() < header_len + 8 {
                    return Ok(None);
                }
                header_len += 8;
                let len = (&src[2..10]).get_u64();
                ensure!(len >> 63 == 0, WsError::NegativeLength);
                len
            }
            len => u64::from(len),
        };

        let mask = if masked {
            if src.len() < header_len + 4 {
                return Ok(None);
            }
            let mut key = [0u8; 4];
            key.copy_from_slice(&src[header_len..header_len + 4]);
            header_len += 4;
            Some(key)
        } else {
            None
        };

        Ok(Some(Self {
            fin: first_byte & 0x80 != 0,
            rsv1: first_byte & 0x40 != 0,
            rsv2: first_byte & 0x20 != 0,
            rsv3: first_byte & 0x10 != 0,
            opcode: first_byte & 0x0F,
            mask,
            payload_len,
            header_len,
        }))
    }
}

/// Decodes single frames, rejecting payloads above a ceiling before reading them.
#[derive(Debug, Clone, Copy)]
pub struct FrameDecoder {
    max_frame_payload: usize,
}

impl FrameDecoder {
    pub fn new(max_frame_payload: usize) -> Self {
        Self { max_frame_payload }
    }

    pub fn max_frame_payload(&self) -> usize {
        self.max_frame_payload
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_PAYLOAD)
    }
}

impl Decoder for FrameDecoder {
    type Item = Frame;
    type Error = WsError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(header) = FrameHeader::parse(src)? else {
            return Ok(None);
        };

        let payload_len = usize::try_from(header.payload_len)
            .ok()
            .filter(|len| *len <= self.max_frame_payload)
            .ok_or_else(|| WsError::frame_too_large(header.payload_len, self.max_frame_payload))?;

        let frame_len = header.header_len + payload_len;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        src.advance(header.header_len);
        let mut payload = src.split_to(payload_len);
        if let Some(key) = header.mask {
            apply_mask(&mut payload, key);
        }

        trace!(opcode = header.opcode, fin = header.fin, payload_len, "decoded frame");
        Ok(Some(Frame {
            fin: header.fin,
            rsv1: header.rsv1,
            rsv2: header.rsv2,
            rsv3: header.rsv3,
            opcode: header.opcode,
            mask: header.mask,
            payload: payload.freeze(),
        }))
    }
}
