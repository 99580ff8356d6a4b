//! Websocket messages and their codecs.
//!
//! [`MessageDecoder`] reassembles client frames into messages and enforces the
//! server-side rules: every frame must be masked, a message starts with a
//! non-continuation opcode and continues with continuation frames only,
//! control frames are never fragmented, and both the frame payload and the
//! reassembled message are bounded.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::ensure;
use crate::protocol::{DEFAULT_MAX_MESSAGE_SIZE, Limits};
use crate::ws::frame::{Frame, FrameDecoder, FrameHeader, MAX_CONTROL_PAYLOAD, opcode};
use crate::ws::WsError;

/// A complete websocket message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    opcode: u8,
    data: Bytes,
}

impl Message {
    pub fn new(opcode: u8, data: impl Into<Bytes>) -> Self {
        Self { opcode, data: data.into() }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(opcode::TEXT, text.into())
    }

    pub fn binary(data: impl Into<Bytes>) -> Self {
        Self::new(opcode::BINARY, data)
    }

    pub fn ping(data: impl Into<Bytes>) -> Self {
        Self::new(opcode::PING, data)
    }

    pub fn pong(data: impl Into<Bytes>) -> Self {
        Self::new(opcode::PONG, data)
    }

    /// A close message without status code.
    pub fn close() -> Self {
        Self::new(opcode::CLOSE, Bytes::new())
    }

    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn into_data(self) -> Bytes {
        self.data
    }

    pub fn is_control(&self) -> bool {
        opcode::is_control(self.opcode)
    }

    pub fn is_text(&self) -> bool {
        self.opcode == opcode::TEXT
    }

    pub fn is_close(&self) -> bool {
        self.opcode == opcode::CLOSE
    }

    /// The payload as UTF-8, if it is valid UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }
}

/// Reassembles masked client frames into [`Message`]s.
#[derive(Debug)]
pub struct MessageDecoder {
    frame_decoder: FrameDecoder,
    max_message_size: usize,
    /// Opcode of the message being reassembled, `None` between messages.
    current: Option<u8>,
    buffer: BytesMut,
}

impl MessageDecoder {
    pub fn new(max_frame_payload: usize, max_message_size: usize) -> Self {
        Self { frame_decoder: FrameDecoder::new(max_frame_payload), max_message_size, current: None, buffer: BytesMut::new() }
    }

    pub fn with_limits(limits: &Limits) -> Self {
        Self::new(limits.max_frame_payload, limits.max_message_size)
    }

    /// Checks a frame header against the reassembly state before its payload is read.
    fn check(&self, header: &FrameHeader) -> Result<(), WsError> {
        ensure!(header.mask.is_some(), WsError::UnmaskedFrame);

        match self.current {
            None => {
                ensure!(header.opcode != opcode::CONTINUATION, WsError::ContinuationFirst);
                if opcode::is_control(header.opcode) {
                    ensure!(header.fin, WsError::FragmentedControl { opcode: header.opcode });
                    ensure!(
                        header.payload_len <= MAX_CONTROL_PAYLOAD as u64,
                        WsError::ControlTooLarge { length: header.payload_len }
                    );
                }
            }
            Some(_) => ensure!(header.opcode == opcode::CONTINUATION, WsError::UnexpectedOpcode { opcode: header.opcode }),
        }

        let max_frame_payload = self.frame_decoder.max_frame_payload();
        ensure!(
            header.payload_len <= max_frame_payload as u64,
            WsError::frame_too_large(header.payload_len, max_frame_payload)
        );

        let total = self.buffer.len() as u64 + header.payload_len;
        ensure!(total <= self.max_message_size as u64, WsError::message_too_large(total, self.max_message_size));
        Ok(())
    }
}

impl Default for MessageDecoder {
    fn default() -> Self {
        Self::new(crate::protocol::DEFAULT_MAX_FRAME_PAYLOAD, DEFAULT_MAX_MESSAGE_SIZE)
    }
}

impl Decoder for MessageDecoder {
    type Item = Message;
    type Error = WsError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let Some(header) = FrameHeader::parse(src)? else {
                return Ok(None);
            };
            self.check(&header)?;

            let Some(frame) = self.frame_decoder.decode(src)? else {
                return Ok(None);
            };

            match self.current {
                None if frame.fin => {
                    trace!(opcode = frame.opcode, len = frame.payload.len(), "decoded message");
                    return Ok(Some(Message::new(frame.opcode, frame.payload)));
                }
                None => {
                    self.current = Some(frame.opcode);
                    self.buffer.extend_from_slice(&frame.payload);
                }
                Some(message_opcode) => {
                    self.buffer.extend_from_slice(&frame.payload);
                    if frame.fin {
                        self.current = None;
                        let data = self.buffer.split().freeze();
                        trace!(opcode = message_opcode, len = data.len(), "reassembled message");
                        return Ok(Some(Message::new(message_opcode, data)));
                    }
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(message) = self.decode(buf)? {
            return Ok(Some(message));
        }
        ensure!(buf.is_empty() && self.current.is_none(), WsError::UnexpectedEof);
        Ok(None)
    }
}

/// Writes each [`Message`] as one final, unmasked frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageEncoder;

impl Encoder<Message> for MessageEncoder {
    type Error = WsError;

    fn encode(&mut self, message: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        ensure!((1..=0xF).contains(&message.opcode), WsError::OpcodeOutOfRange { opcode: message.opcode });
        if message.is_control() {
            ensure!(
                message.data.len() <= MAX_CONTROL_PAYLOAD,
                WsError::ControlTooLarge { length: message.data.len() as u64 }
            );
        }

        Frame::new(message.opcode, message.data).encode(dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 4] = [1, 2, 3, 4];

    fn client_frame(opcode: u8, payload: &[u8], fin: bool) -> Vec<u8> {
        let mut buf = BytesMut::new();
        Frame::new(opcode, payload.to_vec()).fin(fin).masked(KEY).encode(&mut buf).unwrap();
        buf.to_vec()
    }

    fn decode_all(bytes: &[u8], decoder: &mut MessageDecoder) -> Result<Vec<Message>, WsError> {
        let mut buf = BytesMut::from(bytes);
        let mut messages = Vec::new();
        while let Some(message) = decoder.decode(&mut buf)? {
            messages.push(message);
        }
        Ok(messages)
    }

    #[test]
    fn single_frame_message() {
        let messages = decode_all(&client_frame(opcode::TEXT, b"hello", true), &mut MessageDecoder::default()).unwrap();
        assert_eq!(messages, vec![Message::text("hello")]);
        assert_eq!(messages[0].as_text(), Some("hello"));
    }

    #[test]
    fn fragmented_equals_unfragmented() {
        let payload: Vec<u8> = (0..=255).cycle().take(1000).collect();

        for cuts in [vec![0, 1000], vec![0, 0, 1000], vec![0, 1, 500, 999, 1000], vec![0, 333, 333, 1000]] {
            let mut wire = Vec::new();
            for (i, pair) in cuts.windows(2).enumerate() {
                let opcode = if i == 0 { opcode::BINARY } else { opcode::CONTINUATION };
                let fin = i == cuts.len() - 2;
                wire.extend(client_frame(opcode, &payload[pair[0]..pair[1]], fin));
            }

            let messages = decode_all(&wire, &mut MessageDecoder::default()).unwrap();
            assert_eq!(messages, vec![Message::binary(payload.clone())], "cuts {cuts:?}");
        }
    }

    #[test]
    fn byte_by_byte_feed() {
        let mut wire = client_frame(opcode::TEXT, b"hel", false);
        wire.extend(client_frame(opcode::CONTINUATION, b"lo", true));

        let mut decoder = MessageDecoder::default();
        let mut buf = BytesMut::new();
        let mut decoded = None;
        for byte in wire {
            buf.extend_from_slice(&[byte]);
            if let Some(message) = decoder.decode(&mut buf).unwrap() {
                decoded = Some(message);
            }
        }
        assert_eq!(decoded, Some(Message::text("hello")));
        assert!(buf.is_empty());
    }

    #[test]
    fn unmasked_frame_is_rejected() {
        let mut buf = BytesMut::new();
        Frame::new(opcode::TEXT, "hi").encode(&mut buf).unwrap();
        assert!(matches!(MessageDecoder::default().decode(&mut buf), Err(WsError::UnmaskedFrame)));
    }

    #[test]
    fn continuation_first_is_rejected() {
        let wire = client_frame(opcode::CONTINUATION, b"x", true);
        assert!(matches!(decode_all(&wire, &mut MessageDecoder::default()), Err(WsError::ContinuationFirst)));
    }

    #[test]
    fn new_opcode_inside_message_is_rejected() {
        let mut wire = client_frame(opcode::TEXT, b"a", false);
        wire.extend(client_frame(opcode::TEXT, b"b", true));
        assert!(matches!(
            decode_all(&wire, &mut MessageDecoder::default()),
            Err(WsError::UnexpectedOpcode { opcode: opcode::TEXT })
        ));

        let mut wire = client_frame(opcode::TEXT, b"a", false);
        wire.extend(client_frame(opcode::PING, b"", true));
        assert!(matches!(decode_all(&wire, &mut MessageDecoder::default()), Err(WsError::UnexpectedOpcode { .. })));
    }

    #[test]
    fn fragmented_control_is_rejected() {
        let wire = client_frame(opcode::PING, b"p", false);
        assert!(matches!(
            decode_all(&wire, &mut MessageDecoder::default()),
            Err(WsError::FragmentedControl { opcode: opcode::PING })
        ));
    }

    #[test]
    fn ceilings() {
        let wire = client_frame(opcode::BINARY, &[0; 11], true);
        assert!(matches!(decode_all(&wire, &mut MessageDecoder::new(10, 100)), Err(WsError::FrameTooLarge { .. })));

        let mut wire = client_frame(opcode::BINARY, &[0; 8], false);
        wire.extend(client_frame(opcode::CONTINUATION, &[0; 8], true));
        assert!(matches!(
            decode_all(&wire, &mut MessageDecoder::new(10, 15)),
            Err(WsError::MessageTooLarge { length: 16, max_size: 15 })
        ));
        assert_eq!(decode_all(&wire, &mut MessageDecoder::new(10, 16)).unwrap().len(), 1);
    }

    #[test]
    fn eof_inside_message() {
        let mut decoder = MessageDecoder::default();
        let mut buf = BytesMut::from(&client_frame(opcode::TEXT, b"a", false)[..]);
        assert!(matches!(decoder.decode_eof(&mut buf), Err(WsError::UnexpectedEof)));

        let mut decoder = MessageDecoder::default();
        let mut buf = BytesMut::from(&[0x81][..]);
        assert!(matches!(decoder.decode_eof(&mut buf), Err(WsError::UnexpectedEof)));

        assert!(MessageDecoder::default().decode_eof(&mut BytesMut::new()).unwrap().is_none());
    }

    #[test]
    fn encoder_writes_unmasked_final_frames() {
        let mut buf = BytesMut::new();
        MessageEncoder.encode(Message::text("Hello"), &mut buf).unwrap();
        assert_eq!(&buf[..], b"\x81\x05Hello");

        let mut buf = BytesMut::new();
        MessageEncoder.encode(Message::pong(Bytes::from_static(b"x")), &mut buf).unwrap();
        assert_eq!(&buf[..], b"\x8a\x01x");
    }

    #[test]
    fn encoder_rejects_invalid_messages() {
        let mut buf = BytesMut::new();
        assert!(matches!(MessageEncoder.encode(Message::new(0, ""), &mut buf), Err(WsError::OpcodeOutOfRange { .. })));
        assert!(matches!(MessageEncoder.encode(Message::new(16, ""), &mut buf), Err(WsError::OpcodeOutOfRange { .. })));
        assert!(matches!(
            MessageEncoder.encode(Message::ping(vec![0; 126]), &mut buf),
            Err(WsError::ControlTooLarge { length: 126 })
        ));
        assert!(buf.is_empty());
    }
}
