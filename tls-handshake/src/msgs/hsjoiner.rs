use std::collections::VecDeque;

use crate::enums::{ContentType, HandshakeType, ProtocolVersion};
use crate::error::InvalidMessage;
use crate::msgs::base::Payload;
use crate::msgs::codec;
use crate::msgs::handshake::HandshakeMessagePayload;
use crate::msgs::message::{Message, MessagePayload, PlainMessage};

const HEADER_SIZE: usize = 1 + 3;

/// TLS allows for handshake messages of up to 16MB.  We
/// restrict that to 64KB to limit potential for denial-of-
/// service.
const MAX_HANDSHAKE_SIZE: u32 = 0xffff;

/// This works to reconstruct TLS handshake messages
/// from individual TLS records.  It's guaranteed that
/// messages output from this layer contain precisely
/// one handshake payload, together with the exact bytes
/// it had on the wire.
///
/// Bytes stay buffered here until a whole message is available,
/// so a caller that is interrupted between records loses nothing.
/// Complete messages are only parsed when popped: the layout of some
/// of them depends on the version the preceding ServerHello chose.
pub struct HandshakeJoiner {
    /// Completed, unparsed handshake frames.
    frames: VecDeque<Vec<u8>>,

    /// The message payload we're currently accumulating.
    buf: Vec<u8>,
}

impl Default for HandshakeJoiner {
    fn default() -> Self {
        Self::new()
    }
}

enum BufferState {
    /// Buffer contains a header that introduces a message that is too long.
    MessageTooLarge,

    /// Buffer contains a full header and body.
    OneMessage(usize),

    /// We need more data to see a header and complete body.
    NeedsMoreData,
}

impl HandshakeJoiner {
    /// Make a new HandshakeJoiner.
    pub fn new() -> Self {
        Self {
            frames: VecDeque::new(),
            buf: Vec::new(),
        }
    }

    /// Do we want to process this message?
    pub fn want_message(&self, msg: &PlainMessage) -> bool {
        msg.typ == ContentType::Handshake
    }

    /// Do we have any partial message buffered?
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Are there complete messages waiting to be popped?
    pub fn has_frames(&self) -> bool {
        !self.frames.is_empty()
    }

    /// Discard any buffered fragments and unread frames.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.frames.clear();
    }

    /// Take the record, and join/split it as needed.
    ///
    /// Returns an error if the record introduces a message larger than
    /// we are prepared to buffer.  You cannot recover from this situation.
    /// Otherwise returns a count of how many messages we completed.
    pub fn take_message(&mut self, msg: PlainMessage) -> Result<usize, InvalidMessage> {
        // The vast majority of the time `self.buf` will be empty since most
        // handshake messages arrive in a single fragment. Avoid allocating and
        // copying in that common case.
        if self.buf.is_empty() {
            self.buf = msg.payload.0;
        } else {
            self.buf
                .extend_from_slice(&msg.payload.0[..]);
        }

        let mut count = 0;
        loop {
            match self.buf_contains_message() {
                BufferState::MessageTooLarge => return Err(InvalidMessage::HandshakePayloadTooLarge),
                BufferState::NeedsMoreData => break,
                BufferState::OneMessage(len) => {
                    let rest = self.buf.split_off(len);
                    let frame = core::mem::replace(&mut self.buf, rest);
                    self.frames.push_back(frame);
                    count += 1;
                }
            }
        }

        Ok(count)
    }

    /// Parse the oldest complete message as for protocol `version`.
    pub fn pop(&mut self, version: ProtocolVersion) -> Option<Result<Message, InvalidMessage>> {
        let frame = self.frames.pop_front()?;
        let mut rd = codec::Reader::init(&frame);
        let parsed = match HandshakeMessagePayload::read_version(&mut rd, version) {
            Ok(parsed) => parsed,
            Err(err) => return Some(Err(err)),
        };

        Some(Ok(Message {
            version,
            payload: MessagePayload::Handshake {
                parsed,
                encoded: Payload::new(frame),
            },
        }))
    }

    /// Does our `buf` contain a full handshake payload?  It does if it is big
    /// enough to contain a header, and that header has a length which falls
    /// within `buf`.
    fn buf_contains_message(&self) -> BufferState {
        if self.buf.len() < HEADER_SIZE {
            return BufferState::NeedsMoreData;
        }

        let (header, rest) = self.buf.split_at(HEADER_SIZE);
        match codec::u24::decode(&header[1..]) {
            Some(len) if len.0 > MAX_HANDSHAKE_SIZE => BufferState::MessageTooLarge,
            Some(len) if rest.get(..len.into()).is_some() => {
                BufferState::OneMessage(HEADER_SIZE + usize::from(len))
            }
            _ => BufferState::NeedsMoreData,
        }
    }
}


#[cfg(test)]
mod version_tests {
    use super::HandshakeJoiner;
    use crate::enums::{ContentType, ProtocolVersion};
    use crate::msgs::base::Payload;
    use crate::msgs::handshake::HandshakePayload;
    use crate::msgs::message::{MessagePayload, PlainMessage};

    #[test]
    fn parses_with_version_given_at_pop() {
        // CertificateRequest: cert types [rsa_sign], no sigschemes, no CAs.
        // Only well-formed for TLS 1.0/1.1.
        let mut hj = HandshakeJoiner::new();
        let msg = PlainMessage {
            typ: ContentType::Handshake,
            version: ProtocolVersion::TLSv1_0,
            payload: Payload::new(b"\x0d\x00\x00\x04\x01\x01\x00\x00".to_vec()),
        };
        assert_eq!(hj.take_message(msg), Ok(1));
        assert!(hj.has_frames());
        let m = hj
            .pop(ProtocolVersion::TLSv1_0)
            .unwrap()
            .unwrap();
        match m.payload {
            MessagePayload::Handshake { parsed, .. } => {
                assert!(matches!(parsed.payload, HandshakePayload::CertificateRequest(_)))
            }
            _ => panic!("not a handshake message"),
        }
    }
}
