use std::collections::VecDeque;
use std::io;

use crate::enums::ContentType;
use crate::msgs::codec;
use crate::msgs::message::PlainMessage;

/// Largest record we accept: a header plus a maximal plaintext fragment.
const MAX_WIRE_SIZE: usize = PlainMessage::HEADER_SIZE + PlainMessage::MAX_FRAGMENT_LEN;

/// This deframer works to reconstruct TLS records
/// from arbitrary-sized reads, buffering as necessary.
/// The input is `read()`, the output is the `frames` deque.
pub struct RecordDeframer {
    /// Completed frames for output.
    pub frames: VecDeque<PlainMessage>,

    /// Set to true if the peer is not talking TLS, but some other
    /// protocol.  The caller should abort the connection, because
    /// the deframer cannot recover.
    pub desynced: bool,

    /// The currently-accumulating record, possibly followed by the
    /// start of the next.
    buf: Vec<u8>,
}

enum BufferContents {
    /// Contains an invalid record header.
    Invalid,

    /// Might contain a valid record if we receive more.
    /// Perhaps totally empty!
    Partial,

    /// Contains a valid record of this many bytes as a prefix.
    Valid(usize),
}

impl Default for RecordDeframer {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordDeframer {
    pub fn new() -> Self {
        Self {
            frames: VecDeque::new(),
            desynced: false,
            buf: Vec::new(),
        }
    }

    /// Read some bytes from `rd`, and add them to our internal
    /// buffer.  If this means our internal buffer contains
    /// full records, decode them all.
    pub fn read(&mut self, rd: &mut dyn io::Read) -> io::Result<usize> {
        let mut chunk = [0u8; 4096];
        let want = (MAX_WIRE_SIZE - self.buf.len()).min(chunk.len());
        let new_bytes = rd.read(&mut chunk[..want])?;
        self.buf
            .extend_from_slice(&chunk[..new_bytes]);

        loop {
            match self.buf_contents() {
                BufferContents::Invalid => {
                    self.desynced = true;
                    break;
                }
                BufferContents::Partial => break,
                BufferContents::Valid(len) => {
                    let mut rd = codec::Reader::init(&self.buf[..len]);
                    match PlainMessage::read(&mut rd) {
                        Ok(m) => self.frames.push_back(m),
                        Err(_) => {
                            self.desynced = true;
                            break;
                        }
                    }
                    self.buf.drain(..len);
                }
            }
        }

        Ok(new_bytes)
    }

    /// Returns true if we have records for the caller
    /// to process, either whole records in our output
    /// queue or partial records in our buffer.
    pub fn has_pending(&self) -> bool {
        !self.frames.is_empty() || !self.buf.is_empty()
    }

    /// Does our `buf` start with a full record?  It does if it is big
    /// enough to contain a header, and that header has a length which
    /// falls within `buf`.
    fn buf_contents(&self) -> BufferContents {
        if self.buf.is_empty() {
            return BufferContents::Partial;
        }

        if matches!(ContentType::from(self.buf[0]), ContentType::Unknown(_)) {
            return BufferContents::Invalid;
        }

        // every version we speak has major version 3
        if self.buf.len() >= 2 && self.buf[1] != 0x03 {
            return BufferContents::Invalid;
        }

        if self.buf.len() < PlainMessage::HEADER_SIZE {
            return BufferContents::Partial;
        }

        let len = usize::from(u16::from_be_bytes([self.buf[3], self.buf[4]]));
        if len > PlainMessage::MAX_FRAGMENT_LEN {
            return BufferContents::Invalid;
        }

        match self.buf.len() >= PlainMessage::HEADER_SIZE + len {
            true => BufferContents::Valid(PlainMessage::HEADER_SIZE + len),
            false => BufferContents::Partial,
        }
    }
}
