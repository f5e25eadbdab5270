use std::io;

#[cfg(feature = "logging")]
use crate::log::trace;
use crate::msgs::deframer::RecordDeframer;
use crate::msgs::message::PlainMessage;
use crate::tls12::DirectionalKeys;

/// The record layer beneath a handshake.
///
/// The handshake only ever sees plaintext records: sealing and opening
/// them is the transport's business.  It tells the transport when to
/// start protecting each direction by handing over the keys at the
/// ChangeCipherSpec boundaries.
///
/// Would-block is signalled with [`io::ErrorKind::WouldBlock`]; the
/// handshake returns [`crate::client::Progress::WouldBlock`] and retries
/// the same operation on the next call.
pub trait RecordTransport {
    /// Return the next whole record.
    ///
    /// Returns `WouldBlock` if no complete record is available yet, and
    /// `UnexpectedEof` once the peer has closed the connection.
    fn read_record(&mut self) -> io::Result<PlainMessage>;

    /// Queue `record` for sending.
    ///
    /// `Ok` means the record was taken in full.  `WouldBlock` means it
    /// was not taken at all; it will be offered again.
    fn write_record(&mut self, record: &PlainMessage) -> io::Result<()>;

    /// Push out anything buffered by `write_record`.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Protect records read from now on with `keys`.
    fn install_read_keys(&mut self, keys: DirectionalKeys);

    /// Protect records written from now on with `keys`.
    fn install_write_keys(&mut self, keys: DirectionalKeys);
}

/// A [`RecordTransport`] over a byte stream, such as a non-blocking
/// `TcpStream`.
///
/// Records are framed and unframed, but never encrypted: installed keys
/// are kept for a record protection layer to pick up.
pub struct StreamTransport<S> {
    stream: S,
    deframer: RecordDeframer,
    sendable: Vec<u8>,
    read_keys: Option<DirectionalKeys>,
    write_keys: Option<DirectionalKeys>,
}

impl<S: io::Read + io::Write> StreamTransport<S> {
    /// Wrap `stream`.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            deframer: RecordDeframer::new(),
            sendable: Vec::new(),
            read_keys: None,
            write_keys: None,
        }
    }

    /// The underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// The underlying stream, mutably.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Unwrap the stream, discarding anything buffered.
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// True if written records are still waiting for the stream.
    pub fn wants_write(&self) -> bool {
        !self.sendable.is_empty()
    }

    /// Keys installed for the read direction, if any.
    pub fn read_keys(&self) -> Option<&DirectionalKeys> {
        self.read_keys.as_ref()
    }

    /// Keys installed for the write direction, if any.
    pub fn write_keys(&self) -> Option<&DirectionalKeys> {
        self.write_keys.as_ref()
    }
}

impl<S: io::Read + io::Write> RecordTransport for StreamTransport<S> {
    fn read_record(&mut self) -> io::Result<PlainMessage> {
        loop {
            if let Some(record) = self.deframer.frames.pop_front() {
                return Ok(record);
            }

            if self.deframer.desynced {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "peer sent something that is not a TLS record",
                ));
            }

            if self.deframer.read(&mut self.stream)? == 0 {
                return Err(io::ErrorKind::UnexpectedEof.into());
            }
        }
    }

    fn write_record(&mut self, record: &PlainMessage) -> io::Result<()> {
        trace!("queueing {:?} record of {} bytes", record.typ, record.payload.0.len());
        self.sendable
            .extend_from_slice(&record.encode());
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        while !self.sendable.is_empty() {
            match self.stream.write(&self.sendable)? {
                0 => return Err(io::ErrorKind::WriteZero.into()),
                n => {
                    self.sendable.drain(..n);
                }
            }
        }
        self.stream.flush()
    }

    fn install_read_keys(&mut self, keys: DirectionalKeys) {
        self.read_keys = Some(keys);
    }

    fn install_write_keys(&mut self, keys: DirectionalKeys) {
        self.write_keys = Some(keys);
    }
}
