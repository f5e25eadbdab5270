use core::mem;

use crate::crypto::hash;
use crate::crypto::legacy::MD5_SHA1;
use crate::enums::ProtocolVersion;
use crate::msgs::enums::HashAlgorithm;
use crate::msgs::message::{Message, MessagePayload};
use crate::suites::SupportedCipherSuite;

/// Early stage buffering of handshake payloads.
///
/// Before we know the version and cipher suite we cannot know the hash
/// function, so we just buffer the messages.
pub(crate) struct HandshakeHashBuffer {
    buffer: Vec<u8>,
    client_auth_enabled: bool,
}

impl HandshakeHashBuffer {
    pub(crate) fn new() -> Self {
        Self {
            buffer: Vec::new(),
            client_auth_enabled: false,
        }
    }

    /// We might be doing client auth, so need to keep a full
    /// log of the handshake.
    pub(crate) fn set_client_auth_enabled(&mut self) {
        self.client_auth_enabled = true;
    }

    /// Hash/buffer a handshake message.
    pub(crate) fn add_message(&mut self, m: &Message) {
        if let MessagePayload::Handshake { encoded, .. } = &m.payload {
            self.buffer
                .extend_from_slice(&encoded.0);
        }
    }

    /// Hash or buffer a byte slice.
    #[cfg(test)]
    fn update_raw(&mut self, buf: &[u8]) {
        self.buffer.extend_from_slice(buf);
    }

    /// We now know what hash function the verify_data will use.
    pub(crate) fn start_hash(self, provider: &'static dyn hash::Hash) -> HandshakeHash {
        let mut ctx = provider.start();
        ctx.update(&self.buffer);
        HandshakeHash {
            provider,
            ctx,
            client_auth: match self.client_auth_enabled {
                true => Some(self.buffer),
                false => None,
            },
        }
    }
}

/// The transcript hash function for `suite` at `version`.
///
/// TLS 1.2 hashes with the suite's PRF hash; earlier versions use
/// the MD5‖SHA-1 concatenation.
pub(crate) fn transcript_hash_for(
    suite: &'static SupportedCipherSuite,
    version: ProtocolVersion,
) -> &'static dyn hash::Hash {
    match version.uses_legacy_prf() {
        true => &MD5_SHA1,
        false => suite.prf_hash(),
    }
}

/// This deals with keeping a running hash of the handshake
/// payloads.  This is computed by buffering initially.  Once
/// we know what hash function we need to use we switch to
/// incremental hashing.
///
/// For client auth, we also need to buffer all the messages.
/// This is disabled in cases where client auth is not possible.
pub(crate) struct HandshakeHash {
    provider: &'static dyn hash::Hash,
    ctx: Box<dyn hash::Context>,

    /// buffer for client-auth.
    client_auth: Option<Vec<u8>>,
}

impl HandshakeHash {
    /// We decided not to do client auth after all, so discard
    /// the transcript.
    pub(crate) fn abandon_client_auth(&mut self) {
        self.client_auth = None;
    }

    /// Hash/buffer a handshake message.
    pub(crate) fn add_message(&mut self, m: &Message) -> &mut Self {
        if let MessagePayload::Handshake { encoded, .. } = &m.payload {
            self.update_raw(&encoded.0);
        }
        self
    }

    /// Hash or buffer a byte slice.
    fn update_raw(&mut self, buf: &[u8]) -> &mut Self {
        self.ctx.update(buf);

        if let Some(buffer) = &mut self.client_auth {
            buffer.extend_from_slice(buf);
        }

        self
    }

    /// Get the current hash value.
    pub(crate) fn get_current_hash(&self) -> hash::Output {
        self.ctx.fork_finish()
    }

    /// Takes this object's buffer containing all handshake messages
    /// so far.  This method only works once; it resets the buffer
    /// to empty.
    pub(crate) fn take_handshake_buf(&mut self) -> Option<Vec<u8>> {
        self.client_auth.take()
    }

    /// The hashing algorithm; `NONE` for MD5‖SHA-1.
    pub(crate) fn algorithm(&self) -> HashAlgorithm {
        self.provider.algorithm()
    }
}

/// The transcript through a handshake: buffered until the suite is
/// chosen, then hashed incrementally.
pub(crate) enum Transcript {
    Buffering(HandshakeHashBuffer),
    Hashing(HandshakeHash),
}

impl Transcript {
    pub(crate) fn new() -> Self {
        Self::Buffering(HandshakeHashBuffer::new())
    }

    pub(crate) fn add_message(&mut self, m: &Message) {
        match self {
            Self::Buffering(buffer) => buffer.add_message(m),
            Self::Hashing(hash) => {
                hash.add_message(m);
            }
        }
    }

    pub(crate) fn set_client_auth_enabled(&mut self) {
        if let Self::Buffering(buffer) = self {
            buffer.set_client_auth_enabled();
        }
    }

    /// Switch to incremental hashing with `provider`.  Does nothing if
    /// already hashing.
    pub(crate) fn start_hash(&mut self, provider: &'static dyn hash::Hash) {
        if let Self::Buffering(_) = self {
            let old = mem::replace(self, Self::Buffering(HandshakeHashBuffer::new()));
            if let Self::Buffering(buffer) = old {
                *self = Self::Hashing(buffer.start_hash(provider));
            }
        }
    }

    pub(crate) fn hash(&self) -> Option<&HandshakeHash> {
        match self {
            Self::Hashing(hash) => Some(hash),
            Self::Buffering(_) => None,
        }
    }

    pub(crate) fn hash_mut(&mut self) -> Option<&mut HandshakeHash> {
        match self {
            Self::Hashing(hash) => Some(hash),
            Self::Buffering(_) => None,
        }
    }

    /// The current hash value, once hashing has started.
    pub(crate) fn current_hash(&self) -> Option<hash::Output> {
        self.hash().map(HandshakeHash::get_current_hash)
    }
}
