pub use crate::msgs::enums::HashAlgorithm;

/// A hash function, used for the handshake transcript, the PRF and
/// legacy signature digests.
pub trait Hash: Send + Sync {
    /// Start an incremental hash computation.
    fn start(&self) -> Box<dyn Context>;

    /// One-shot hash of `data`.
    fn hash(&self, data: &[u8]) -> Output;

    /// Which hash function this is.  The MD5‖SHA-1 concatenation used
    /// before TLS 1.2 reports `HashAlgorithm::NONE`.
    fn algorithm(&self) -> HashAlgorithm;
}

/// A digest held by value, up to SHA-512 in size.
#[derive(Clone)]
pub struct Output {
    buf: [u8; Self::MAX_LEN],
    used: usize,
}

impl Output {
    pub(crate) const MAX_LEN: usize = 64;

    pub(crate) fn new(bytes: &[u8]) -> Self {
        debug_assert!(bytes.len() <= Self::MAX_LEN);
        let mut buf = [0u8; Self::MAX_LEN];
        buf[..bytes.len()].copy_from_slice(bytes);
        Self {
            buf,
            used: bytes.len(),
        }
    }
}

impl AsRef<[u8]> for Output {
    fn as_ref(&self) -> &[u8] {
        &self.buf[..self.used]
    }
}

/// An in-progress hash.
pub trait Context: Send + Sync {
    /// The digest of everything so far; the context stays usable.
    fn fork_finish(&self) -> Output;

    fn finish(self: Box<Self>) -> Output;

    fn update(&mut self, data: &[u8]);
}
