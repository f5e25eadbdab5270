/// HMAC over one hash function, as the PRF's `P_hash` needs it.
pub trait Hmac: Send + Sync {
    fn with_key(&self, key: &[u8]) -> Box<dyn Key>;
}

const MAX_TAG: usize = 64;

/// An HMAC output held by value.
#[derive(Clone)]
pub struct Tag {
    buf: [u8; MAX_TAG],
    used: usize,
}

impl Tag {
    pub(crate) fn new(bytes: &[u8]) -> Self {
        let mut buf = [0u8; MAX_TAG];
        buf[..bytes.len()].copy_from_slice(bytes);
        Self {
            buf,
            used: bytes.len(),
        }
    }
}

impl AsRef<[u8]> for Tag {
    fn as_ref(&self) -> &[u8] {
        &self.buf[..self.used]
    }
}

/// A keyed HMAC instance.
pub trait Key: Send + Sync {
    /// The tag over the concatenation of `data`.
    fn sign(&self, data: &[&[u8]]) -> Tag;

    fn tag_len(&self) -> usize;
}
