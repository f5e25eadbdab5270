use crate::crypto::hmac;

pub(crate) static HMAC_SHA1: Hmac = Hmac(&ring::hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY);
pub(crate) static HMAC_SHA256: Hmac = Hmac(&ring::hmac::HMAC_SHA256);
pub(crate) static HMAC_SHA384: Hmac = Hmac(&ring::hmac::HMAC_SHA384);

pub(crate) struct Hmac(&'static ring::hmac::Algorithm);

impl hmac::Hmac for Hmac {
    fn with_key(&self, key: &[u8]) -> Box<dyn hmac::Key> {
        Box::new(Key(ring::hmac::Key::new(*self.0, key)))
    }
}

struct Key(ring::hmac::Key);

impl hmac::Key for Key {
    fn sign(&self, data: &[&[u8]]) -> hmac::Tag {
        let mut ctx = ring::hmac::Context::with_key(&self.0);
        for d in data {
            ctx.update(d);
        }
        hmac::Tag::new(ctx.sign().as_ref())
    }

    fn tag_len(&self) -> usize {
        self.0
            .algorithm()
            .digest_algorithm()
            .output_len()
    }
}
