use crate::crypto::hash::{self, HashAlgorithm};

pub(crate) struct Hash(&'static ring::digest::Algorithm, HashAlgorithm);

pub(crate) static SHA1: Hash = Hash(&ring::digest::SHA1_FOR_LEGACY_USE_ONLY, HashAlgorithm::SHA1);
pub(crate) static SHA256: Hash = Hash(&ring::digest::SHA256, HashAlgorithm::SHA256);
pub(crate) static SHA384: Hash = Hash(&ring::digest::SHA384, HashAlgorithm::SHA384);

impl hash::Hash for Hash {
    fn start(&self) -> Box<dyn hash::Context> {
        Box::new(Context(ring::digest::Context::new(self.0)))
    }

    fn hash(&self, data: &[u8]) -> hash::Output {
        hash::Output::new(ring::digest::digest(self.0, data).as_ref())
    }

    fn algorithm(&self) -> HashAlgorithm {
        self.1
    }
}

struct Context(ring::digest::Context);

impl hash::Context for Context {
    fn fork_finish(&self) -> hash::Output {
        hash::Output::new(self.0.clone().finish().as_ref())
    }

    fn finish(self: Box<Self>) -> hash::Output {
        hash::Output::new(self.0.finish().as_ref())
    }

    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }
}
