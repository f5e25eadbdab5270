//! MD5 and the MD5‖SHA-1 construction used by TLS 1.0 and 1.1.
//!
//! *ring* deliberately omits MD5, so these come from the RustCrypto
//! `md-5` and `hmac` crates.

use hmac::{Mac, SimpleHmac};
use md5::{Digest, Md5};

use crate::crypto::hash::{self, HashAlgorithm};
use crate::crypto::{hmac as tls_hmac, ring};

/// MD5, for the TLS 1.0/1.1 PRF and transcript.
pub(crate) static MD5: Md5Hash = Md5Hash;

/// `MD5(m) ‖ SHA1(m)`: the 36-byte digest TLS 1.0/1.1 uses for its
/// transcript and for RSA signatures.
pub(crate) static MD5_SHA1: Md5Sha1 = Md5Sha1;

/// HMAC-MD5, the first half of the TLS 1.0/1.1 PRF.
pub(crate) static HMAC_MD5: HmacMd5 = HmacMd5;

pub(crate) struct Md5Hash;

impl hash::Hash for Md5Hash {
    fn start(&self) -> Box<dyn hash::Context> {
        Box::new(Md5Context(Md5::new()))
    }

    fn hash(&self, data: &[u8]) -> hash::Output {
        hash::Output::new(&Md5::digest(data)[..])
    }

    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::MD5
    }
}

struct Md5Context(Md5);

impl hash::Context for Md5Context {
    fn fork_finish(&self) -> hash::Output {
        hash::Output::new(&self.0.clone().finalize()[..])
    }

    fn finish(self: Box<Self>) -> hash::Output {
        hash::Output::new(&self.0.finalize()[..])
    }

    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }
}

pub(crate) struct Md5Sha1;

impl hash::Hash for Md5Sha1 {
    fn start(&self) -> Box<dyn hash::Context> {
        Box::new(Md5Sha1Context {
            md5: MD5.start(),
            sha1: ring::hash::SHA1.start(),
        })
    }

    fn hash(&self, data: &[u8]) -> hash::Output {
        let mut ctx = self.start();
        ctx.update(data);
        ctx.finish()
    }

    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::NONE
    }
}

struct Md5Sha1Context {
    md5: Box<dyn hash::Context>,
    sha1: Box<dyn hash::Context>,
}

fn concat(md5: hash::Output, sha1: hash::Output) -> hash::Output {
    let mut both = [0u8; 36];
    both[..16].copy_from_slice(md5.as_ref());
    both[16..].copy_from_slice(sha1.as_ref());
    hash::Output::new(&both)
}

impl hash::Context for Md5Sha1Context {
    fn fork_finish(&self) -> hash::Output {
        concat(self.md5.fork_finish(), self.sha1.fork_finish())
    }

    fn finish(self: Box<Self>) -> hash::Output {
        concat(self.md5.finish(), self.sha1.finish())
    }

    fn update(&mut self, data: &[u8]) {
        self.md5.update(data);
        self.sha1.update(data);
    }
}

pub(crate) struct HmacMd5;

impl tls_hmac::Hmac for HmacMd5 {
    fn with_key(&self, key: &[u8]) -> Box<dyn tls_hmac::Key> {
        Box::new(HmacMd5Key(key.to_vec()))
    }
}

struct HmacMd5Key(Vec<u8>);

impl tls_hmac::Key for HmacMd5Key {
    fn sign(&self, data: &[&[u8]]) -> tls_hmac::Tag {
        // HMAC accepts keys of any length
        let mut ctx = match <SimpleHmac<Md5> as Mac>::new_from_slice(&self.0) {
            Ok(ctx) => ctx,
            Err(_) => unreachable!(),
        };
        for d in data {
            ctx.update(d);
        }
        tls_hmac::Tag::new(&ctx.finalize().into_bytes()[..])
    }

    fn tag_len(&self) -> usize {
        16
    }
}

impl Drop for HmacMd5Key {
    fn drop(&mut self) {
        zeroize::Zeroize::zeroize(&mut self.0);
    }
}
