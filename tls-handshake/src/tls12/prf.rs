use crate::crypto;
use crate::crypto::legacy;
use crate::crypto::ring::hmac::HMAC_SHA1;

/// `P_hash` from RFC 5246 section 5, keyed by `hmac_key`.
pub(crate) fn prf(out: &mut [u8], hmac_key: &dyn crypto::hmac::Key, label: &[u8], seed: &[u8]) {
    // A(1)
    let mut current_a = hmac_key.sign(&[label, seed]);

    let chunk_size = hmac_key.tag_len();
    for chunk in out.chunks_mut(chunk_size) {
        // P_hash[i] = HMAC_hash(secret, A(i) + seed)
        let p_term = hmac_key.sign(&[current_a.as_ref(), label, seed]);
        chunk.copy_from_slice(&p_term.as_ref()[..chunk.len()]);

        // A(i+1) = HMAC_hash(secret, A(i))
        current_a = hmac_key.sign(&[current_a.as_ref()]);
    }
}

/// The TLS 1.0 and 1.1 PRF (RFC 2246 section 5):
/// `P_MD5(S1, label + seed) XOR P_SHA-1(S2, label + seed)`.
///
/// S1 and S2 are the two halves of `secret`; with an odd length they share
/// the middle byte.
pub(crate) fn legacy_prf(out: &mut [u8], secret: &[u8], label: &[u8], seed: &[u8]) {
    use crate::crypto::hmac::Hmac;

    let half = (secret.len() + 1) / 2;
    let s1 = &secret[..half];
    let s2 = &secret[secret.len() - half..];

    prf(out, legacy::HMAC_MD5.with_key(s1).as_ref(), label, seed);

    let mut sha1_out = vec![0u8; out.len()];
    prf(&mut sha1_out, HMAC_SHA1.with_key(s2).as_ref(), label, seed);

    for (o, s) in out.iter_mut().zip(sha1_out.iter()) {
        *o ^= *s;
    }
    zeroize::Zeroize::zeroize(&mut sha1_out);
}
