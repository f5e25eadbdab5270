//! The single place where we generate random material for our own use.

use crate::crypto::SecureRandom;

/// Make a [`Vec<u8>`] of the given size containing random material.
pub(crate) fn random_vec(
    secure_random: &dyn SecureRandom,
    len: usize,
) -> Result<Vec<u8>, GetRandomFailed> {
    let mut v = vec![0; len];
    secure_random.fill(&mut v)?;
    Ok(v)
}

/// Fill a fixed-size array, as used for hello randoms.
pub(crate) fn random_array<const N: usize>(
    secure_random: &dyn SecureRandom,
) -> Result<[u8; N], GetRandomFailed> {
    let mut buf = [0u8; N];
    secure_random.fill(&mut buf)?;
    Ok(buf)
}

/// Random material generation failed.
#[derive(Debug)]
pub struct GetRandomFailed;
