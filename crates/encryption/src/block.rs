//! Checks shared by the two CBC encryptors.

use crate::algorithm::Algorithm;
use crate::error::{EncryptionError, Result};
use rand::RngCore;

pub(crate) fn check_key(algorithm: Algorithm, key: &[u8]) -> Result<()> {
    if key.len() != algorithm.key_size() {
        return Err(EncryptionError::invalid_key_length(algorithm, key.len()));
    }
    Ok(())
}

pub(crate) fn require_iv<'a>(algorithm: Algorithm, iv: Option<&'a [u8]>) -> Result<&'a [u8]> {
    let iv = iv.ok_or(EncryptionError::MissingIv { algorithm })?;
    if iv.len() != algorithm.iv_size() {
        return Err(EncryptionError::InvalidIvLength {
            algorithm,
            expected: algorithm.iv_size(),
            actual: iv.len(),
        });
    }
    Ok(iv)
}

/// PKCS#7 output is always a non-empty whole number of blocks.
pub(crate) fn check_ciphertext(algorithm: Algorithm, ciphertext: &[u8]) -> Result<()> {
    let block = algorithm.iv_size();
    if ciphertext.is_empty() || ciphertext.len() % block != 0 {
        return Err(EncryptionError::DecryptionFailed);
    }
    Ok(())
}

/// Fresh IV from the thread-local CSPRNG. Never reused across calls.
pub(crate) fn random_iv(algorithm: Algorithm) -> Vec<u8> {
    let mut iv = vec![0u8; algorithm.iv_size()];
    rand::rng().fill_bytes(&mut iv);
    iv
}
