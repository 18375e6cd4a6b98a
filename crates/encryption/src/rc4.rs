//! RC4 Stream Encryption
//!
//! 128-bit key, no IV, no padding. Encryption and decryption are the same
//! keystream XOR.
//!
//! ## Known Weakness
//!
//! RC4 here is deterministic: the same key and plaintext always produce the
//! same ciphertext. Two files with identical content encrypted under the same
//! derived key cannot be told apart by ciphertext, and two different files
//! under the same key leak the XOR of their plaintexts. It is kept only as a
//! comparison baseline against the CBC encryptors.

use crate::algorithm::Algorithm;
use crate::block::check_key;
use crate::encryptor::{DecryptionResult, EncryptionResult, Encryptor};
use crate::error::{EncryptionError, Result};
use cipher::consts::U16;
use cipher::{KeyInit, StreamCipher};
use rc4::Rc4;
use std::time::Instant;

/// Apply the RC4 keystream for `key` to a copy of `data`.
fn apply_keystream(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    check_key(Algorithm::Rc4, key)?;

    let mut cipher = Rc4::<U16>::new_from_slice(key)
        .map_err(|e| EncryptionError::CipherError(e.to_string()))?;
    let mut buf = data.to_vec();
    cipher.try_apply_keystream(&mut buf)?;
    Ok(buf)
}

/// RC4 stream cipher
#[derive(Debug, Clone, Copy, Default)]
pub struct Rc4Encryptor;

impl Encryptor for Rc4Encryptor {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Rc4
    }

    fn encrypt(&self, plaintext: &[u8], key: &[u8]) -> Result<EncryptionResult> {
        let start = Instant::now();
        let ciphertext = apply_keystream(key, plaintext)?;
        Ok(EncryptionResult::new(
            Algorithm::Rc4,
            ciphertext,
            None,
            start.elapsed(),
        ))
    }

    /// The IV argument is ignored.
    fn decrypt(
        &self,
        ciphertext: &[u8],
        key: &[u8],
        _iv: Option<&[u8]>,
    ) -> Result<DecryptionResult> {
        let start = Instant::now();
        let plaintext = apply_keystream(key, ciphertext)?;
        Ok(DecryptionResult::new(
            Algorithm::Rc4,
            plaintext,
            start.elapsed(),
        ))
    }
}
