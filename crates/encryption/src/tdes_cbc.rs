//! Triple-DES (EDE3) CBC Encryption/Decryption
//!
//! 192-bit key input (168 bits effective), 64-bit random IV per encryption,
//! PKCS#7 padding to the 8-byte block boundary. Same shape as the AES
//! encryptor with smaller blocks.

use crate::algorithm::Algorithm;
use crate::block::{check_ciphertext, check_key, random_iv, require_iv};
use crate::encryptor::{DecryptionResult, EncryptionResult, Encryptor};
use crate::error::{EncryptionError, Result};
use cipher::block_padding::Pkcs7;
use cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use des::TdesEde3;
use std::time::Instant;

type TdesCbcEnc = cbc::Encryptor<TdesEde3>;
type TdesCbcDec = cbc::Decryptor<TdesEde3>;

/// 3DES (EDE3) in CBC mode
#[derive(Debug, Clone, Copy, Default)]
pub struct TripleDesCbcEncryptor;

impl Encryptor for TripleDesCbcEncryptor {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Des
    }

    fn encrypt(&self, plaintext: &[u8], key: &[u8]) -> Result<EncryptionResult> {
        check_key(Algorithm::Des, key)?;

        let start = Instant::now();
        let iv = random_iv(Algorithm::Des);
        let cipher = TdesCbcEnc::new_from_slices(key, &iv)
            .map_err(|e| EncryptionError::CipherError(e.to_string()))?;
        let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        Ok(EncryptionResult::new(
            Algorithm::Des,
            ciphertext,
            Some(iv),
            start.elapsed(),
        ))
    }

    fn decrypt(
        &self,
        ciphertext: &[u8],
        key: &[u8],
        iv: Option<&[u8]>,
    ) -> Result<DecryptionResult> {
        check_key(Algorithm::Des, key)?;
        let iv = require_iv(Algorithm::Des, iv)?;
        check_ciphertext(Algorithm::Des, ciphertext)?;

        let start = Instant::now();
        let cipher = TdesCbcDec::new_from_slices(key, iv)
            .map_err(|e| EncryptionError::CipherError(e.to_string()))?;
        let plaintext = cipher
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| EncryptionError::DecryptionFailed)?;

        Ok(DecryptionResult::new(
            Algorithm::Des,
            plaintext,
            start.elapsed(),
        ))
    }
}
