//! AES-256-CBC Encryption/Decryption
//!
//! 256-bit key, 128-bit random IV per encryption, PKCS#7 padding to the
//! 16-byte block boundary.
//!
//! ## Security Properties
//!
//! - Confidentiality: AES-256 strength
//! - Randomized: a fresh IV per call, so equal plaintexts give unequal ciphertexts
//! - No authentication: CBC alone does not detect tampering

use crate::algorithm::Algorithm;
use crate::block::{check_ciphertext, check_key, random_iv, require_iv};
use crate::encryptor::{DecryptionResult, EncryptionResult, Encryptor};
use crate::error::{EncryptionError, Result};
use aes::Aes256;
use cipher::block_padding::Pkcs7;
use cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use std::time::Instant;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// AES-256 in CBC mode
#[derive(Debug, Clone, Copy, Default)]
pub struct AesCbcEncryptor;

impl Encryptor for AesCbcEncryptor {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Aes
    }

    /// Encrypt data using AES-256-CBC
    ///
    /// # Errors
    ///
    /// Returns error if the key is not exactly 32 bytes.
    fn encrypt(&self, plaintext: &[u8], key: &[u8]) -> Result<EncryptionResult> {
        check_key(Algorithm::Aes, key)?;

        let start = Instant::now();
        let iv = random_iv(Algorithm::Aes);
        let cipher = Aes256CbcEnc::new_from_slices(key, &iv)
            .map_err(|e| EncryptionError::CipherError(e.to_string()))?;
        let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        Ok(EncryptionResult::new(
            Algorithm::Aes,
            ciphertext,
            Some(iv),
            start.elapsed(),
        ))
    }

    /// Decrypt data using AES-256-CBC
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The key is not exactly 32 bytes
    /// - The IV is missing or not exactly 16 bytes
    /// - The ciphertext is malformed (reported as a bare `DecryptionFailed`)
    fn decrypt(
        &self,
        ciphertext: &[u8],
        key: &[u8],
        iv: Option<&[u8]>,
    ) -> Result<DecryptionResult> {
        check_key(Algorithm::Aes, key)?;
        let iv = require_iv(Algorithm::Aes, iv)?;
        check_ciphertext(Algorithm::Aes, ciphertext)?;

        let start = Instant::now();
        let cipher = Aes256CbcDec::new_from_slices(key, iv)
            .map_err(|e| EncryptionError::CipherError(e.to_string()))?;
        let plaintext = cipher
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| EncryptionError::DecryptionFailed)?;

        Ok(DecryptionResult::new(
            Algorithm::Aes,
            plaintext,
            start.elapsed(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [42u8; 32];

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let plaintext = b"Hello! This is a test of AES-256-CBC encryption.";

        let result = AesCbcEncryptor.encrypt(plaintext, &KEY).unwrap();
        assert_ne!(result.ciphertext(), plaintext);
        assert_eq!(result.ciphertext_size() % 16, 0);
        assert_eq!(result.iv().map(<[u8]>::len), Some(16));

        let decrypted = AesCbcEncryptor
            .decrypt(result.ciphertext(), &KEY, result.iv())
            .unwrap();
        assert_eq!(decrypted.plaintext(), plaintext);
        assert_eq!(decrypted.algorithm(), Algorithm::Aes);
    }

    #[test]
    fn test_padding_sizes() {
        // Empty input still produces one full padding block.
        assert_eq!(AesCbcEncryptor.encrypt(b"", &KEY).unwrap().ciphertext_size(), 16);
        assert_eq!(AesCbcEncryptor.encrypt(&[0u8; 15], &KEY).unwrap().ciphertext_size(), 16);
        assert_eq!(AesCbcEncryptor.encrypt(&[0u8; 16], &KEY).unwrap().ciphertext_size(), 32);
    }

    #[test]
    fn test_randomized_encryption() {
        let plaintext = b"same plaintext, same key";
        let a = AesCbcEncryptor.encrypt(plaintext, &KEY).unwrap();
        let b = AesCbcEncryptor.encrypt(plaintext, &KEY).unwrap();

        assert_ne!(a.iv(), b.iv());
        assert_ne!(a.ciphertext(), b.ciphertext());
    }

    #[test]
    fn test_wrong_key_length() {
        let err = AesCbcEncryptor.encrypt(b"data", &[0u8; 24]).unwrap_err();
        assert!(matches!(
            err,
            EncryptionError::InvalidKeyLength {
                algorithm: Algorithm::Aes,
                expected: 32,
                actual: 24
            }
        ));
        assert!(err.to_string().contains("32"));
    }

    #[test]
    fn test_decrypt_requires_iv() {
        let result = AesCbcEncryptor.encrypt(b"data", &KEY).unwrap();

        let err = AesCbcEncryptor
            .decrypt(result.ciphertext(), &KEY, None)
            .unwrap_err();
        assert!(matches!(err, EncryptionError::MissingIv { .. }));

        let err = AesCbcEncryptor
            .decrypt(result.ciphertext(), &KEY, Some(&[0u8; 8]))
            .unwrap_err();
        assert!(matches!(
            err,
            EncryptionError::InvalidIvLength {
                expected: 16,
                actual: 8,
                ..
            }
        ));
    }

    #[test]
    fn test_wrong_key_fails_generically() {
        let result = AesCbcEncryptor.encrypt(&[7u8; 100], &KEY).unwrap();

        // A wrong key either breaks the padding or yields garbage; it never
        // returns the original plaintext.
        match AesCbcEncryptor.decrypt(result.ciphertext(), &[1u8; 32], result.iv()) {
            Ok(garbage) => assert_ne!(garbage.plaintext(), &[7u8; 100][..]),
            Err(err) => assert!(matches!(err, EncryptionError::DecryptionFailed)),
        }
    }

    #[test]
    fn test_truncated_ciphertext() {
        let result = AesCbcEncryptor.encrypt(&[7u8; 40], &KEY).unwrap();
        let truncated = &result.ciphertext()[..result.ciphertext_size() - 1];

        let err = AesCbcEncryptor
            .decrypt(truncated, &KEY, result.iv())
            .unwrap_err();
        assert!(matches!(err, EncryptionError::DecryptionFailed));
        assert_eq!(err.to_string(), "Decryption failed");
    }
}
