//! The shared encryptor capability and its result types.

use crate::algorithm::{Algorithm, CipherMode};
use crate::error::Result;
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// One symmetric algorithm behind a uniform interface.
///
/// Implementations are stateless unit structs: reentrant, shareable across
/// threads, and selected through [`Algorithm::encryptor`].
pub trait Encryptor: Send + Sync {
    /// Which algorithm this implementation provides.
    fn algorithm(&self) -> Algorithm;

    /// Encrypt `plaintext` under `key`.
    ///
    /// Block-cipher implementations draw a fresh random IV per call and return
    /// it in [`EncryptionResult::iv`].
    fn encrypt(&self, plaintext: &[u8], key: &[u8]) -> Result<EncryptionResult>;

    /// Decrypt `ciphertext` under `key`.
    ///
    /// Block ciphers require `iv`; the stream cipher ignores it.
    fn decrypt(&self, ciphertext: &[u8], key: &[u8], iv: Option<&[u8]>)
        -> Result<DecryptionResult>;
}

/// Descriptive metadata attached to every encryption
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultMetadata {
    pub mode: CipherMode,
    pub key_size_bits: u32,
    pub timestamp: OffsetDateTime,
}

impl ResultMetadata {
    pub fn for_algorithm(algorithm: Algorithm) -> Self {
        Self {
            mode: algorithm.mode(),
            key_size_bits: algorithm.key_size_bits(),
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    /// RFC 3339 rendering of the timestamp, for metric rows.
    pub fn timestamp_rfc3339(&self) -> String {
        self.timestamp
            .format(&Rfc3339)
            .unwrap_or_else(|_| self.timestamp.unix_timestamp().to_string())
    }
}

/// Output of one `encrypt` call. Immutable once built.
#[derive(Debug, Clone)]
pub struct EncryptionResult {
    algorithm: Algorithm,
    ciphertext: Vec<u8>,
    iv: Option<Vec<u8>>,
    duration: Duration,
    metadata: ResultMetadata,
}

impl EncryptionResult {
    pub(crate) fn new(
        algorithm: Algorithm,
        ciphertext: Vec<u8>,
        iv: Option<Vec<u8>>,
        duration: Duration,
    ) -> Self {
        Self {
            algorithm,
            ciphertext,
            iv,
            duration,
            metadata: ResultMetadata::for_algorithm(algorithm),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn iv(&self) -> Option<&[u8]> {
        self.iv.as_deref()
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn ciphertext_size(&self) -> usize {
        self.ciphertext.len()
    }

    pub fn metadata(&self) -> &ResultMetadata {
        &self.metadata
    }

    /// The on-disk blob: `IV || ciphertext` for block ciphers, bare
    /// ciphertext for the stream cipher.
    pub fn to_blob(&self) -> Vec<u8> {
        let iv = self.iv.as_deref().unwrap_or_default();
        let mut blob = Vec::with_capacity(iv.len() + self.ciphertext.len());
        blob.extend_from_slice(iv);
        blob.extend_from_slice(&self.ciphertext);
        blob
    }
}

/// Output of one `decrypt` call. Immutable once built.
#[derive(Debug, Clone)]
pub struct DecryptionResult {
    algorithm: Algorithm,
    plaintext: Vec<u8>,
    duration: Duration,
}

impl DecryptionResult {
    pub(crate) fn new(algorithm: Algorithm, plaintext: Vec<u8>, duration: Duration) -> Self {
        Self {
            algorithm,
            plaintext,
            duration,
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn plaintext(&self) -> &[u8] {
        &self.plaintext
    }

    pub fn into_plaintext(self) -> Vec<u8> {
        self.plaintext
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

/// Split a stored blob into `(iv, ciphertext)` for `algorithm`.
///
/// The IV size is the only source of truth for the split point. A blob shorter
/// than the IV is reported as a decryption failure.
pub fn split_blob(algorithm: Algorithm, blob: &[u8]) -> Result<(Option<&[u8]>, &[u8])> {
    let iv_size = algorithm.iv_size();
    if iv_size == 0 {
        return Ok((None, blob));
    }
    if blob.len() < iv_size {
        return Err(crate::error::EncryptionError::DecryptionFailed);
    }
    let (iv, ciphertext) = blob.split_at(iv_size);
    Ok((Some(iv), ciphertext))
}
