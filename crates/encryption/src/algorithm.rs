//! The closed set of algorithms and their fixed parameters.
//!
//! Every size the rest of the workspace needs comes from here:
//!
//! | Algorithm | Key bytes | IV bytes | Mode |
//! |---|---|---|---|
//! | AES-256 | 32 | 16 | CBC, PKCS#7 |
//! | 3DES (EDE3) | 24 | 8 | CBC, PKCS#7 |
//! | RC4 | 16 | 0 | stream |

use crate::aes_cbc::AesCbcEncryptor;
use crate::encryptor::Encryptor;
use crate::error::{EncryptionError, Result};
use crate::rc4::Rc4Encryptor;
use crate::tdes_cbc::TripleDesCbcEncryptor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Encryption algorithm selection
///
/// Adding a variant forces every `match` in the workspace to be revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// AES-256 in CBC mode
    Aes,
    /// Triple DES (EDE3) in CBC mode
    Des,
    /// RC4 stream cipher
    Rc4,
}

/// Cipher mode recorded in result metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CipherMode {
    /// Cipher block chaining with PKCS#7 padding
    Cbc,
    /// Keystream XOR, no padding
    Stream,
}

impl fmt::Display for CipherMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CipherMode::Cbc => f.write_str("CBC"),
            CipherMode::Stream => f.write_str("STREAM"),
        }
    }
}

impl Algorithm {
    /// All algorithms in fan-out order.
    pub const ALL: [Algorithm; 3] = [Algorithm::Aes, Algorithm::Des, Algorithm::Rc4];

    /// Required key length in bytes
    pub const fn key_size(self) -> usize {
        match self {
            Algorithm::Aes => 32,
            Algorithm::Des => 24,
            Algorithm::Rc4 => 16,
        }
    }

    /// IV length in bytes (0 for the stream cipher)
    pub const fn iv_size(self) -> usize {
        match self {
            Algorithm::Aes => 16,
            Algorithm::Des => 8,
            Algorithm::Rc4 => 0,
        }
    }

    pub const fn mode(self) -> CipherMode {
        match self {
            Algorithm::Aes | Algorithm::Des => CipherMode::Cbc,
            Algorithm::Rc4 => CipherMode::Stream,
        }
    }

    /// Nominal key size in bits (input size, not effective strength)
    pub const fn key_size_bits(self) -> u32 {
        (self.key_size() * 8) as u32
    }

    pub const fn uses_iv(self) -> bool {
        self.iv_size() > 0
    }

    /// Lowercase tag used for key derivation and on-disk directory names.
    ///
    /// All tags are three bytes long, so `identifier || tag` never collides
    /// across algorithms.
    pub const fn tag(self) -> &'static str {
        match self {
            Algorithm::Aes => "aes",
            Algorithm::Des => "des",
            Algorithm::Rc4 => "rc4",
        }
    }

    /// The stateless encryptor for this algorithm.
    pub fn encryptor(self) -> &'static dyn Encryptor {
        match self {
            Algorithm::Aes => &AesCbcEncryptor,
            Algorithm::Des => &TripleDesCbcEncryptor,
            Algorithm::Rc4 => &Rc4Encryptor,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Aes => f.write_str("AES"),
            Algorithm::Des => f.write_str("DES"),
            Algorithm::Rc4 => f.write_str("RC4"),
        }
    }
}

impl FromStr for Algorithm {
    type Err = EncryptionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aes" | "aes-256" | "aes256" => Ok(Algorithm::Aes),
            "des" | "3des" | "tdes" | "triple-des" => Ok(Algorithm::Des),
            "rc4" => Ok(Algorithm::Rc4),
            other => Err(EncryptionError::InvalidInput(format!(
                "unknown algorithm '{other}'"
            ))),
        }
    }
}

/// One value per algorithm.
///
/// Every fan-out in the workspace produces one of these, so a caller can never
/// hold a result for two algorithms and silently miss the third.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PerAlgorithm<T> {
    pub aes: T,
    pub des: T,
    pub rc4: T,
}

impl<T> PerAlgorithm<T> {
    pub fn new(aes: T, des: T, rc4: T) -> Self {
        Self { aes, des, rc4 }
    }

    /// Build from a function of the algorithm.
    pub fn from_fn(mut f: impl FnMut(Algorithm) -> T) -> Self {
        Self {
            aes: f(Algorithm::Aes),
            des: f(Algorithm::Des),
            rc4: f(Algorithm::Rc4),
        }
    }

    pub fn get(&self, algorithm: Algorithm) -> &T {
        match algorithm {
            Algorithm::Aes => &self.aes,
            Algorithm::Des => &self.des,
            Algorithm::Rc4 => &self.rc4,
        }
    }

    pub fn get_mut(&mut self, algorithm: Algorithm) -> &mut T {
        match algorithm {
            Algorithm::Aes => &mut self.aes,
            Algorithm::Des => &mut self.des,
            Algorithm::Rc4 => &mut self.rc4,
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(Algorithm, T) -> U) -> PerAlgorithm<U> {
        PerAlgorithm {
            aes: f(Algorithm::Aes, self.aes),
            des: f(Algorithm::Des, self.des),
            rc4: f(Algorithm::Rc4, self.rc4),
        }
    }

    /// Like [`PerAlgorithm::map`] but stops at the first error.
    pub fn try_map<U, E>(
        self,
        mut f: impl FnMut(Algorithm, T) -> std::result::Result<U, E>,
    ) -> std::result::Result<PerAlgorithm<U>, E> {
        Ok(PerAlgorithm {
            aes: f(Algorithm::Aes, self.aes)?,
            des: f(Algorithm::Des, self.des)?,
            rc4: f(Algorithm::Rc4, self.rc4)?,
        })
    }

    pub fn as_ref(&self) -> PerAlgorithm<&T> {
        PerAlgorithm {
            aes: &self.aes,
            des: &self.des,
            rc4: &self.rc4,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Algorithm, &T)> {
        [
            (Algorithm::Aes, &self.aes),
            (Algorithm::Des, &self.des),
            (Algorithm::Rc4, &self.rc4),
        ]
        .into_iter()
    }
}

impl<T> IntoIterator for PerAlgorithm<T> {
    type Item = (Algorithm, T);
    type IntoIter = std::array::IntoIter<(Algorithm, T), 3>;

    fn into_iter(self) -> Self::IntoIter {
        [
            (Algorithm::Aes, self.aes),
            (Algorithm::Des, self.des),
            (Algorithm::Rc4, self.rc4),
        ]
        .into_iter()
    }
}

impl PerAlgorithm<bool> {
    pub fn all(&self) -> bool {
        self.aes && self.des && self.rc4
    }

    pub fn any(&self) -> bool {
        self.aes || self.des || self.rc4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_table() {
        assert_eq!(Algorithm::Aes.key_size(), 32);
        assert_eq!(Algorithm::Aes.iv_size(), 16);
        assert_eq!(Algorithm::Des.key_size(), 24);
        assert_eq!(Algorithm::Des.iv_size(), 8);
        assert_eq!(Algorithm::Rc4.key_size(), 16);
        assert_eq!(Algorithm::Rc4.iv_size(), 0);

        assert_eq!(Algorithm::Aes.key_size_bits(), 256);
        assert_eq!(Algorithm::Des.key_size_bits(), 192);
        assert_eq!(Algorithm::Rc4.key_size_bits(), 128);
    }

    #[test]
    fn test_modes() {
        assert_eq!(Algorithm::Aes.mode(), CipherMode::Cbc);
        assert_eq!(Algorithm::Des.mode(), CipherMode::Cbc);
        assert_eq!(Algorithm::Rc4.mode(), CipherMode::Stream);
        assert!(!Algorithm::Rc4.uses_iv());
    }

    #[test]
    fn test_tags_are_equal_length() {
        for alg in Algorithm::ALL {
            assert_eq!(alg.tag().len(), 3);
        }
    }

    #[test]
    fn test_encryptor_dispatch() {
        for alg in Algorithm::ALL {
            assert_eq!(alg.encryptor().algorithm(), alg);
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!("AES".parse::<Algorithm>().unwrap(), Algorithm::Aes);
        assert_eq!("3des".parse::<Algorithm>().unwrap(), Algorithm::Des);
        assert_eq!(" rc4 ".parse::<Algorithm>().unwrap(), Algorithm::Rc4);
        assert!("blowfish".parse::<Algorithm>().is_err());
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&Algorithm::Des).unwrap();
        assert_eq!(json, "\"des\"");
        let back: Algorithm = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Algorithm::Des);
    }

    #[test]
    fn test_per_algorithm_helpers() {
        let sizes = PerAlgorithm::from_fn(Algorithm::key_size);
        assert_eq!(sizes, PerAlgorithm::new(32, 24, 16));
        assert_eq!(*sizes.get(Algorithm::Des), 24);

        let doubled = sizes.map(|_, v| v * 2);
        assert_eq!(doubled.rc4, 32);

        let order: Vec<Algorithm> = doubled.iter().map(|(alg, _)| alg).collect();
        assert_eq!(order, Algorithm::ALL.to_vec());

        let failed: std::result::Result<PerAlgorithm<usize>, &str> =
            sizes.try_map(|alg, v| if alg == Algorithm::Des { Err("des") } else { Ok(v) });
        assert_eq!(failed.unwrap_err(), "des");

        let flags = PerAlgorithm::new(true, false, true);
        assert!(flags.any());
        assert!(!flags.all());
    }
}
