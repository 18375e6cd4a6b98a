//! # Tri-cipher Encryption Core
//!
//! Key derivation plus three fixed symmetric encryptors used to compare
//! algorithms on the same plaintext.
//!
//! ## Features
//!
//! - **AES-256-CBC**: 32-byte key, random 16-byte IV, PKCS#7
//! - **3DES-CBC**: 24-byte key, random 8-byte IV, PKCS#7
//! - **RC4**: 16-byte key, no IV, deterministic (comparison baseline only)
//! - **Key Management**: HMAC-SHA256 file keys derived from a per-user session
//!   secret, PBKDF2 master keys, zeroize-on-drop key buffers
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use encryption::{Algorithm, KeyManager, SessionSecret};
//!
//! let km = KeyManager::new();
//! let key = km.derive_file_key(&secret, "file-42", Algorithm::Aes)?;
//!
//! let result = Algorithm::Aes.encryptor().encrypt(b"hello world", key.as_bytes())?;
//! let plain = Algorithm::Aes
//!     .encryptor()
//!     .decrypt(result.ciphertext(), key.as_bytes(), result.iv())?;
//! ```
//!
//! ## Security Considerations
//!
//! - **No authentication**: none of the three modes detects tampering
//! - **Session secret**: regenerating it orphans every derived file key
//! - **RC4**: deterministic and broken; never the only copy of anything
//! - **Error surface**: all ciphertext failures collapse to `DecryptionFailed`

// Module declarations
pub mod aes_cbc;
mod block;
pub mod algorithm;
pub mod encryptor;
pub mod error;
pub mod keymanager;
pub mod rc4;
pub mod tdes_cbc;

// Re-exports for convenience
pub use aes_cbc::AesCbcEncryptor;
pub use algorithm::{Algorithm, CipherMode, PerAlgorithm};
pub use encryptor::{split_blob, DecryptionResult, EncryptionResult, Encryptor, ResultMetadata};
pub use error::{EncryptionError, Result};
pub use keymanager::{Key, KeyManager, SessionSecret, MIN_PBKDF2_ITERATIONS, SESSION_SECRET_SIZE};
pub use rc4::Rc4Encryptor;
pub use tdes_cbc::TripleDesCbcEncryptor;

/// Encryption crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
