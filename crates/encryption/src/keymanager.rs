//! Key Management
//!
//! Handles key material lifecycle: generation, deterministic derivation,
//! validation, and destruction. This is the only place where algorithm key
//! sizes are applied to raw bytes.
//!
//! ## Key Hierarchy
//!
//! ```text
//! SessionSecret (256-bit, one per user, owned by the auth store)
//!   └── File key = HMAC-SHA256(secret, identifier || tag)[..key_size]
//!         ├── tag "aes" → 32 bytes
//!         ├── tag "des" → 24 bytes
//!         └── tag "rc4" → 16 bytes
//!
//! Master key = PBKDF2-HMAC-SHA256(username, salt, >= 10_000 rounds)[..key_size]
//! ```
//!
//! File keys are never stored: the same secret and identifier always
//! re-derive the same key. Regenerating a user's session secret therefore
//! makes every file they own undecryptable.
//!
//! ## Memory
//!
//! [`Key`] and [`SessionSecret`] are zeroized on drop. [`KeyManager::wipe_key`]
//! is a best-effort scrub for raw buffers; it minimizes key lifetime in memory
//! but cannot reach copies the allocator or the OS may have made.

use crate::algorithm::{Algorithm, PerAlgorithm};
use crate::error::{EncryptionError, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Session secret size (256 bits)
pub const SESSION_SECRET_SIZE: usize = 32;

/// Lower bound on PBKDF2 rounds for master key derivation
pub const MIN_PBKDF2_ITERATIONS: u32 = 10_000;

/// Environment variable holding a base64 session secret (operator tooling only)
pub const SESSION_SECRET_ENV: &str = "VAULT_SESSION_SECRET";

const FINGERPRINT_DOMAIN: &[u8] = b"VAULT-SESSION-FINGERPRINT-V1";

type HmacSha256 = Hmac<Sha256>;

/// Per-user 256-bit secret every file key is derived from.
///
/// Zeroized on drop for security
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionSecret {
    bytes: [u8; SESSION_SECRET_SIZE],
}

impl SessionSecret {
    /// Wrap raw secret bytes. Anything other than 32 bytes is rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SESSION_SECRET_SIZE {
            return Err(EncryptionError::InvalidSessionSecret(format!(
                "expected {SESSION_SECRET_SIZE} bytes, got {}",
                bytes.len()
            )));
        }
        let mut secret = [0u8; SESSION_SECRET_SIZE];
        secret.copy_from_slice(bytes);
        Ok(Self { bytes: secret })
    }

    /// Decode the base64 form persisted by the auth store.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let mut decoded = BASE64
            .decode(encoded.trim())
            .map_err(|e| EncryptionError::InvalidSessionSecret(format!("invalid base64: {e}")))?;
        let secret = Self::from_bytes(&decoded);
        decoded.zeroize();
        secret
    }

    /// Read the secret from `VAULT_SESSION_SECRET` (base64)
    ///
    /// # Errors
    /// Returns error if env var missing or invalid
    pub fn from_env() -> Result<Self> {
        let encoded = std::env::var(SESSION_SECRET_ENV).map_err(|_| {
            EncryptionError::InvalidConfiguration(format!(
                "{SESSION_SECRET_ENV} environment variable not set"
            ))
        })?;
        Self::from_base64(&encoded)
    }

    /// Generate a fresh secret.
    ///
    /// Only the first-login flow of the auth store should call this. The
    /// encryption core never creates a secret per file.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SESSION_SECRET_SIZE];
        rand::rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; SESSION_SECRET_SIZE] {
        &self.bytes
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(self.bytes)
    }

    /// Short non-reversible identifier, safe to put in logs.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(FINGERPRINT_DOMAIN);
        hasher.update(self.bytes);
        let digest = hasher.finalize();
        hex::encode(&digest[..8])
    }
}

impl std::fmt::Debug for SessionSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSecret")
            .field("bytes", &"[REDACTED]")
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

/// Symmetric key material for one algorithm.
///
/// Zeroized on drop, so a key dies with the scope that derived it.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Key {
    #[zeroize(skip)]
    algorithm: Algorithm,
    bytes: Vec<u8>,
}

impl Key {
    /// Wrap existing key bytes after checking their length.
    pub fn from_bytes(algorithm: Algorithm, bytes: &[u8]) -> Result<Self> {
        if !KeyManager::validate_key(bytes, algorithm) {
            return Err(EncryptionError::invalid_key_length(algorithm, bytes.len()));
        }
        Ok(Self {
            algorithm,
            bytes: bytes.to_vec(),
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.algorithm == other.algorithm && bool::from(self.bytes.as_slice().ct_eq(&other.bytes))
    }
}

impl Eq for Key {}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Key")
            .field("algorithm", &self.algorithm)
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Key Manager
///
/// Stateless apart from the PBKDF2 cost, so one instance can be shared by
/// every concurrent encryption.
#[derive(Debug, Clone)]
pub struct KeyManager {
    pbkdf2_iterations: u32,
}

impl Default for KeyManager {
    fn default() -> Self {
        Self {
            pbkdf2_iterations: MIN_PBKDF2_ITERATIONS,
        }
    }
}

impl KeyManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a higher PBKDF2 cost for master key derivation.
    ///
    /// # Errors
    /// Returns error if `iterations` is below [`MIN_PBKDF2_ITERATIONS`].
    pub fn with_iterations(iterations: u32) -> Result<Self> {
        if iterations < MIN_PBKDF2_ITERATIONS {
            return Err(EncryptionError::InvalidConfiguration(format!(
                "PBKDF2 iterations must be at least {MIN_PBKDF2_ITERATIONS}, got {iterations}"
            )));
        }
        Ok(Self {
            pbkdf2_iterations: iterations,
        })
    }

    pub fn iterations(&self) -> u32 {
        self.pbkdf2_iterations
    }

    /// Random key of the algorithm's size from the thread-local CSPRNG.
    pub fn generate_key(&self, algorithm: Algorithm) -> Key {
        let mut bytes = vec![0u8; algorithm.key_size()];
        rand::rng().fill_bytes(&mut bytes);
        Key { algorithm, bytes }
    }

    /// Derive the key for one (identifier, algorithm) pair
    ///
    /// Derivation: HMAC-SHA256(key = secret, msg = identifier || tag),
    /// truncated to the algorithm key size. Identical inputs always give
    /// byte-identical keys.
    ///
    /// # Errors
    /// Returns error if `identifier` is empty.
    pub fn derive_file_key(
        &self,
        secret: &SessionSecret,
        identifier: &str,
        algorithm: Algorithm,
    ) -> Result<Key> {
        if identifier.is_empty() {
            return Err(EncryptionError::EmptyIdentifier);
        }

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| {
            EncryptionError::KeyDerivationFailed(format!("HMAC init failed: {e}"))
        })?;
        mac.update(identifier.as_bytes());
        mac.update(algorithm.tag().as_bytes());
        let mut okm: [u8; 32] = mac.finalize().into_bytes().into();

        let key = Key {
            algorithm,
            bytes: okm[..algorithm.key_size()].to_vec(),
        };
        okm.zeroize();
        Ok(key)
    }

    /// Derive the keys for all three algorithms at once.
    pub fn derive_file_keys(
        &self,
        secret: &SessionSecret,
        identifier: &str,
    ) -> Result<PerAlgorithm<Key>> {
        Ok(PerAlgorithm::new(
            self.derive_file_key(secret, identifier, Algorithm::Aes)?,
            self.derive_file_key(secret, identifier, Algorithm::Des)?,
            self.derive_file_key(secret, identifier, Algorithm::Rc4)?,
        ))
    }

    /// Password-based key that stays stable across sessions
    ///
    /// Derivation: PBKDF2-HMAC-SHA256(password = username, salt), output
    /// length = algorithm key size.
    ///
    /// # Errors
    /// Returns error if `username` or `salt` is empty.
    pub fn derive_master_key(
        &self,
        username: &str,
        salt: &[u8],
        algorithm: Algorithm,
    ) -> Result<Key> {
        if username.is_empty() {
            return Err(EncryptionError::InvalidInput(
                "username must not be empty".into(),
            ));
        }
        if salt.is_empty() {
            return Err(EncryptionError::InvalidInput("salt must not be empty".into()));
        }

        let mut bytes = vec![0u8; algorithm.key_size()];
        pbkdf2::pbkdf2_hmac::<Sha256>(
            username.as_bytes(),
            salt,
            self.pbkdf2_iterations,
            &mut bytes,
        );
        Ok(Key { algorithm, bytes })
    }

    /// Length check only; says nothing about key quality.
    pub fn validate_key(key: &[u8], algorithm: Algorithm) -> bool {
        key.len() == algorithm.key_size()
    }

    /// Overwrite a key buffer with random bytes, then zeros.
    pub fn wipe_key(key: &mut [u8]) {
        rand::rng().fill_bytes(key);
        key.zeroize();
    }
}
