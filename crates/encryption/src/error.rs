use crate::algorithm::Algorithm;
use thiserror::Error;

/// Encryption-related errors
///
/// Validation errors carry enough detail to fix the call site. Cipher
/// failures during decryption collapse into [`EncryptionError::DecryptionFailed`]
/// so callers cannot tell a padding failure from a truncated block.
#[derive(Error, Debug)]
pub enum EncryptionError {
    /// Key management errors
    #[error("Invalid key length for {algorithm}: expected {expected} bytes, got {actual}")]
    InvalidKeyLength {
        algorithm: Algorithm,
        expected: usize,
        actual: usize,
    },

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Invalid session secret: {0}")]
    InvalidSessionSecret(String),

    /// IV errors (block ciphers only)
    #[error("IV required for {algorithm} decryption")]
    MissingIv { algorithm: Algorithm },

    #[error("Invalid IV length for {algorithm}: expected {expected} bytes, got {actual}")]
    InvalidIvLength {
        algorithm: Algorithm,
        expected: usize,
        actual: usize,
    },

    /// Input errors
    #[error("Identifier must not be empty")]
    EmptyIdentifier,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Deliberately carries no cause.
    #[error("Decryption failed")]
    DecryptionFailed,

    /// Wrapped errors from dependencies
    #[error("Cipher error: {0}")]
    CipherError(String),
}

/// Result type alias for encryption operations
pub type Result<T> = std::result::Result<T, EncryptionError>;

impl EncryptionError {
    /// Stable machine-readable code for the boundary layer.
    pub fn code(&self) -> &'static str {
        match self {
            EncryptionError::InvalidKeyLength { .. } => "invalid_key_length",
            EncryptionError::KeyDerivationFailed(_) => "key_derivation_failed",
            EncryptionError::InvalidSessionSecret(_) => "invalid_session_secret",
            EncryptionError::MissingIv { .. } => "iv_required",
            EncryptionError::InvalidIvLength { .. } => "invalid_iv_length",
            EncryptionError::EmptyIdentifier => "empty_identifier",
            EncryptionError::InvalidInput(_) => "invalid_input",
            EncryptionError::InvalidConfiguration(_) => "invalid_configuration",
            EncryptionError::DecryptionFailed => "decryption_failed",
            EncryptionError::CipherError(_) => "cipher_error",
        }
    }

    /// True when the caller supplied bad input (maps to a 4xx-class response).
    pub fn is_client_error(&self) -> bool {
        match self {
            EncryptionError::InvalidKeyLength { .. }
            | EncryptionError::InvalidSessionSecret(_)
            | EncryptionError::MissingIv { .. }
            | EncryptionError::InvalidIvLength { .. }
            | EncryptionError::EmptyIdentifier
            | EncryptionError::InvalidInput(_)
            | EncryptionError::DecryptionFailed => true,
            EncryptionError::KeyDerivationFailed(_)
            | EncryptionError::InvalidConfiguration(_)
            | EncryptionError::CipherError(_) => false,
        }
    }

    pub(crate) fn invalid_key_length(algorithm: Algorithm, actual: usize) -> Self {
        EncryptionError::InvalidKeyLength {
            algorithm,
            expected: algorithm.key_size(),
            actual,
        }
    }
}

/// Convert cipher errors to our error type
impl From<cipher::StreamCipherError> for EncryptionError {
    fn from(err: cipher::StreamCipherError) -> Self {
        EncryptionError::CipherError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EncryptionError::InvalidKeyLength {
            algorithm: Algorithm::Aes,
            expected: 32,
            actual: 7,
        };
        assert_eq!(
            err.to_string(),
            "Invalid key length for AES: expected 32 bytes, got 7"
        );

        let err = EncryptionError::MissingIv {
            algorithm: Algorithm::Des,
        };
        assert_eq!(err.to_string(), "IV required for DES decryption");
    }

    #[test]
    fn test_decryption_failed_is_constant() {
        let err = EncryptionError::DecryptionFailed;
        assert_eq!(err.to_string(), "Decryption failed");
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn test_codes_and_classes() {
        assert_eq!(EncryptionError::EmptyIdentifier.code(), "empty_identifier");
        assert_eq!(EncryptionError::DecryptionFailed.code(), "decryption_failed");
        assert!(EncryptionError::EmptyIdentifier.is_client_error());
        assert!(!EncryptionError::CipherError("boom".into()).is_client_error());
    }

    #[test]
    fn test_invalid_key_length_helper() {
        let err = EncryptionError::invalid_key_length(Algorithm::Rc4, 3);
        assert!(matches!(
            err,
            EncryptionError::InvalidKeyLength {
                algorithm: Algorithm::Rc4,
                expected: 16,
                actual: 3
            }
        ));
    }
}
