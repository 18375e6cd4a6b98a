//! Field-level encryption.
//!
//! Small values (a title, a description) go through the same three-way
//! fan-out as files but are never written to the blob store. The derivation
//! identifier is `"<file_id>:<field_name>"`, so each field of each file gets
//! its own keys.

use crate::error::{PipelineError, Result};
use crate::orchestrator::FileEncryptionOrchestrator;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use encryption::{Algorithm, EncryptionError, EncryptionResult, PerAlgorithm, SessionSecret};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use storage::BlobStore;
use tracing::{debug, instrument};

/// Derivation identifier for one field of one file.
pub fn field_identifier(file_id: &str, field_name: &str) -> Result<String> {
    if file_id.is_empty() || field_name.is_empty() {
        return Err(PipelineError::InvalidIdentifier(
            "file id and field name must not be empty".into(),
        ));
    }
    Ok(format!("{file_id}:{field_name}"))
}

/// One algorithm's encrypted field, in a form that fits a database column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedField {
    pub algorithm: Algorithm,
    /// Base64 ciphertext.
    pub ciphertext: String,
    /// Base64 IV; absent for RC4.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iv: Option<String>,
    pub ciphertext_size: usize,
    pub duration_us: u64,
}

impl From<&EncryptionResult> for EncryptedField {
    fn from(result: &EncryptionResult) -> Self {
        Self {
            algorithm: result.algorithm(),
            ciphertext: BASE64.encode(result.ciphertext()),
            iv: result.iv().map(|iv| BASE64.encode(iv)),
            ciphertext_size: result.ciphertext_size(),
            duration_us: result.duration().as_micros() as u64,
        }
    }
}

impl EncryptedField {
    /// Decoded ciphertext and IV. Malformed base64 is treated like any other
    /// corrupt ciphertext.
    fn decode(&self) -> std::result::Result<(Vec<u8>, Option<Vec<u8>>), EncryptionError> {
        let ciphertext = BASE64
            .decode(&self.ciphertext)
            .map_err(|_| EncryptionError::DecryptionFailed)?;
        let iv = self
            .iv
            .as_deref()
            .map(|iv| BASE64.decode(iv))
            .transpose()
            .map_err(|_| EncryptionError::DecryptionFailed)?;
        Ok((ciphertext, iv))
    }
}

impl<S: BlobStore> FileEncryptionOrchestrator<S> {
    /// Encrypt one field value under all three algorithms.
    #[instrument(skip(self, plaintext, secret), fields(bytes = plaintext.len()))]
    pub async fn encrypt_field(
        &self,
        plaintext: &[u8],
        file_id: &str,
        field_name: &str,
        secret: &SessionSecret,
    ) -> Result<PerAlgorithm<EncryptedField>> {
        let identifier = field_identifier(file_id, field_name)?;
        let results = self
            .encrypt_all(Arc::from(plaintext), &identifier, secret)
            .await?;
        debug!("field encrypted");
        Ok(results.map(|_, result| EncryptedField::from(&result)))
    }

    /// Re-derive the field key and decrypt. The algorithm comes from the field.
    pub fn decrypt_field(
        &self,
        field: &EncryptedField,
        file_id: &str,
        field_name: &str,
        secret: &SessionSecret,
    ) -> Result<Vec<u8>> {
        let algorithm = field.algorithm;
        let identifier = field_identifier(file_id, field_name)?;
        let key = self
            .key_manager()
            .derive_file_key(secret, &identifier, algorithm)
            .map_err(PipelineError::encryption(algorithm))?;

        let (ciphertext, iv) = field
            .decode()
            .map_err(PipelineError::encryption(algorithm))?;
        let plaintext = algorithm
            .encryptor()
            .decrypt(&ciphertext, key.as_bytes(), iv.as_deref())
            .map_err(PipelineError::encryption(algorithm))?;
        Ok(plaintext.into_plaintext())
    }

    /// Encrypt several fields of one file. Fields are processed concurrently;
    /// any failure fails the batch.
    pub async fn encrypt_fields(
        &self,
        file_id: &str,
        fields: &BTreeMap<String, String>,
        secret: &SessionSecret,
    ) -> Result<BTreeMap<String, PerAlgorithm<EncryptedField>>> {
        let encrypted = try_join_all(fields.iter().map(|(name, value)| async move {
            let field = self
                .encrypt_field(value.as_bytes(), file_id, name, secret)
                .await?;
            Ok::<_, PipelineError>((name.clone(), field))
        }))
        .await?;
        Ok(encrypted.into_iter().collect())
    }
}
